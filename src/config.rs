//! Layered configuration for leadboard.
//!
//! Settings are read from `leadboard.toml`, then overridden by environment
//! variables (a `.env` file is loaded first when present), then by CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! db_path = ".leadboard/leads.db"
//! dev_mode = false
//!
//! [mail]
//! to = "contacto@fasonpro.com.ar"
//! from = "onboarding@resend.dev"
//! api_url = "https://api.resend.com"
//! # api_key is usually supplied through RESEND_API_KEY
//!
//! [logging]
//! filter = "info"
//! json = false
//! dir = ".leadboard/logs"
//! ```
//!
//! # Environment Overrides
//!
//! | Variable            | Setting            |
//! |---------------------|--------------------|
//! | `LEADBOARD_HOST`    | `server.host`      |
//! | `LEADBOARD_PORT`    | `server.port`      |
//! | `LEADBOARD_DB_PATH` | `server.db_path`   |
//! | `EMAIL_TO`          | `mail.to`          |
//! | `EMAIL_FROM`        | `mail.from`        |
//! | `RESEND_API_KEY`    | `mail.api_key`     |
//! | `LEADBOARD_LOG`     | `logging.filter`   |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "leadboard.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Enables permissive CORS for a separately served front-end.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".leadboard/leads.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            dev_mode: false,
        }
    }
}

/// Addresses and delivery settings for contact-form notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_mail_to")]
    pub to: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
    /// Base URL of the Resend API.
    #[serde(default = "default_mail_api_url")]
    pub api_url: String,
    /// Resend API key. Without one, notifications are only logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_mail_to() -> String {
    "contacto@fasonpro.com.ar".to_string()
}

fn default_mail_from() -> String {
    "onboarding@resend.dev".to_string()
}

fn default_mail_api_url() -> String {
    "https://api.resend.com".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            to: default_mail_to(),
            from: default_mail_from(),
            api_url: default_mail_api_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Also write a daily rolling log file into this directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            dir: None,
        }
    }
}

/// Contents of `leadboard.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadboardConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LeadboardConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse leadboard.toml")
    }

    /// Returns the default configuration if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize leadboard.toml")
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LEADBOARD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("LEADBOARD_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid LEADBOARD_PORT '{}'", port))?;
        }
        if let Some(path) = lookup("LEADBOARD_DB_PATH") {
            self.server.db_path = PathBuf::from(path);
        }
        if let Some(to) = lookup("EMAIL_TO") {
            self.mail.to = to;
        }
        if let Some(from) = lookup("EMAIL_FROM") {
            self.mail.from = from;
        }
        if let Some(key) = lookup("RESEND_API_KEY") {
            self.mail.api_key = Some(key);
        }
        if let Some(filter) = lookup("LEADBOARD_LOG") {
            self.logging.filter = filter;
        }
        Ok(())
    }

    /// File → process environment. CLI flags are applied by each command.
    pub fn resolve(path: &Path) -> Result<Self> {
        let mut config = Self::load_or_default(path)?;
        config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))?;
        Ok(config)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0: the OS will pick a random port".to_string());
        }
        if self.server.host.trim().is_empty() {
            warnings.push("server.host is empty".to_string());
        }
        if self.server.db_path.as_os_str().is_empty() {
            warnings.push("server.db_path is empty".to_string());
        }
        for (key, value) in [("mail.to", &self.mail.to), ("mail.from", &self.mail.from)] {
            if !value.contains('@') {
                warnings.push(format!("{} '{}' is not an email address", key, value));
            }
        }
        if self.mail.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            warnings.push("mail.api_key is empty: contact notifications are only logged".to_string());
        }
        if self.logging.filter.trim().is_empty() {
            warnings.push("logging.filter is empty".to_string());
        }

        warnings
    }

    /// Copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.mail.api_key.is_some() {
            config.mail.api_key = Some("********".to_string());
        }
        config
    }
}
