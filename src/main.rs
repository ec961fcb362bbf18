use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use leadboard::config::{CONFIG_FILE, LeadboardConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "leadboard")]
#[command(version, about = "Lead pipeline CRM with a Kanban board")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to leadboard.toml
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the REST API and landing page
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Keep leads in memory only
        #[arg(long, conflicts_with = "db_path")]
        in_memory: bool,

        /// Enable dev mode (permissive CORS)
        #[arg(long)]
        dev: bool,

        /// Open the landing page in a browser once the server is up
        #[arg(long)]
        open: bool,
    },
    /// Create the lead database and run migrations
    InitDb {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Report database connectivity and lead count
    CheckDb {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// List the pipeline stages
    Stages,
    /// Print the board: one column per stage, with stats
    Board {
        #[command(flatten)]
        source: StoreArgs,
    },
    /// Move a lead to another stage
    Move {
        lead_id: String,
        /// Target stage id, e.g. "ganado"
        stage: String,
        #[command(flatten)]
        source: StoreArgs,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

/// Where board commands read and write leads.
#[derive(clap::Args, Clone)]
pub struct StoreArgs {
    /// Talk to a running server instead of the local database
    #[arg(long, value_name = "URL")]
    pub api: Option<String>,

    #[arg(long, conflicts_with = "api")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default leadboard.toml file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = LeadboardConfig::resolve(&cli.config)?;
    let _log_guard = leadboard::logging::init_tracing(&config.logging, cli.verbose)?;

    let db_path = |flag: &Option<PathBuf>| {
        flag.clone()
            .unwrap_or_else(|| config.server.db_path.clone())
    };

    match &cli.command {
        Commands::Serve {
            port,
            host,
            db_path: db_flag,
            in_memory,
            dev,
            open,
        } => {
            let server = leadboard::crm::server::ServerConfig {
                host: host.clone().unwrap_or_else(|| config.server.host.clone()),
                port: port.unwrap_or(config.server.port),
                db_path: db_path(db_flag),
                in_memory: *in_memory,
                dev_mode: *dev || config.server.dev_mode,
                open_browser: *open,
                mail: config.mail.clone(),
            };
            cmd::cmd_serve(server).await?;
        }
        Commands::InitDb { db_path: db_flag } => cmd::cmd_init_db(&db_path(db_flag))?,
        Commands::CheckDb { db_path: db_flag } => cmd::cmd_check_db(&db_path(db_flag)).await?,
        Commands::Stages => cmd::cmd_stages(),
        Commands::Board { source } => {
            let store = cmd::open_store(source.api.as_deref(), &db_path(&source.db_path))?;
            cmd::cmd_board(store).await?;
        }
        Commands::Move {
            lead_id,
            stage,
            source,
        } => {
            let store = cmd::open_store(source.api.as_deref(), &db_path(&source.db_path))?;
            cmd::cmd_move(store, lead_id, stage).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&cli.config, &config, command.clone())?,
    }

    Ok(())
}
