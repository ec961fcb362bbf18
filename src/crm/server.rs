use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::contact::mailer_for;
use super::embedded::Assets;
use super::store::{LeadStore, MemoryLeadStore, SqliteLeadStore};
use crate::config::MailConfig;

/// Configuration for the lead server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Keep leads in process memory instead of SQLite.
    pub in_memory: bool,
    pub dev_mode: bool,
    /// Open the landing page in a browser once bound.
    pub open_browser: bool,
    pub mail: MailConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            db_path: PathBuf::from(".leadboard/leads.db"),
            in_memory: false,
            dev_mode: false,
            open_browser: false,
            mail: MailConfig::default(),
        }
    }
}

/// Build the full application router with API and static page serving.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve embedded static files. `/gracias` resolves to `gracias.html`; any
/// other unknown path falls back to `index.html`.
async fn static_handler(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty() {
        let candidates = [path.to_string(), format!("{}.html", path)];
        for candidate in &candidates {
            if let Some(content) = Assets::get(candidate) {
                let mime = mime_guess::from_path(candidate).first_or_octet_stream();
                return (
                    [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                    content.data.into_owned(),
                )
                    .into_response();
            }
        }
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).to_string()).into_response(),
        None => (StatusCode::NOT_FOUND, "Landing page not found").into_response(),
    }
}

fn open_store(config: &ServerConfig) -> Result<Arc<dyn LeadStore>> {
    if config.in_memory {
        tracing::warn!("using in-memory lead store; leads are lost on shutdown");
        return Ok(Arc::new(MemoryLeadStore::new()));
    }

    if let Some(parent) = config.db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let store = SqliteLeadStore::open(&config.db_path)
        .with_context(|| format!("Failed to open lead database {}", config.db_path.display()))?;
    tracing::info!(path = %config.db_path.display(), "lead database ready");
    Ok(Arc::new(store))
}

/// Start the lead server and block until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let store = open_store(&config)?;
    let state = Arc::new(AppState {
        store,
        mailer: mailer_for(&config.mail),
        mail: config.mail.clone(),
    });

    let mut app = build_router(state);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    let url = format!("http://{}", local_addr);
    tracing::info!(%url, dev_mode = config.dev_mode, "server listening");
    println!("Leadboard running at {}", url);

    if config.open_browser
        && let Err(e) = open::that(&url)
    {
        tracing::warn!(error = %e, "could not open browser");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
