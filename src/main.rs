mod api;
mod config;
mod controller;
mod devices;
mod form;
mod session;
mod table;
mod ui;
mod view;
mod web;

use crate::api::HttpBackend;
use crate::config::AppConfig;
use crate::session::Sessions;
use crate::web::AppState;
use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = Arc::new(AppConfig::from_env());

    tracing::info!(
        "Starting aq-downloader on {} (backend: {})",
        config.http_bind,
        config.backend_url
    );

    let backend = Arc::new(HttpBackend::new(config.backend_url.clone()));
    let sessions = Sessions::new(backend, config.default_range_days, config.session_idle);

    let state = AppState {
        config: config.clone(),
        sessions: Arc::new(sessions),
    };

    web::serve(state).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    let _ = fmt().with_env_filter(env_filter).try_init();
}
