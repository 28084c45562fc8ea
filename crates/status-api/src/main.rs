//! Status API Server
//!
//! REST API server for registration, authentication and status posts.
//!
//! Author: hephaex@gmail.com

use status_api::{create_router, state::AppState};
use status_core::{AppConfig, AuthConfig, LoggingConfig, PgStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How often expired sessions and revocations are purged
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    if config.auth.jwt_secret == AuthConfig::default().jwt_secret {
        tracing::warn!("JWT_SECRET is not set; using the development secret");
    }

    let state = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, config.database.pool_size).await?;
            store.migrate().await?;
            tracing::info!("Connected to PostgreSQL");
            AppState::with_postgres(config.clone(), store)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using the in-memory store");
            AppState::in_memory(config.clone())
        }
    };
    let state = Arc::new(state);

    tokio::spawn(purge_sessions(state.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Status API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &logging.level;
        format!("status_api={level},status_core={level},tower_http=debug,audit=info").into()
    });

    if logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn purge_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        interval.tick().await;
        let removed = state.auth.sessions().purge_expired().await;
        if removed > 0 {
            tracing::debug!(removed, "Purged expired sessions");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
