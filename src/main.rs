mod config;
mod dto;
mod handlers;
mod hasher;
mod html;
mod models;
mod repository;
mod service;
mod session;

use std::{sync::Arc, time::Duration};

use handlers::AppState;
use hasher::Argon2Hasher;
use repository::{MemoryRepository, PgRepository, Repository};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Config loading
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            panic!("failed to load configuration: {e}");
        }
    };

    // Repository creation and migration
    let repo: Arc<dyn Repository> = match &config.database_dsn {
        Some(database_dsn) => {
            let mut repo = PgRepository::connect(database_dsn)
                .await
                .expect("failed to establish database connection");
            repo.migrate().await.expect("failed to migrate database");
            Arc::new(repo)
        }
        None => {
            tracing::warn!("No database DSN configured, notes are kept in memory");
            Arc::new(MemoryRepository::new())
        }
    };

    let hasher = Argon2Hasher::new(&config.hasher).expect("invalid password hasher parameters");

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState::new(config, repo, Arc::new(hasher)));

    // Expired session cleanup
    let sessions_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions_state.sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} expired sessions", purged);
            }
        }
    });

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("failed to bind listen address");

    // Starting router
    tracing::info!(
        "Started listening on {}",
        listener
            .local_addr()
            .map_or_else(|_| listen_addr.clone(), |addr| addr.to_string())
    );
    axum::serve(listener, app)
        .await
        .expect("failed to start server");
}
