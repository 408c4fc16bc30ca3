//! Network map directory HTTP server

use axum::{
    Router,
    routing::{get, post},
};
use redis::Client as RedisClient;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::cache::SnapshotCache;
use crate::config::DirectoryConfig;
use crate::handlers::{self, AppState};
use crate::registration::RegistrationValidator;
use crate::storage::{DirectoryStorage, RedisStorage};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/network-map", get(handlers::get_network_map))
        .route("/network-map/publish", post(handlers::publish))
        .route("/network-map/node-info/:node_info_hash", get(handlers::get_node_info))
        .route(
            "/network-map/network-parameters/:hash",
            get(handlers::get_network_parameters),
        )
        .route("/network-map/my-ip", get(handlers::my_ip))
        .with_state(state)
}

/// Wire storage, cache and validator together over the given storage backend.
pub fn build_state(storage: Arc<dyn DirectoryStorage>, config: &DirectoryConfig) -> Arc<AppState> {
    let cache = Arc::new(SnapshotCache::new(storage.clone(), config.cache_timeout));
    let registration = RegistrationValidator::new(cache.clone(), storage);
    Arc::new(AppState {
        cache,
        registration,
    })
}

pub async fn run(config: DirectoryConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Connecting to Redis at {}", config.redis_url);
    let redis_client = RedisClient::open(config.redis_url.as_str())
        .map_err(|e| format!("Failed to create Redis client: {}", e))?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .map_err(|e| format!("Failed to connect to Redis: {}", e))?;
    tracing::info!("Connected to Redis");

    let storage = Arc::new(RedisStorage::new(redis_conn, &config.redis_key_prefix));
    let state = build_state(storage, &config);
    tracing::info!(
        "Network map cache timeout is {}ms",
        state.cache.ttl().as_millis()
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Network map directory listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Wait for SIGTERM or Ctrl+C, then let in-flight requests drain.
async fn shutdown_signal() {
    use tokio::signal;

    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Cannot install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = first_signal(interrupt, terminate).await;
    tracing::info!(signal = received, "Shutting down network map directory");
}

/// Name of whichever shutdown source fires first.
async fn first_signal(
    interrupt: impl Future<Output = ()>,
    terminate: impl Future<Output = ()>,
) -> &'static str {
    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{pending, ready};

    #[tokio::test]
    async fn test_first_signal_reports_interrupt() {
        assert_eq!(first_signal(ready(()), pending()).await, "SIGINT");
    }

    #[tokio::test]
    async fn test_first_signal_reports_terminate() {
        assert_eq!(first_signal(pending(), ready(())).await, "SIGTERM");
    }
}
