//! Network Map Directory Service

use netmap_directory::DirectoryConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netmap_directory=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting Network Map Directory Service");

    let config = DirectoryConfig::from_env()?;

    netmap_directory::run(config).await?;

    Ok(())
}
