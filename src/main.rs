use tideq::{Config, RespServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // Get configuration from environment variables
    let config = Config::from_env()?;
    tracing::info!(
        backend = ?config.backend,
        visibility_timeout_secs = config.visibility_timeout.as_secs(),
        "starting tideq"
    );

    let service = config.build_service()?;

    // Create and run RESP server
    let server = RespServer::new(config.resp, service);
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }

    Ok(())
}
