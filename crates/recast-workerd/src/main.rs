mod setup;
mod state;
mod telemetry;

use recast_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry()?;

    // Load configuration (fails fast on misconfiguration)
    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "Configuration loaded");

    let (state, queue) = setup::initialize_app(&config).await?;

    tracing::info!("Worker daemon running, waiting for job tasks");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to listen for shutdown signal: {}", e))?;

    tracing::info!("Shutdown signal received");
    queue.shutdown().await;

    // Keep the dispatch context alive until the pool has been told to stop.
    drop(state);

    Ok(())
}
