use aura_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (telemetry, storage, services, routes)
    let (_state, router) = aura_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    aura_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
