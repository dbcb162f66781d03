use store_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, logging)
    setup_environment();

    tracing::info!("🛒 Store server starting...");

    // 2. Load configuration
    let config = Config::from_env();
    if config.is_production() {
        tracing::info!("Running in production mode");
    }

    // 3. Build the service graph
    let state = ServerState::initialize(&config);

    // 4. Serve
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
