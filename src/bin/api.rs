use ledger_chat_agent::{api::start_server, build_store, Agent, AgentConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AgentConfig::from_env()?;
    let api_port = config.port;

    info!("🚀 Ledger Chat Agent - API Server");
    info!("📍 Port: {}", api_port);
    info!(categorizer = %config.categorizer, "Default categorizer");

    let store = build_store(&config);
    let agent = Arc::new(Agent::new(store, config));

    info!("✅ Agent initialized");
    info!("📡 Starting API server...");

    start_server(agent, api_port).await?;

    Ok(())
}
