use lost_found_orchestrator::{
    api::start_server,
    config::AppConfig,
    repository::InMemoryRepository,
    workflow::WorkflowOrchestrator,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("🚀 Lost & Found Orchestrator - API Server");
    info!("📍 Port: {}", config.port);
    if config.uses_stub() {
        info!("📌 GEMINI_API_KEY not set, serving stub replies (see .env.example)");
    }

    let repository = Arc::new(InMemoryRepository::demo());
    let orchestrator = Arc::new(WorkflowOrchestrator::from_config(&config, repository)?);

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, config.port).await?;

    Ok(())
}
