use sec_hybrid_rag::{
    agent::Orchestrator, api::start_server, config::Config, context::ServiceContext,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    info!("SEC hybrid RAG - API Server");
    info!(
        port = config.port,
        index = %config.index_name,
        model = %config.completion_model,
        "Configuration loaded"
    );

    let context = ServiceContext::from_config(&config).await?;
    let orchestrator = Arc::new(Orchestrator::new(&context, config.pipeline.clone()));

    info!("Orchestrator initialized");

    start_server(orchestrator, &config).await?;

    Ok(())
}
