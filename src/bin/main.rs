use sec_hybrid_rag::{agent::Orchestrator, config::Config, context::ServiceContext};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only the JSON response
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        eprintln!("usage: orchestrator <question...>");
        std::process::exit(2);
    }

    let config = Config::from_env()?;
    let context = ServiceContext::from_config(&config).await?;
    let orchestrator = Orchestrator::new(&context, config.pipeline.clone());

    info!(question = %question, "Running hybrid query");

    match orchestrator.run(question.trim()).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Hybrid query failed");
            eprintln!("Subquestion splitting failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
