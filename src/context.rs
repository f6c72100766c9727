//! Shared external collaborators
//!
//! Built once at start-up and handed to every pipeline component. The clients
//! pool their own connections, so the context is cheap to clone and safe to
//! share across concurrent requests.

use crate::completion::{CompletionClient, OpenAiClient};
use crate::config::Config;
use crate::provider::{FinancialDataProvider, PolygonClient};
use crate::vector::{Embedder, PineconeIndex, VectorStore};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ServiceContext {
    pub completion: Arc<dyn CompletionClient>,
    pub embedder: Arc<dyn Embedder>,
    pub vectors: Arc<dyn VectorStore>,
    pub provider: Arc<dyn FinancialDataProvider>,
}

impl ServiceContext {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        provider: Arc<dyn FinancialDataProvider>,
    ) -> Self {
        Self {
            completion,
            embedder,
            vectors,
            provider,
        }
    }

    /// Wire up the production clients (OpenAI, Pinecone, Polygon).
    pub async fn from_config(config: &Config) -> Result<Self> {
        let openai = Arc::new(
            OpenAiClient::new(
                config.openai_api_key.clone(),
                config.completion_model.clone(),
                config.embedding_model.clone(),
                config.http_timeout,
            )?,
        );

        let index = PineconeIndex::connect(
            config.pinecone_api_key.clone(),
            &config.index_name,
            config.pinecone_index_host.clone(),
            config.http_timeout,
        )
        .await?;

        match index.describe_index_stats().await {
            Ok(stats) if stats.total_vector_count > 0 => {
                info!(
                    total_vectors = stats.total_vector_count,
                    dimension = ?stats.dimension,
                    "Embeddings already exist in Pinecone"
                );
            }
            Ok(_) => warn!("No embeddings found in Pinecone index {}", config.index_name),
            Err(e) => warn!("Could not read Pinecone index stats: {}", e),
        }

        let polygon = PolygonClient::new(config.polygon_api_key.clone(), config.http_timeout)?;

        Ok(Self {
            completion: openai.clone(),
            embedder: openai,
            vectors: Arc::new(index),
            provider: Arc::new(polygon),
        })
    }
}
