//! Embedding and vector search contracts
//!
//! The index itself is built offline; this side only embeds questions and
//! runs similarity queries against it.

use crate::models::{MetadataFilter, ScoredMatch};
use crate::Result;
use async_trait::async_trait;

pub mod pinecone;
pub use pinecone::PineconeIndex;

/// Turns text into a query vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Similarity search over the filing index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top-k nearest neighbours, optionally restricted by an equality filter.
    /// Filter fields combine with logical AND.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>>;
}
