//! SEC Hybrid RAG
//!
//! Answers natural-language questions about 10-K filings by routing each
//! sub-question to one of two paths:
//! - qualitative: metadata-filtered vector search plus a narrative answer
//! - quantitative: structured financials lookup plus model-assisted value extraction
//!
//! HYBRID PIPELINE:
//! INPUT → DECOMPOSE → CLASSIFY → {RETRIEVE | RESOLVE} → SYNTHESIZE → COMPLETE

pub mod agent;
pub mod api;
pub mod classifier;
pub mod completion;
pub mod config;
pub mod context;
pub mod decomposer;
pub mod error;
pub mod extraction;
pub mod models;
pub mod parsing;
pub mod provider;
pub mod resolver;
pub mod retriever;
pub mod synthesizer;
pub mod vector;

#[cfg(test)]
mod testing;

pub use error::{OrchestrationError, Result};

// Re-export common types
pub use agent::Orchestrator;
pub use config::{Config, PipelineSettings};
pub use context::ServiceContext;
pub use models::*;
