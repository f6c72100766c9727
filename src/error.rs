//! Error types for the hybrid query pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Pipeline Stage Errors
    // =============================

    /// The compound question could not be turned into a list of sub-questions.
    /// Fatal to the whole request.
    #[error("Decomposition error: {message} | raw={raw}")]
    DecompositionError { message: String, raw: String },

    #[error("Classification error: {0}")]
    ClassificationError(String),

    #[error("Parameter extraction error: {message} | raw={raw}")]
    ParameterExtractionError { message: String, raw: String },

    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    // =============================
    // External Collaborator Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("Financial data provider error: {0}")]
    ProviderError(String),

    // =============================
    // Service Errors
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
