//! Environment-driven configuration
//!
//! Values come from the process environment, with a `.env` file loaded first
//! when present.

use crate::error::OrchestrationError;
use crate::Result;
use std::str::FromStr;
use std::time::Duration;

/// Knobs the pipeline itself reads. Kept apart from `Config` so tests can
/// build them without touching the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Matches returned alongside a qualitative answer.
    pub retrieval_top_k: usize,
    /// Passages fed to the narrative answer completion.
    pub answer_top_k: usize,
    /// Sub-questions processed at once within one request.
    pub subquestion_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retrieval_top_k: 10,
            answer_top_k: 5,
            subquestion_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub polygon_api_key: String,
    pub pinecone_api_key: String,
    pub index_name: String,
    pub pinecone_index_host: Option<String>,
    pub completion_model: String,
    pub embedding_model: String,
    pub port: u16,
    pub allowed_origin: String,
    pub http_timeout: Duration,
    pub pipeline: PipelineSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                OrchestrationError::ConfigError(format!("{} is missing from environment variables", key))
            })
        };

        let defaults = PipelineSettings::default();

        let pipeline = PipelineSettings {
            retrieval_top_k: parse_or(get("RETRIEVAL_TOP_K"), "RETRIEVAL_TOP_K", defaults.retrieval_top_k)?,
            answer_top_k: parse_or(get("ANSWER_TOP_K"), "ANSWER_TOP_K", defaults.answer_top_k)?,
            subquestion_concurrency: parse_or(
                get("SUBQUESTION_CONCURRENCY"),
                "SUBQUESTION_CONCURRENCY",
                defaults.subquestion_concurrency,
            )?,
        };

        if pipeline.retrieval_top_k == 0 || pipeline.answer_top_k == 0 || pipeline.subquestion_concurrency == 0 {
            return Err(OrchestrationError::ConfigError(
                "top-k and concurrency settings must be greater than zero".to_string(),
            ));
        }

        let port = parse_or(get("PORT").or_else(|| get("API_PORT")), "PORT", 8080u16)?;
        let timeout_secs = parse_or(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 60u64)?;

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            polygon_api_key: required("POLYGON_API_KEY")?,
            pinecone_api_key: required("PINECONE_API_KEY")?,
            index_name: get("INDEX_NAME").unwrap_or_else(|| "sec-filings".to_string()),
            pinecone_index_host: get("PINECONE_INDEX_HOST"),
            completion_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-ada-002".to_string()),
            port,
            allowed_origin: get("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            http_timeout: Duration::from_secs(timeout_secs),
            pipeline,
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            OrchestrationError::ConfigError(format!("{} has an invalid value: {}", key, raw))
        }),
        None => Ok(default),
    }
}
