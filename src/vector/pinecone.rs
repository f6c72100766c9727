//! Pinecone data-plane client
//!
//! Only the query path and index statistics are used at request time.

use crate::error::OrchestrationError;
use crate::models::{MetadataFilter, ScoredMatch};
use crate::vector::VectorStore;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

pub struct PineconeIndex {
    client: Client,
    api_key: String,
    host: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub dimension: Option<u32>,
}

impl PineconeIndex {
    /// Connect to an index. When `host` is not given it is looked up by name
    /// on the control plane.
    pub async fn connect(
        api_key: String,
        index_name: &str,
        host: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        let host = match host {
            Some(host) => host,
            None => resolve_host(&client, &api_key, index_name).await?,
        };

        info!("Connected to Pinecone index: {} ({})", index_name, host);

        Ok(Self {
            client,
            api_key,
            host: normalize_host(&host),
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.host, path);

        let response = self
            .client
            .post(url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Pinecone request failed for {}: {}", path, e);
                OrchestrationError::VectorStoreError(format!(
                    "Pinecone request failed for {}: {}",
                    path, e
                ))
            })?;

        let status = response.status();
        let body = response.json::<Value>().await.map_err(|e| {
            OrchestrationError::VectorStoreError(format!("Invalid JSON response: {}", e))
        })?;

        if !status.is_success() {
            return Err(OrchestrationError::VectorStoreError(format!(
                "Pinecone returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(body)
    }

    pub async fn describe_index_stats(&self) -> Result<IndexStats> {
        let body = self.post_json("/describe_index_stats", &json!({})).await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl VectorStore for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>> {
        let body = build_query_body(vector, top_k, filter, include_metadata);

        debug!(top_k, filtered = filter.is_some(), "Querying Pinecone");

        let response = self.post_json("/query", &body).await?;
        parse_matches(response)
    }
}

async fn resolve_host(client: &Client, api_key: &str, index_name: &str) -> Result<String> {
    let url = format!("{}/indexes/{}", CONTROL_PLANE_URL, index_name);

    let response = client
        .get(url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
        .send()
        .await
        .map_err(|e| {
            OrchestrationError::ConfigError(format!(
                "Failed to describe Pinecone index {}: {}",
                index_name, e
            ))
        })?;

    let status = response.status();
    let body = response.json::<Value>().await.map_err(|e| {
        OrchestrationError::ConfigError(format!("Invalid Pinecone index description: {}", e))
    })?;

    if !status.is_success() {
        return Err(OrchestrationError::ConfigError(format!(
            "Pinecone index {} not available ({}): {}",
            index_name, status, body
        )));
    }

    body.get("host")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            OrchestrationError::ConfigError(format!("Pinecone index {} has no host", index_name))
        })
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Pinecone wire form of the equality filter.
pub fn pinecone_filter(filter: &MetadataFilter) -> Value {
    json!({
        "company": { "$eq": filter.company },
        "year": { "$eq": filter.year },
    })
}

fn build_query_body(
    vector: &[f32],
    top_k: usize,
    filter: Option<&MetadataFilter>,
    include_metadata: bool,
) -> Value {
    let mut body = json!({
        "vector": vector,
        "topK": top_k,
        "includeMetadata": include_metadata,
        "includeValues": false,
    });

    if let Some(filter) = filter {
        body["filter"] = pinecone_filter(filter);
    }

    body
}

fn parse_matches(response: Value) -> Result<Vec<ScoredMatch>> {
    let Some(matches) = response.get("matches").and_then(Value::as_array) else {
        return Ok(vec![]);
    };

    matches
        .iter()
        .map(|m| {
            let mut parsed: ScoredMatch = serde_json::from_value(m.clone())?;
            if parsed.metadata.is_null() {
                parsed.metadata = json!({});
            }
            Ok(parsed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_float_year() {
        let filter = MetadataFilter {
            company: "Apple".into(),
            year: 2021.0,
        };
        let wire = pinecone_filter(&filter);
        assert_eq!(wire["company"]["$eq"], "Apple");
        assert!(wire["year"]["$eq"].is_f64());
        assert_eq!(wire["year"]["$eq"].as_f64(), Some(2021.0));
    }

    #[test]
    fn test_query_body_without_filter() {
        let body = build_query_body(&[0.1, 0.2], 10, None, true);
        assert_eq!(body["topK"], 10);
        assert_eq!(body["includeMetadata"], true);
        assert!(body.get("filter").is_none());
    }

    #[test]
    fn test_parse_matches() {
        let response = json!({
            "matches": [
                { "id": "a", "score": 0.91, "metadata": { "text": "Supply chain risk", "company": "Apple", "year": 2024.0 } },
                { "id": "b", "score": 0.75 }
            ],
            "namespace": ""
        });

        let matches = parse_matches(response).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].metadata["text"], "Supply chain risk");
        assert_eq!(matches[1].metadata, json!({}));

        let empty = parse_matches(json!({ "namespace": "" })).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("sec-filings-abc.svc.pinecone.io"),
            "https://sec-filings-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }
}
