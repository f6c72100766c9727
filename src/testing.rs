//! Scripted collaborators for unit tests

use crate::completion::{Completion, CompletionClient, CompletionOptions};
use crate::context::ServiceContext;
use crate::error::OrchestrationError;
use crate::models::{FilingRecord, MetadataFilter, ScoredMatch};
use crate::provider::FinancialDataProvider;
use crate::vector::{Embedder, VectorStore};
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Reply {
    Text(String),
    Delayed(String, Duration),
    Fail(String),
}

struct Rule {
    needles: Vec<String>,
    reply: Reply,
}

/// Completion stub that answers with the first rule whose needles all occur
/// in the prompt. Unmatched prompts fail.
pub struct ScriptedCompletion {
    rules: Vec<Rule>,
    calls: Mutex<Vec<(String, CompletionOptions)>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self {
            rules: vec![],
            calls: Mutex::new(vec![]),
        }
    }

    pub fn on(mut self, needles: &[&str], reply: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Reply::Text(reply.to_string()),
        });
        self
    }

    /// Like `on`, but the reply only arrives after `delay`.
    pub fn slow_on(mut self, needles: &[&str], reply: &str, delay: Duration) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Reply::Delayed(reply.to_string(), delay),
        });
        self
    }

    pub fn fail_on(mut self, needles: &[&str], message: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: Reply::Fail(message.to_string()),
        });
        self
    }

    pub fn calls(&self) -> Vec<(String, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(prompt, _)| prompt.contains(needle))
            .count()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.needles.iter().all(|n| prompt.contains(n.as_str())));

        match rule.map(|r| &r.reply) {
            Some(Reply::Text(text)) => Ok(Completion { text: text.clone() }),
            Some(Reply::Delayed(text, delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(Completion { text: text.clone() })
            }
            Some(Reply::Fail(message)) => Err(OrchestrationError::LlmError(message.clone())),
            None => Err(OrchestrationError::LlmError(format!(
                "no scripted reply for prompt: {}",
                prompt
            ))),
        }
    }
}

pub struct FixedEmbedder {
    fail: bool,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(OrchestrationError::EmbeddingError("embedding service down".into()));
        }
        Ok(vec![0.1, 0.2, 0.3, 0.4])
    }
}

/// Vector store returning canned matches and recording every query.
pub struct RecordingVectorStore {
    filtered: Vec<ScoredMatch>,
    unfiltered: Vec<ScoredMatch>,
    fail: Option<String>,
    queries: Mutex<Vec<(usize, Option<MetadataFilter>)>>,
}

impl RecordingVectorStore {
    /// Same matches whether or not a filter is applied.
    pub fn with_matches(matches: Vec<ScoredMatch>) -> Self {
        Self {
            filtered: matches.clone(),
            unfiltered: matches,
            fail: None,
            queries: Mutex::new(vec![]),
        }
    }

    pub fn split(filtered: Vec<ScoredMatch>, unfiltered: Vec<ScoredMatch>) -> Self {
        Self {
            filtered,
            unfiltered,
            fail: None,
            queries: Mutex::new(vec![]),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            filtered: vec![],
            unfiltered: vec![],
            fail: Some(message.to_string()),
            queries: Mutex::new(vec![]),
        }
    }

    pub fn queries(&self) -> Vec<(usize, Option<MetadataFilter>)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for RecordingVectorStore {
    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
        _include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>> {
        self.queries.lock().unwrap().push((top_k, filter.cloned()));

        if let Some(message) = &self.fail {
            return Err(OrchestrationError::VectorStoreError(message.clone()));
        }

        let source = if filter.is_some() {
            &self.filtered
        } else {
            &self.unfiltered
        };
        Ok(source.iter().take(top_k).cloned().collect())
    }
}

/// Provider returning one canned filing (or nothing, or an error).
pub struct StubProvider {
    filing: Option<FilingRecord>,
    fail: Option<String>,
    calls: Mutex<Vec<(String, i32)>>,
}

impl StubProvider {
    pub fn with_filing(filing: FilingRecord) -> Self {
        Self {
            filing: Some(filing),
            fail: None,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn empty() -> Self {
        Self {
            filing: None,
            fail: None,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            filing: None,
            fail: Some(message.to_string()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<(String, i32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FinancialDataProvider for StubProvider {
    async fn get_annual_filing(&self, ticker: &str, year: i32) -> Result<Option<FilingRecord>> {
        self.calls.lock().unwrap().push((ticker.to_string(), year));

        if let Some(message) = &self.fail {
            return Err(OrchestrationError::ProviderError(message.clone()));
        }
        Ok(self.filing.clone())
    }
}

pub fn passage(text: &str, company: &str, year: f64) -> ScoredMatch {
    ScoredMatch {
        score: 0.87,
        metadata: json!({ "text": text, "company": company, "year": year }),
    }
}

pub fn tesla_filing() -> Value {
    json!({
        "fiscal_year": "2022",
        "company_name": "Tesla, Inc.",
        "financials": {
            "income_statement": {
                "revenues": { "value": 81462000000.0, "unit": "USD" },
                "net_income_loss": { "value": 12556000000.0, "unit": "USD" }
            },
            "balance_sheet": {
                "liabilities": { "value": 36440000000.0, "unit": "USD" }
            }
        }
    })
}

pub fn context(
    completion: Arc<ScriptedCompletion>,
    vectors: Arc<RecordingVectorStore>,
    provider: Arc<StubProvider>,
) -> ServiceContext {
    ServiceContext::new(completion, Arc::new(FixedEmbedder::new()), vectors, provider)
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve_locally(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
