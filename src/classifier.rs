//! Sub-question Classifier
//!
//! Labels a sub-question as either:
//! - Quantitative: numeric financial data (e.g., "what was Tesla's net income in 2022?")
//! - Qualitative: strategy, risks, operations (e.g., "what are Apple's biggest risks?")
//!
//! Anything else the model says maps to `UnsupportedOther`; an odd label never
//! aborts the batch.

use crate::completion::{CompletionClient, CompletionOptions};
use crate::error::OrchestrationError;
use crate::models::Classification;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, warn};

const QUANTITATIVE_LABEL: &str = "quantitative";
const QUALITATIVE_LABEL: &str = "qualitative";

pub struct SubquestionClassifier {
    completion: Arc<dyn CompletionClient>,
}

impl SubquestionClassifier {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Classify a single sub-question
    pub async fn classify(&self, subquestion: &str) -> Result<Classification> {
        Ok(self.classify_labelled(subquestion).await?.0)
    }

    /// Classification plus the normalized label the model returned.
    pub async fn classify_labelled(&self, subquestion: &str) -> Result<(Classification, String)> {
        let options = CompletionOptions {
            max_output_tokens: Some(5),
            temperature: Some(0.0),
            response_format: None,
        };

        let completion = self
            .completion
            .complete(&build_prompt(subquestion), &options)
            .await
            .map_err(|e| OrchestrationError::ClassificationError(e.to_string()))?;

        let label = normalize_label(&completion.text);
        let classification = classify_label(&label);

        if classification == Classification::UnsupportedOther {
            warn!(subquestion, label = %label, "Unrecognized classification label");
        } else {
            debug!(subquestion, ?classification, "Sub-question classified");
        }

        Ok((classification, label))
    }
}

fn build_prompt(subquestion: &str) -> String {
    format!(
        r#"Classify the following query:
- 'quantitative': for numeric financial data (revenue, net income, earnings, liabilities, cash flow, ratios)
- 'qualitative': for strategic/operational content (risks, strategy, business operations, leadership)
Respond with exactly one word: quantitative or qualitative.
Query: "{}""#,
        subquestion
    )
}

fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Map a normalized label onto the fixed set. Never fails.
pub fn classify_label(label: &str) -> Classification {
    match label {
        QUANTITATIVE_LABEL => Classification::Quantitative,
        QUALITATIVE_LABEL => Classification::Qualitative,
        _ => Classification::UnsupportedOther,
    }
}
