//! Final synthesis
//!
//! Merges every sub-question result, failures included, into one paragraph.

use crate::completion::{CompletionClient, CompletionOptions};
use crate::error::OrchestrationError;
use crate::models::SubquestionResult;
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub struct Synthesizer {
    completion: Arc<dyn CompletionClient>,
}

impl Synthesizer {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    pub async fn synthesize(&self, results: &[SubquestionResult]) -> Result<String> {
        let prompt = build_prompt(results)?;

        let completion = self
            .completion
            .complete(&prompt, &CompletionOptions::default())
            .await?;

        let summary = completion.text.trim();
        if summary.is_empty() {
            return Err(OrchestrationError::SynthesisError(
                "model returned an empty summary".to_string(),
            ));
        }

        info!(results = results.len(), "Summary generated");
        Ok(summary.to_string())
    }
}

fn build_prompt(results: &[SubquestionResult]) -> Result<String> {
    let rendered = serde_json::to_string_pretty(results)?;

    Ok(format!(
        r#"Here are multiple subquestion answers:
{}
Some entries may be failures; mention briefly what could not be answered.
Generate a single coherent paragraph summarizing the overall answer."#,
        rendered
    ))
}
