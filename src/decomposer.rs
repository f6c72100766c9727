//! Question decomposition
//!
//! Splits one compound question into the independent sub-questions it
//! actually implies. A failure here is fatal to the request: there is nothing
//! left to iterate over.

use crate::completion::{CompletionClient, CompletionOptions};
use crate::error::OrchestrationError;
use crate::models::SubQuestion;
use crate::parsing::parse_array;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Decomposer {
    completion: Arc<dyn CompletionClient>,
}

impl Decomposer {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Ordered sub-questions for `question`. An empty list is a valid answer.
    pub async fn decompose(&self, question: &str) -> Result<Vec<SubQuestion>> {
        let prompt = build_prompt(question);

        let completion = self
            .completion
            .complete(&prompt, &CompletionOptions::default())
            .await?;

        debug!(raw = %completion.text, "Decomposer output");

        let subquestions = parse_subquestions(&completion.text)?;

        info!(count = subquestions.len(), "Question decomposed");

        Ok(subquestions)
    }
}

fn build_prompt(question: &str) -> String {
    format!(
        r#"Split the following query into independent, answerable subquestions.
ONLY include questions actually implied by the original query!
Do not invent unrelated subquestions.
Return the list in valid JSON format:
["subquestion1", "subquestion2"]

Query: "{}""#,
        question
    )
}

/// Read the completion as a JSON array of strings. Blank entries are dropped.
pub fn parse_subquestions(raw: &str) -> Result<Vec<SubQuestion>> {
    let parsed: Vec<String> = parse_array(raw).map_err(|failure| {
        OrchestrationError::DecompositionError {
            message: failure.to_string(),
            raw: raw.to_string(),
        }
    })?;

    Ok(parsed
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect())
}
