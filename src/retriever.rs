//! Narrative Retriever (qualitative path)
//!
//! entity extraction → embed → filtered top-k search → narrative answer.
//! Nothing thrown inside crosses `answer_qualitative`; errors become a
//! `Failed { stage: retrieval }` result.

use crate::completion::{CompletionClient, CompletionOptions};
use crate::context::ServiceContext;
use crate::extraction::EntityExtractor;
use crate::models::{FailureStage, Passage, ScoredMatch, SubquestionResult};
use crate::vector::{Embedder, VectorStore};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub const NO_CONTEXT_ANSWER: &str = "No relevant passages were found to answer this question.";

pub struct NarrativeRetriever {
    entities: EntityExtractor,
    completion: Arc<dyn CompletionClient>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
    retrieval_top_k: usize,
    answer_top_k: usize,
}

impl NarrativeRetriever {
    pub fn new(context: &ServiceContext, retrieval_top_k: usize, answer_top_k: usize) -> Self {
        Self {
            entities: EntityExtractor::new(context.completion.clone()),
            completion: context.completion.clone(),
            embedder: context.embedder.clone(),
            vectors: context.vectors.clone(),
            retrieval_top_k,
            answer_top_k,
        }
    }

    pub async fn answer_qualitative(&self, subquestion: &str) -> SubquestionResult {
        match self.try_answer(subquestion).await {
            Ok(result) => result,
            Err(e) => {
                warn!(subquestion, error = %e, "Qualitative path failed");
                SubquestionResult::failed(subquestion, FailureStage::Retrieval, e.to_string())
            }
        }
    }

    async fn try_answer(&self, subquestion: &str) -> Result<SubquestionResult> {
        let entities = self.entities.extract(subquestion).await;

        let vector = self.embedder.embed(subquestion).await?;

        let filter = entities.filter();

        let matches = self
            .vectors
            .query(&vector, self.retrieval_top_k, filter.as_ref(), true)
            .await?;

        let retrieved_passages: Vec<Passage> =
            matches.into_iter().map(ScoredMatch::into_passage).collect();

        info!(
            subquestion,
            matches = retrieved_passages.len(),
            filtered = filter.is_some(),
            "Vector search complete"
        );

        let narrative_answer = self.narrative_answer(subquestion, &vector).await?;

        Ok(SubquestionResult::Qualitative {
            question: subquestion.to_string(),
            filter_used: filter,
            retrieved_passages,
            narrative_answer,
        })
    }

    /// Retrieval-augmented answer over the unfiltered nearest passages.
    async fn narrative_answer(&self, subquestion: &str, vector: &[f32]) -> Result<String> {
        let context = self
            .vectors
            .query(vector, self.answer_top_k, None, true)
            .await?;

        let passages: Vec<String> = context
            .into_iter()
            .map(|m| m.into_passage().text)
            .filter(|text| !text.trim().is_empty())
            .collect();

        if passages.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let completion = self
            .completion
            .complete(
                &build_answer_prompt(subquestion, &passages),
                &CompletionOptions::default(),
            )
            .await?;

        Ok(completion.text.trim().to_string())
    }
}

fn build_answer_prompt(subquestion: &str, passages: &[String]) -> String {
    let context = passages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Context information from 10-K filings is below.
---------------------
{}
---------------------
Answer the question using only the context information above, not prior knowledge.

Query: {}
Answer:"#,
        context, subquestion
    )
}
