//! Hybrid pipeline orchestrator
//!
//! INPUT → DECOMPOSE → (CLASSIFY → DISPATCH) per sub-question → SYNTHESIZE → COMPLETE
//!
//! Only decomposition can fail the request. Per-sub-question failures are
//! recorded as `Failed` results and synthesis failures degrade the summary.

use crate::classifier::SubquestionClassifier;
use crate::config::PipelineSettings;
use crate::context::ServiceContext;
use crate::decomposer::Decomposer;
use crate::models::{Classification, FailureStage, HybridResponse, SubquestionResult};
use crate::resolver::MetricResolver;
use crate::retriever::NarrativeRetriever;
use crate::synthesizer::Synthesizer;
use crate::Result;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const NO_SUBQUESTIONS_SUMMARY: &str = "No answerable sub-questions were found in the query.";

/// Main orchestrator that coordinates the entire workflow
pub struct Orchestrator {
    decomposer: Decomposer,
    classifier: SubquestionClassifier,
    retriever: NarrativeRetriever,
    resolver: MetricResolver,
    synthesizer: Synthesizer,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(context: &ServiceContext, settings: PipelineSettings) -> Self {
        Self {
            decomposer: Decomposer::new(context.completion.clone()),
            classifier: SubquestionClassifier::new(context.completion.clone()),
            retriever: NarrativeRetriever::new(
                context,
                settings.retrieval_top_k,
                settings.answer_top_k,
            ),
            resolver: MetricResolver::new(context),
            synthesizer: Synthesizer::new(context.completion.clone()),
            concurrency: settings.subquestion_concurrency.max(1),
        }
    }

    pub fn classifier(&self) -> &SubquestionClassifier {
        &self.classifier
    }

    pub fn retriever(&self) -> &NarrativeRetriever {
        &self.retriever
    }

    pub fn resolver(&self) -> &MetricResolver {
        &self.resolver
    }

    /// Run one question through the pipeline
    pub async fn run(&self, question: &str) -> Result<HybridResponse> {
        let start_time = Instant::now();

        info!(question, "Orchestrator: starting hybrid query");

        // === DECOMPOSE ===
        let subquestions = self.decomposer.decompose(question).await?;

        // === PER SUB-QUESTION ===
        // `buffered` yields in input order whatever order the futures finish in.
        let pending: Vec<_> = subquestions
            .iter()
            .map(|subquestion| self.process(subquestion.as_str()))
            .collect();
        let results: Vec<SubquestionResult> = stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_failed()).count();
        debug!(
            total = results.len(),
            failed,
            "Sub-question processing complete"
        );

        // === SYNTHESIZE ===
        let summary = if results.is_empty() {
            NO_SUBQUESTIONS_SUMMARY.to_string()
        } else {
            match self.synthesizer.synthesize(&results).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(error = %e, "Synthesis failed - returning degraded summary");
                    format!("Summary generation failed: {}", e)
                }
            }
        };

        info!(
            subquestions = results.len(),
            failed,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Orchestrator: hybrid query complete"
        );

        Ok(HybridResponse {
            original_question: question.to_string(),
            subquestion_results: results,
            summary,
        })
    }

    /// Classify and dispatch one sub-question. Never fails.
    async fn process(&self, subquestion: &str) -> SubquestionResult {
        let (classification, label) = match self.classifier.classify_labelled(subquestion).await {
            Ok(labelled) => labelled,
            Err(e) => {
                warn!(subquestion, error = %e, "Classification failed");
                return SubquestionResult::failed(
                    subquestion,
                    FailureStage::Classification,
                    e.to_string(),
                );
            }
        };

        info!(subquestion, classification = ?classification, "Dispatching sub-question");

        match classification {
            Classification::Qualitative => self.retriever.answer_qualitative(subquestion).await,
            Classification::Quantitative => self.resolver.answer_quantitative(subquestion).await,
            Classification::UnsupportedOther => SubquestionResult::Unsupported {
                question: subquestion.to_string(),
                classification,
                label,
            },
        }
    }
}
