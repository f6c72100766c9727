//! Structured Metric Resolver (quantitative path)
//!
//! extract parameters → provider lookup → model-assisted value extraction.
//! Like the qualitative path, every failure is returned as a `Failed` result
//! tagged with the step that produced it.

use crate::completion::{CompletionClient, CompletionOptions};
use crate::context::ServiceContext;
use crate::extraction::ParameterExtractor;
use crate::models::{FailureStage, FilingRecord, SubquestionResult};
use crate::provider::FinancialDataProvider;
use std::sync::Arc;
use tracing::{info, warn};

pub const MISSING_PARAMETERS: &str = "Missing ticker or year";
pub const FILING_NOT_FOUND: &str = "Financial data not found";

/// A failed step and what went wrong in it.
#[derive(Debug)]
struct StageFailure {
    stage: FailureStage,
    message: String,
}

trait AtStage<T> {
    fn at(self, stage: FailureStage) -> std::result::Result<T, StageFailure>;
}

impl<T> AtStage<T> for crate::Result<T> {
    fn at(self, stage: FailureStage) -> std::result::Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            message: e.to_string(),
        })
    }
}

pub struct MetricResolver {
    extractor: ParameterExtractor,
    completion: Arc<dyn CompletionClient>,
    provider: Arc<dyn FinancialDataProvider>,
}

impl MetricResolver {
    pub fn new(context: &ServiceContext) -> Self {
        Self {
            extractor: ParameterExtractor::new(context.completion.clone()),
            completion: context.completion.clone(),
            provider: context.provider.clone(),
        }
    }

    pub async fn answer_quantitative(&self, subquestion: &str) -> SubquestionResult {
        match self.try_answer(subquestion).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(
                    subquestion,
                    stage = %failure.stage,
                    error = %failure.message,
                    "Quantitative path failed"
                );
                SubquestionResult::failed(subquestion, failure.stage, failure.message)
            }
        }
    }

    async fn try_answer(&self, subquestion: &str) -> std::result::Result<SubquestionResult, StageFailure> {
        let params = self
            .extractor
            .extract(subquestion)
            .await
            .at(FailureStage::Extraction)?;

        let (Some(ticker), Some(year)) = (params.ticker.clone(), params.year) else {
            return Err(StageFailure {
                stage: FailureStage::Extraction,
                message: MISSING_PARAMETERS.to_string(),
            });
        };

        info!(ticker = %ticker, year, metric = ?params.metric, "Resolving metric");

        let filing = self
            .provider
            .get_annual_filing(&ticker, year)
            .await
            .at(FailureStage::ProviderLookup)?
            .ok_or_else(|| StageFailure {
                stage: FailureStage::ProviderLookup,
                message: FILING_NOT_FOUND.to_string(),
            })?;

        let prompt = build_value_prompt(subquestion, params.metric.as_deref(), &filing)
            .at(FailureStage::Extraction)?;

        let value = self
            .completion
            .complete(&prompt, &CompletionOptions::default())
            .await
            .at(FailureStage::Extraction)?
            .text
            .trim()
            .to_string();

        Ok(SubquestionResult::Quantitative {
            question: subquestion.to_string(),
            company: params.company,
            ticker,
            year,
            metric: params.metric,
            value,
        })
    }
}

fn build_value_prompt(
    subquestion: &str,
    metric: Option<&str>,
    filing: &FilingRecord,
) -> crate::Result<String> {
    let filing_json = serde_json::to_string_pretty(filing)?;
    let metric = metric.unwrap_or("the metric asked about in the question");

    Ok(format!(
        r#"Given this JSON financial filing. Statement categories (e.g. income_statement, balance_sheet) map metric names to {{"value": number}}:
{}

Question: "{}"
Return only the numeric value of the '{}' field. Do not include any explanation, label, or formatting, just the number.
If the metric is not available, return "Metric not found"."#,
        filing_json, subquestion, metric
    ))
}
