//! Parameter and entity extraction
//!
//! Two single-completion extractors:
//! - `ParameterExtractor` pulls metric/company/ticker/year for the quantitative
//!   path. Unreadable output is a `ParameterExtractionError`.
//! - `EntityExtractor` pulls company/year for narrowing vector search. It is an
//!   optimization only, so it never fails; see `EntityExtraction::extracted`.

use crate::completion::{CompletionClient, CompletionOptions};
use crate::error::OrchestrationError;
use crate::models::{EntityExtraction, ExtractedParameters};
use crate::parsing::parse_object;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Seeded into the prompt as a hint; the model may still answer otherwise.
const TICKER_HINTS: &[(&str, &str)] = &[
    ("Tesla", "TSLA"),
    ("Apple", "AAPL"),
    ("Microsoft", "MSFT"),
    ("Amazon", "AMZN"),
    ("Google", "GOOGL"),
];

const ENTITY_MAX_TOKENS: u32 = 30;

pub struct ParameterExtractor {
    completion: Arc<dyn CompletionClient>,
}

impl ParameterExtractor {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    pub async fn extract(&self, subquestion: &str) -> Result<ExtractedParameters> {
        let completion = self
            .completion
            .complete(&build_parameter_prompt(subquestion), &CompletionOptions::default())
            .await?;

        debug!(raw = %completion.text, "Parameter extraction output");

        parse_parameters(completion.text.trim())
    }
}

fn build_parameter_prompt(subquestion: &str) -> String {
    let hints = TICKER_HINTS
        .iter()
        .map(|(company, ticker)| format!("- {} → {}", company, ticker))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Extract the following structured parameters from the user query:
- 'metric': The financial metric requested (e.g., revenue, gross_profit, liabilities, cashflow, net_income).
- 'company': Full company name.
- 'ticker': Stock ticker symbol (e.g., TSLA for Tesla, AAPL for Apple).
- 'year': Year requested.

For common companies, please include their ticker symbol even if not explicitly mentioned:
{}

Return as valid JSON:
{{"metric": "...", "company": "...", "ticker": "...", "year": 2022}}
Query: "{}""#,
        hints, subquestion
    )
}

/// Strict parse, then first `{...}` substring, else `ParameterExtractionError`.
pub fn parse_parameters(raw: &str) -> Result<ExtractedParameters> {
    parse_object(raw).map_err(|failure| OrchestrationError::ParameterExtractionError {
        message: failure.to_string(),
        raw: raw.to_string(),
    })
}

pub struct EntityExtractor {
    completion: Arc<dyn CompletionClient>,
}

impl EntityExtractor {
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Best-effort company/year. Any failure yields an empty, unsuccessful
    /// extraction.
    pub async fn extract(&self, subquestion: &str) -> EntityExtraction {
        let options = CompletionOptions::strict_json(ENTITY_MAX_TOKENS);

        let extraction = match self
            .completion
            .complete(&build_entity_prompt(subquestion), &options)
            .await
        {
            Ok(completion) => {
                debug!(raw = %completion.text, "Entity extraction output");
                parse_entities(&completion.text)
            }
            Err(e) => {
                warn!("Failed to extract company and year: {}", e);
                EntityExtraction::failed()
            }
        };

        info!(
            company = ?extraction.company,
            year = ?extraction.year,
            extracted = extraction.extracted,
            "Extracted company and year"
        );

        extraction
    }
}

fn build_entity_prompt(subquestion: &str) -> String {
    format!(
        "Extract the company and year from the following query.\n\
         Return ONLY valid JSON like: {{\"company\": \"...\", \"year\": 2023}}\n\n\
         Query: \"{}\"",
        subquestion
    )
}

/// Interpret `{"company": .., "year": ..}`. The year is coerced to `f64`
/// because the index stores it as a float; a year that cannot be read as a
/// number discards the whole extraction.
pub fn parse_entities(raw: &str) -> EntityExtraction {
    let Ok(Value::Object(fields)) = parse_object::<Value>(raw) else {
        warn!(raw, "Entity extraction output is not a JSON object");
        return EntityExtraction::failed();
    };

    let company = fields
        .get("company")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let year = match fields.get("year") {
        None | Some(Value::Null) => None,
        Some(value) => match year_as_float(value) {
            Some(year) => Some(year),
            None => {
                warn!(raw, "Entity extraction returned a non-numeric year");
                return EntityExtraction::failed();
            }
        },
    };

    EntityExtraction {
        company,
        year,
        extracted: true,
    }
}

fn year_as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
