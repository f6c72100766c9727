//! Core data models for the hybrid query pipeline

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// The original user input. Consumed once by the decomposer.
pub type Question = String;

/// One independently answerable question produced by the decomposer.
pub type SubQuestion = String;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Classification {
    #[serde(rename = "qualitative")]
    Qualitative,
    #[serde(rename = "quantitative")]
    Quantitative,
    #[serde(rename = "unsupported-other")]
    UnsupportedOther,
}

/// Pipeline step a sub-question failed in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    Classification,
    Retrieval,
    Extraction,
    ProviderLookup,
}

//
// ================= Extraction =================
//

/// Structured fields pulled out of a quantitative sub-question.
///
/// Every field is optional: the extractor is best-effort and the model
/// frequently omits or nulls fields it cannot resolve.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedParameters {
    #[serde(default, deserialize_with = "lenient_string")]
    pub metric: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_ticker")]
    pub ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
}

/// Company/year pulled out of a qualitative sub-question.
///
/// `extracted` is false when the model output could not be interpreted; both
/// fields are then `None` and the search runs unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityExtraction {
    pub company: Option<String>,
    pub year: Option<f64>,
    pub extracted: bool,
}

impl EntityExtraction {
    pub fn failed() -> Self {
        Self::default()
    }

    /// Equality filter over indexed metadata. Only built when BOTH fields are
    /// known; a one-sided filter would drop valid matches.
    pub fn filter(&self) -> Option<MetadataFilter> {
        match (&self.company, self.year) {
            (Some(company), Some(year)) => Some(MetadataFilter {
                company: company.clone(),
                year,
            }),
            _ => None,
        }
    }
}

/// Equality predicate `company == .. AND year == ..` applied to vector search.
///
/// The index stores years as floats (2021.0), so `year` is always an `f64`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataFilter {
    pub company: String,
    pub year: f64,
}

//
// ================= Retrieval =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub text: String,
    pub metadata: Value,
}

/// One vector-store hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredMatch {
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
}

impl ScoredMatch {
    pub fn into_passage(self) -> Passage {
        let text = self
            .metadata
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Passage {
            text,
            metadata: self.metadata,
        }
    }
}

/// Structured annual filing as returned by the financial-data provider.
/// Treated as an untyped tree.
pub type FilingRecord = Value;

//
// ================= Results =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubquestionResult {
    Qualitative {
        question: SubQuestion,
        filter_used: Option<MetadataFilter>,
        retrieved_passages: Vec<Passage>,
        narrative_answer: String,
    },
    Quantitative {
        question: SubQuestion,
        company: Option<String>,
        ticker: String,
        year: i32,
        metric: Option<String>,
        value: String,
    },
    Unsupported {
        question: SubQuestion,
        classification: Classification,
        label: String,
    },
    Failed {
        question: SubQuestion,
        stage: FailureStage,
        #[serde(rename = "error")]
        error_message: String,
    },
}

impl SubquestionResult {
    pub fn failed(question: &str, stage: FailureStage, error_message: impl Into<String>) -> Self {
        SubquestionResult::Failed {
            question: question.to_string(),
            stage,
            error_message: error_message.into(),
        }
    }

    pub fn question(&self) -> &str {
        match self {
            SubquestionResult::Qualitative { question, .. }
            | SubquestionResult::Quantitative { question, .. }
            | SubquestionResult::Unsupported { question, .. }
            | SubquestionResult::Failed { question, .. } => question,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SubquestionResult::Failed { .. })
    }
}

/// Sole externally visible output of one hybrid request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HybridResponse {
    #[serde(rename = "original_query")]
    pub original_question: Question,
    #[serde(rename = "subquestions")]
    pub subquestion_results: Vec<SubquestionResult>,
    pub summary: String,
}

//
// ================= Lenient field parsing =================
//

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_ticker<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.map(|t| t.to_uppercase()))
}

fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(year_from_value))
}

/// Whole-number year from a JSON number or numeric string.
pub fn year_from_value(value: &Value) -> Option<i32> {
    let as_float = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if as_float.fract() == 0.0 && as_float > 0.0 && as_float < i32::MAX as f64 {
        Some(as_float as i32)
    } else {
        None
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Qualitative => "qualitative",
            Classification::Quantitative => "quantitative",
            Classification::UnsupportedOther => "unsupported-other",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Classification => "classification",
            FailureStage::Retrieval => "retrieval",
            FailureStage::Extraction => "extraction",
            FailureStage::ProviderLookup => "provider-lookup",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracted_parameters_lenient_fields() {
        let params: ExtractedParameters = serde_json::from_value(json!({
            "metric": "net_income",
            "company": "Tesla",
            "ticker": "tsla",
            "year": "2022"
        }))
        .unwrap();

        assert_eq!(params.ticker.as_deref(), Some("TSLA"));
        assert_eq!(params.year, Some(2022));

        let blank: ExtractedParameters = serde_json::from_value(json!({
            "metric": "revenue",
            "company": "",
            "ticker": null,
            "year": "last year"
        }))
        .unwrap();

        assert_eq!(blank.company, None);
        assert_eq!(blank.ticker, None);
        assert_eq!(blank.year, None);

        let missing: ExtractedParameters = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing, ExtractedParameters::default());
    }

    #[test]
    fn test_filter_requires_both_fields() {
        let both = EntityExtraction {
            company: Some("Apple".into()),
            year: Some(2024.0),
            extracted: true,
        };
        assert_eq!(
            both.filter(),
            Some(MetadataFilter {
                company: "Apple".into(),
                year: 2024.0
            })
        );

        let company_only = EntityExtraction {
            company: Some("Apple".into()),
            year: None,
            extracted: true,
        };
        assert_eq!(company_only.filter(), None);

        let year_only = EntityExtraction {
            company: None,
            year: Some(2024.0),
            extracted: true,
        };
        assert_eq!(year_only.filter(), None);
        assert_eq!(EntityExtraction::failed().filter(), None);
    }

    #[test]
    fn test_result_wire_format() {
        let failed = SubquestionResult::failed(
            "What was Tesla's revenue?",
            FailureStage::Extraction,
            "Missing ticker or year",
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["stage"], "extraction");
        assert_eq!(json["error"], "Missing ticker or year");

        let unsupported = SubquestionResult::Unsupported {
            question: "Tell me a joke".into(),
            classification: Classification::UnsupportedOther,
            label: "hybrid".into(),
        };
        let json = serde_json::to_value(&unsupported).unwrap();
        assert_eq!(json["type"], "unsupported");
        assert_eq!(json["classification"], "unsupported-other");

        let provider = serde_json::to_value(FailureStage::ProviderLookup).unwrap();
        assert_eq!(provider, "provider-lookup");
    }

    #[test]
    fn test_filter_year_serializes_as_float() {
        let filter = MetadataFilter {
            company: "Apple".into(),
            year: 2021.0,
        };
        let rendered = serde_json::to_string(&filter).unwrap();
        assert!(rendered.contains("2021.0"));
    }

    #[test]
    fn test_hybrid_response_field_names() {
        let response = HybridResponse {
            original_question: "q".into(),
            subquestion_results: vec![],
            summary: "s".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("original_query").is_some());
        assert!(json.get("subquestions").is_some());
        assert_eq!(json["summary"], "s");
    }

    #[test]
    fn test_scored_match_without_text() {
        let passage = ScoredMatch {
            score: 0.9,
            metadata: json!({ "company": "Apple" }),
        }
        .into_passage();
        assert_eq!(passage.text, "");
        assert_eq!(passage.metadata["company"], "Apple");
    }
}
