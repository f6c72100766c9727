//! Tolerant parsing of model output
//!
//! Completions are asked for strict JSON but routinely come back wrapped in
//! prose or Markdown fences. Every parser here follows the same path:
//! strict parse → first delimited substring → typed failure.

use serde::de::DeserializeOwned;
use std::fmt;

/// Why a completion could not be read as the expected JSON shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Neither the whole text nor any delimited substring looked like JSON.
    NotFound,
    /// A delimited candidate was found but did not parse into the target type.
    Malformed(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::NotFound => write!(f, "no JSON value found in model output"),
            ParseFailure::Malformed(reason) => write!(f, "fallback JSON parsing failed: {}", reason),
        }
    }
}

/// Parse a JSON array (e.g. `["q1", "q2"]`) out of a completion.
pub fn parse_array<T: DeserializeOwned>(raw: &str) -> Result<T, ParseFailure> {
    parse_delimited(raw, '[', ']')
}

/// Parse a JSON object (e.g. `{"ticker": "TSLA"}`) out of a completion.
pub fn parse_object<T: DeserializeOwned>(raw: &str) -> Result<T, ParseFailure> {
    parse_delimited(raw, '{', '}')
}

fn parse_delimited<T: DeserializeOwned>(raw: &str, open: char, close: char) -> Result<T, ParseFailure> {
    let cleaned = strip_code_fences(raw);

    if let Ok(parsed) = serde_json::from_str::<T>(cleaned) {
        return Ok(parsed);
    }

    let candidate = first_delimited(cleaned, open, close).ok_or(ParseFailure::NotFound)?;

    serde_json::from_str::<T>(candidate).map_err(|e| ParseFailure::Malformed(e.to_string()))
}

fn strip_code_fences(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// First balanced `open ... close` span, skipping delimiters inside JSON strings.
fn first_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}
