//! Extraction of the structured block embedded in a classifier reply.
//!
//! Replies are expected to carry exactly one JSON object, possibly wrapped in a
//! markdown code fence and surrounded by commentary. Only the first block is used.

use super::AnalysisError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Returns the text of the first top-level JSON object in `raw`.
///
/// A fenced code block takes precedence over a bare object. Trailing prose after the
/// object is ignored.
pub fn extract_structured_block(raw: &str) -> Result<&str, AnalysisError> {
    if let Some(fenced) = fenced_block(raw) {
        return first_object(fenced);
    }
    first_object(raw)
}

/// Extracts the first structured block and deserializes it into `T`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, AnalysisError> {
    let block = extract_structured_block(raw)?;
    serde_json::from_str(block).map_err(|err| AnalysisError::Shape(err.to_string()))
}

/// Content of the first ``` fence whose body starts with an object.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_ticks = &raw[open + 3..];
    // Skip an optional language tag on the opening line
    let body_start = after_ticks.find('\n').map(|i| i + 1)?;
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    let content = body[..close].trim();
    content.starts_with('{').then_some(content)
}

fn first_object(text: &str) -> Result<&str, AnalysisError> {
    let start = text.find('{').ok_or(AnalysisError::NoStructuredBlock)?;
    let slice = &text[start..];

    let mut stream = serde_json::Deserializer::from_str(slice).into_iter::<Value>();
    match stream.next() {
        Some(Ok(_)) => Ok(&slice[..stream.byte_offset()]),
        Some(Err(err)) => Err(AnalysisError::Shape(format!(
            "first structured block is not valid JSON: {err}"
        ))),
        None => Err(AnalysisError::NoStructuredBlock),
    }
}
