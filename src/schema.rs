//! Input and output contracts of the AI flows.
//!
//! Validators work on plain request structs and raw JSON so they stay
//! independent of whichever model client produced the output.

use base64::Engine;
use serde_json::Value;
use tracing::warn;

use crate::error::FlowError;
use crate::models::{
    ClassificationRequest, ClassificationResult, Recyclability, ReuseSuggestion,
    ReuseSuggestionRequest, ReuseSuggestionResult,
};

pub const MAX_QUERY_WORDS: usize = 5;

/// A data URI split into its MIME type and base64 payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

/// Parses `data:<mime>;base64,<payload>`, checking the payload decodes.
pub fn parse_data_uri(uri: &str) -> Result<DataUri<'_>, FlowError> {
    let invalid = |why: &str| FlowError::InvalidInput(format!("photoDataUri {why}"));

    if uri.trim().is_empty() {
        return Err(invalid("is required"));
    }
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| invalid("must start with 'data:'"))?;
    let (mime_type, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| invalid("must use the form data:<mimetype>;base64,<data>"))?;

    let mime_ok = !mime_type.is_empty()
        && mime_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '+' | '.' | '-'));
    if !mime_ok {
        return Err(invalid("has an invalid MIME type"));
    }
    if payload.is_empty() {
        return Err(invalid("has an empty payload"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| invalid(&format!("payload is not valid base64: {e}")))?;

    Ok(DataUri { mime_type, payload })
}

pub fn validate_classification_input(input: &ClassificationRequest) -> Result<DataUri<'_>, FlowError> {
    parse_data_uri(&input.photo_data_uri)
}

pub fn validate_reuse_suggestion_input(input: &ReuseSuggestionRequest) -> Result<&str, FlowError> {
    let item = input.waste_item.trim();
    if item.is_empty() {
        return Err(FlowError::InvalidInput("wasteItem must not be empty".into()));
    }
    Ok(item)
}

pub fn validate_image_prompt(prompt: &str) -> Result<&str, FlowError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(FlowError::InvalidInput("prompt must not be empty".into()));
    }
    Ok(prompt)
}

pub fn validate_classification_output(output: &Value) -> Result<ClassificationResult, FlowError> {
    let obj = output
        .as_object()
        .ok_or_else(|| violation("$", "expected an object"))?;

    let recyclability = match obj.get("recyclability") {
        Some(Value::String(s)) => Recyclability::parse(s).ok_or_else(|| {
            violation("recyclability", &format!("'{s}' is not one of recyclable, non-recyclable, unsure"))
        })?,
        _ => return Err(violation("recyclability", "missing or not a string")),
    };

    Ok(ClassificationResult {
        recyclability,
        reuse_suggestions: suggestion_list(obj.get("reuseSuggestions"), "reuseSuggestions")?,
        recycle_channels: string_list(obj.get("recycleChannels"), "recycleChannels")?,
        donate_suggestions: string_list(obj.get("donateSuggestions"), "donateSuggestions")?,
    })
}

pub fn validate_reuse_suggestion_output(output: &Value) -> Result<ReuseSuggestionResult, FlowError> {
    let obj = output
        .as_object()
        .ok_or_else(|| violation("$", "expected an object"))?;
    let suggestions = match obj.get("suggestions") {
        Some(v) => suggestion_list(Some(v), "suggestions")?,
        None => return Err(violation("suggestions", "missing")),
    };
    Ok(ReuseSuggestionResult { suggestions })
}

fn violation(path: &str, what: &str) -> FlowError {
    FlowError::SchemaViolation(format!("{path}: {what}"))
}

// Absent lists are treated as empty; present ones must be arrays of strings.
fn string_list(value: Option<&Value>, path: &str) -> Result<Vec<String>, FlowError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| violation(&format!("{path}[{i}]"), "expected a string"))
            })
            .collect(),
        Some(_) => Err(violation(path, "expected an array")),
    }
}

fn suggestion_list(value: Option<&Value>, path: &str) -> Result<Vec<ReuseSuggestion>, FlowError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(violation(path, "expected an array")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let at = format!("{path}[{i}]");
            let suggestion = item
                .get("suggestion")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| violation(&at, "missing suggestion"))?;
            let query = item
                .get("videoSearchQuery")
                .and_then(Value::as_str)
                .ok_or_else(|| violation(&at, "missing videoSearchQuery"))?;
            Ok(ReuseSuggestion {
                suggestion: suggestion.to_string(),
                video_search_query: clamp_query(query),
            })
        })
        .collect()
}

/// Keeps at most [`MAX_QUERY_WORDS`] words of a video search query.
pub fn clamp_query(query: &str) -> String {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.len() > MAX_QUERY_WORDS {
        warn!("✂️ Video search query '{}' exceeds {} words, truncating", query, MAX_QUERY_WORDS);
    }
    words.into_iter().take(MAX_QUERY_WORDS).collect::<Vec<_>>().join(" ")
}
