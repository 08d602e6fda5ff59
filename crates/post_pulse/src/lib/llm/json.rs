use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::Error;

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());
static ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").unwrap());
static OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Parses a JSON payload out of free-form model output.
///
/// Tries, in order: the whole response, the first fenced code block, the widest
/// `[...]` span and the widest `{...}` span.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, Error> {
    let raw = raw.trim();
    if let Ok(value) = serde_json::from_str(raw) {
        return Ok(value);
    }

    let fenced = FENCED_RE
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str());
    let array = ARRAY_RE.find(raw).map(|m| m.as_str());
    let object = OBJECT_RE.find(raw).map(|m| m.as_str());

    [fenced, array, object]
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str(candidate.trim()).ok())
        .ok_or(Error::ParseError(
            "Failed to extract a JSON payload from the model response",
        ))
}
