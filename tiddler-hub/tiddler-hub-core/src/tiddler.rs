//! Splitting tiddlers into metadata and text, and merging them back.
//!
//! Clients exchange a tiddler as one JSON object. On disk the body text is
//! kept apart from the rest of the fields so listings can be served from the
//! metadata alone.

use crate::error::{Result, StoreError};
use crate::storage::TiddlerRecord;
use serde_json::{Map, Value};

/// Name of the single bag every tiddler lives in.
pub const BAG_NAME: &str = "bag";
/// Tag marking tiddlers that define macros.
pub const MACRO_TAG: &str = "$:/tags/Macro";

pub const TEXT_FIELD: &str = "text";
pub const TAGS_FIELD: &str = "tags";
pub const BAG_FIELD: &str = "bag";
pub const REVISION_FIELD: &str = "revision";

/// Parse a request body into a field map.
pub fn parse_fields(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::MalformedInput(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(StoreError::MalformedInput(e.to_string())),
    }
}

/// Turn a client tiddler into the record stored at `revision`.
///
/// `text` is pulled out of the fields (a non-string `text` is dropped), and
/// `bag` and `revision` are stamped over whatever the client sent.
pub fn split(mut fields: Map<String, Value>, revision: u64) -> TiddlerRecord {
    let text = match fields.remove(TEXT_FIELD) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };
    fields.insert(BAG_FIELD.to_string(), Value::from(BAG_NAME));
    fields.insert(REVISION_FIELD.to_string(), Value::from(revision));
    let meta = Value::Object(fields).to_string();
    TiddlerRecord::new(revision, meta, text)
}

/// Parse the metadata envelope of a stored record.
pub fn parse_meta(key: &str, record: &TiddlerRecord) -> Result<Map<String, Value>> {
    let malformed = |reason: String| StoreError::MalformedStoredData {
        key: key.to_string(),
        reason,
    };
    match serde_json::from_str::<Value>(&record.meta) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

/// Rebuild the full client view of a stored record.
pub fn merge(key: &str, record: &TiddlerRecord) -> Result<Map<String, Value>> {
    let mut fields = parse_meta(key, record)?;
    fields.insert(TEXT_FIELD.to_string(), Value::from(record.text.as_str()));
    Ok(fields)
}

/// Whether the tiddler carries the macro tag.
///
/// `tags` is accepted either as a JSON array of strings or as a TiddlyWiki
/// tag list string such as `foo [[$:/tags/Macro]]`.
pub fn is_macro(fields: &Map<String, Value>) -> bool {
    match fields.get(TAGS_FIELD) {
        Some(Value::Array(tags)) => tags.iter().any(|t| t.as_str() == Some(MACRO_TAG)),
        Some(Value::String(tags)) => parse_tag_list(tags).iter().any(|t| t == MACRO_TAG),
        _ => false,
    }
}

/// Split a TiddlyWiki tag string. Tags are separated by whitespace, and a tag
/// containing spaces is wrapped in `[[` `]]`.
pub fn parse_tag_list(s: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix("[[") {
            match inner.find("]]") {
                Some(end) => {
                    tags.push(inner[..end].to_string());
                    rest = &inner[end + 2..];
                }
                None => {
                    tags.push(inner.to_string());
                    rest = "";
                }
            }
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tags.push(rest[..end].to_string());
            rest = &rest[end..];
        }
        rest = rest.trim_start();
    }
    tags
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
