//! Extraction response handling.
//!
//! The model answers in free text that should contain one JSON object,
//! usually inside a fenced `json` block. This module locates that object and
//! normalizes it into typed entities and relationships. String values are
//! passed through as given and missing fields are defaulted; only items that
//! are not JSON objects are dropped, with a warning. A response with no
//! usable JSON object at all is an error.

use regex::Regex;
use serde_json::Value;
use sessiongraph_core::models::{Entity, Relationship};
use thiserror::Error;

/// Characters of session context attached to each entity.
pub const ENTITY_CONTEXT_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("no JSON object found in response")]
    NoJson,

    #[error("invalid JSON in response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response JSON is not an object")]
    NotAnObject,
}

/// Normalized extraction payload for one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedExtraction {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub concepts: Vec<String>,
}

/// Locate the JSON payload in a model response.
///
/// A fenced ```` ```json ```` block wins. Otherwise the first complete JSON
/// value starting at the first `{` is used, falling back to the widest
/// `{ ... }` span.
pub fn extract_payload(text: &str) -> Result<Value, ResponseError> {
    if let Ok(fence) = Regex::new(r"(?s)```json\s*(.*?)\s*```") {
        if let Some(block) = fence.captures(text).and_then(|c| c.get(1)) {
            return into_object(serde_json::from_str(block.as_str())?);
        }
    }

    let start = text.find('{').ok_or(ResponseError::NoJson)?;

    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    if let Some(Ok(value)) = stream.next() {
        return into_object(value);
    }

    let end = text.rfind('}').filter(|&end| end > start).ok_or(ResponseError::NoJson)?;
    into_object(serde_json::from_str(&text[start..=end])?)
}

fn into_object(value: Value) -> Result<Value, ResponseError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ResponseError::NotAnObject)
    }
}

/// Turn a located payload into typed records.
///
/// Entity ids are `{session_id}_{message_uuid}_{i}`, or `{session_id}_{i}`
/// for messages without a uuid, where `i` is the item's position in the
/// response's `entities` array.
pub fn normalize(payload: &Value, session_id: &str, message_uuid: &str, context: &str) -> ParsedExtraction {
    let entity_context: String = context.chars().take(ENTITY_CONTEXT_CHARS).collect();
    let entity_context = (!entity_context.is_empty()).then_some(entity_context);

    let entities = items(payload, "entities")
        .enumerate()
        .filter_map(|(i, item)| {
            let id = if message_uuid.is_empty() {
                format!("{session_id}_{i}")
            } else {
                format!("{session_id}_{message_uuid}_{i}")
            };
            let entity = normalize_entity(item, id, entity_context.clone());
            if entity.is_none() {
                tracing::warn!(session_id, message_uuid, index = i, "Dropping non-object entity");
            }
            entity
        })
        .collect();

    let relationships = items(payload, "relationships")
        .enumerate()
        .filter_map(|(i, item)| {
            let relationship = normalize_relationship(item);
            if relationship.is_none() {
                tracing::warn!(session_id, message_uuid, index = i, "Dropping non-object relationship");
            }
            relationship
        })
        .collect();

    let concepts = items(payload, "concepts")
        .filter_map(Value::as_str)
        .map(String::from)
        .collect();

    ParsedExtraction {
        entities,
        relationships,
        concepts,
    }
}

fn items<'a>(payload: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|a| a.as_slice())
        .unwrap_or_default()
        .iter()
}

/// First of `keys` holding a string, verbatim.
fn first_str(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .map(String::from)
}

/// Confidence as a finite number in `[0, 1]`; anything unreadable is 0.
fn confidence(item: &Value) -> f64 {
    let raw = match item.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

fn normalize_entity(item: &Value, id: String, context: Option<String>) -> Option<Entity> {
    if !item.is_object() {
        return None;
    }

    Some(Entity {
        id,
        name: first_str(item, &["name"]).unwrap_or_default(),
        kind: first_str(item, &["type", "entity_type"]).unwrap_or_default(),
        confidence: confidence(item),
        content: first_str(item, &["context", "description"]),
        context,
        file_path: first_str(item, &["file_path"]),
        line_number: item
            .get("line_number")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        language: first_str(item, &["language"]),
    })
}

fn normalize_relationship(item: &Value) -> Option<Relationship> {
    if !item.is_object() {
        return None;
    }

    // Endpoints are names; a dangling or empty reference is kept as is.
    Some(Relationship {
        source: first_str(item, &["from", "source", "from_entity"]).unwrap_or_default(),
        target: first_str(item, &["to", "target", "to_entity"]).unwrap_or_default(),
        kind: first_str(item, &["type", "relationship_type"]).unwrap_or_default(),
        confidence: confidence(item),
        evidence: first_str(item, &["evidence", "context"]).unwrap_or_default(),
    })
}
