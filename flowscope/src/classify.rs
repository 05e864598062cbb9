//! Payload classification: one named update value from a trace step into one
//! of three renderable shapes.
//!
//! Classification is pure and total. Precedence is fixed: the
//! message-sequence check runs first (an array is also "not a string", so a
//! string check must not preempt it), then plain text, then structured data.

use serde_json::Value;

use flowscope_types::{Payload, TraceMessage};

/// `content`, with fallback to the alternate `kwargs.content` message
/// encoding, with fallback to empty. Never fails on missing fields.
fn message_content(item: &Value) -> Option<&Value> {
    item.get("content")
        .or_else(|| item.get("kwargs").and_then(|kwargs| kwargs.get("content")))
}

fn content_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn as_message_sequence(value: &Value) -> Option<Vec<TraceMessage>> {
    let items = value.as_array()?;
    let first = items.first()?;
    message_content(first)?;

    Some(
        items
            .iter()
            .map(|item| TraceMessage {
                content: message_content(item).map(content_text).unwrap_or_default(),
            })
            .collect(),
    )
}

/// Classify one update value. Every JSON value maps to exactly one variant.
pub fn classify(value: &Value) -> Payload {
    if let Some(messages) = as_message_sequence(value) {
        return Payload::Messages(messages);
    }
    if let Value::String(text) = value {
        return Payload::Text(text.clone());
    }
    Payload::Data(value.clone())
}

/// Pretty-print a structured payload for display.
pub fn pretty_json(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        _ => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    }
}
