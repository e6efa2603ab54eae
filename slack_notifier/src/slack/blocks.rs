//! Block Kit helpers.
//!
//! Blocks stay plain `serde_json::Value`s; these only spare callers from
//! hand-writing the most common shapes.

use serde_json::{Value, json};

/// Header blocks only accept plain text up to this many characters.
const MAX_HEADER_LEN: usize = 150;
/// Section text is capped by Slack at this many characters.
const MAX_SECTION_LEN: usize = 3000;

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[must_use]
pub fn header(text: &str) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": truncate(text, MAX_HEADER_LEN), "emoji": true }
    })
}

#[must_use]
pub fn section(markdown: &str) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": truncate(markdown, MAX_SECTION_LEN) }
    })
}

/// Section rendered as a two-column grid of `*title*\nvalue` cells.
#[must_use]
pub fn fields_section(fields: &[(&str, &str)]) -> Value {
    let fields: Vec<Value> = fields
        .iter()
        .take(10)
        .map(|(title, value)| json!({ "type": "mrkdwn", "text": format!("*{title}*\n{value}") }))
        .collect();
    json!({ "type": "section", "fields": fields })
}

#[must_use]
pub fn divider() -> Value {
    json!({ "type": "divider" })
}

#[must_use]
pub fn context(elements: &[&str]) -> Value {
    let elements: Vec<Value> = elements
        .iter()
        .map(|text| json!({ "type": "mrkdwn", "text": text }))
        .collect();
    json!({ "type": "context", "elements": elements })
}
