//! `{placeholder}` rendering for action templates, messages and prompts.
//!
//! Resolution order for `{name}`:
//!
//! 1. `date`, `time`, `datetime`, `trigger_name`
//! 2. a top-level context key, with `a.b` walking nested objects
//! 3. a key of the context's `data` object (webhook payloads)
//!
//! Placeholders that resolve to nothing are left verbatim, so literal braces
//! in templates survive.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

/// Render `template` against `context` using the current local time.
pub fn render(template: &str, context: &Map<String, Value>) -> String {
    render_at(template, context, Local::now())
}

/// Render `template` with an explicit clock.
pub fn render_at(template: &str, context: &Map<String, Value>, now: DateTime<Local>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder(&after[..close]) => {
                let name = &after[..close];
                match resolve(name, context, now) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_placeholder(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn resolve(name: &str, context: &Map<String, Value>, now: DateTime<Local>) -> Option<String> {
    match name {
        "date" => return Some(now.format("%d/%m/%Y").to_string()),
        "time" => return Some(now.format("%H:%M").to_string()),
        "datetime" => return Some(now.format("%d/%m/%Y %H:%M").to_string()),
        "trigger_name" => {
            return Some(
                context
                    .get("trigger")
                    .and_then(|t| t.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            );
        }
        _ => {}
    }

    lookup(context, name)
        .or_else(|| {
            context
                .get("data")
                .and_then(Value::as_object)
                .and_then(|data| lookup(data, name))
        })
        .map(display)
}

fn lookup<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = map.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// Text form of a context value: strings verbatim, containers as pretty JSON.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}
