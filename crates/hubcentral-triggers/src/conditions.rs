//! Activation conditions for `event`, `webhook` and `intelligent` triggers.
//!
//! Event triggers may declare `config.conditions`, all of which must hold:
//!
//! - `folder` -- payload `path` starts with this prefix
//! - `tag` -- payload `tags` (array of strings) contains this tag
//! - `content_pattern` -- regex that must match payload `content`
//!
//! Intelligent triggers pick one test through `config.condition_type`:
//! `inactivity`, `pattern` or `threshold`.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Result, TriggerError};

/// Comparison operators accepted by `threshold` conditions.
pub const THRESHOLD_OPERATORS: [&str; 5] = [">=", "<=", "==", ">", "<"];

// ---------------------------------------------------------------------------
// Event conditions
// ---------------------------------------------------------------------------

/// Whether every condition declared in `config.conditions` holds for
/// `payload`.  A trigger without conditions always matches.
pub fn event_conditions_hold(config: &Map<String, Value>, payload: &Value) -> bool {
    let Some(conditions) = config.get("conditions").and_then(Value::as_object) else {
        return true;
    };

    if let Some(folder) = non_empty_str(conditions, "folder") {
        let path = payload.get("path").and_then(Value::as_str).unwrap_or_default();
        if !path.starts_with(folder) {
            return false;
        }
    }

    if let Some(tag) = non_empty_str(conditions, "tag") {
        let tagged = payload
            .get("tags")
            .and_then(Value::as_array)
            .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(tag)));
        if !tagged {
            return false;
        }
    }

    if let Some(pattern) = non_empty_str(conditions, "content_pattern") {
        let content = payload.get("content").and_then(Value::as_str).unwrap_or_default();
        match Regex::new(pattern) {
            Ok(re) if re.is_match(content) => {}
            Ok(_) => return false,
            Err(e) => {
                tracing::warn!(pattern, error = %e, "invalid content_pattern");
                return false;
            }
        }
    }

    true
}

// ---------------------------------------------------------------------------
// Intelligent conditions
// ---------------------------------------------------------------------------

/// Evaluate an intelligent trigger's condition against `context` at `now`.
///
/// Unknown condition types and missing inputs evaluate to `false`.
pub fn intelligent_condition_holds<Tz: TimeZone>(
    config: &Map<String, Value>,
    context: &Value,
    now: &DateTime<Tz>,
) -> bool {
    match config.get("condition_type").and_then(Value::as_str) {
        Some("inactivity") => {
            let threshold = config
                .get("threshold_minutes")
                .and_then(Value::as_f64)
                .unwrap_or(60.0);
            let Some(last) = context
                .get("last_activity")
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
            else {
                return false;
            };
            let inactive_minutes = (now.timestamp_millis() - last.timestamp_millis()) as f64 / 60_000.0;
            inactive_minutes >= threshold
        }
        Some("pattern") => {
            let pattern = config.get("pattern").and_then(Value::as_str).unwrap_or_default();
            let data = match context.get("data") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            match Regex::new(pattern) {
                Ok(re) => re.is_match(&data),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "invalid intelligent pattern");
                    false
                }
            }
        }
        Some("threshold") => {
            let field = config.get("field").and_then(Value::as_str).unwrap_or_default();
            let threshold = config.get("threshold").and_then(Value::as_f64).unwrap_or(0.0);
            let operator = config.get("operator").and_then(Value::as_str).unwrap_or(">=");
            let value = match context.get(field) {
                None | Some(Value::Null) => 0.0,
                Some(v) => match v.as_f64() {
                    Some(n) => n,
                    None => return false,
                },
            };
            compare(value, operator, threshold)
        }
        _ => false,
    }
}

fn compare(value: f64, operator: &str, threshold: f64) -> bool {
    match operator {
        ">=" => value >= threshold,
        "<=" => value <= threshold,
        "==" => value == threshold,
        ">" => value > threshold,
        "<" => value < threshold,
        _ => false,
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO timestamp taken as local time.
fn parse_timestamp(text: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject malformed `event` trigger configs.
pub fn validate_event_config(config: &Map<String, Value>) -> Result<()> {
    if non_empty_str(config, "event_type").is_none() {
        return Err(TriggerError::Configuration(
            "event triggers need a non-empty `event_type`".into(),
        ));
    }
    match config.get("conditions") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Object(conditions)) => {
            if let Some(pattern) = conditions.get("content_pattern").and_then(Value::as_str) {
                compile(pattern, "content_pattern")?;
            }
            Ok(())
        }
        Some(_) => Err(TriggerError::Configuration("`conditions` must be an object".into())),
    }
}

/// Reject malformed `webhook` trigger configs.
pub fn validate_webhook_config(config: &Map<String, Value>) -> Result<()> {
    match non_empty_str(config, "source") {
        Some(_) => Ok(()),
        None => Err(TriggerError::Configuration(
            "webhook triggers need a `source` (or `*`)".into(),
        )),
    }
}

/// Reject malformed `intelligent` trigger configs.
pub fn validate_intelligent_config(config: &Map<String, Value>) -> Result<()> {
    match config.get("condition_type").and_then(Value::as_str) {
        Some("inactivity") => Ok(()),
        Some("pattern") => {
            let pattern = config.get("pattern").and_then(Value::as_str).unwrap_or_default();
            compile(pattern, "pattern").map(|_| ())
        }
        Some("threshold") => {
            if non_empty_str(config, "field").is_none() {
                return Err(TriggerError::Configuration(
                    "threshold conditions need a `field`".into(),
                ));
            }
            let operator = config.get("operator").and_then(Value::as_str).unwrap_or(">=");
            if !THRESHOLD_OPERATORS.contains(&operator) {
                return Err(TriggerError::Configuration(format!(
                    "unknown threshold operator `{operator}`"
                )));
            }
            Ok(())
        }
        Some(other) => Err(TriggerError::Configuration(format!(
            "unknown condition_type `{other}`"
        ))),
        None => Err(TriggerError::Configuration(
            "intelligent triggers need a `condition_type`".into(),
        )),
    }
}

fn compile(pattern: &str, field: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| TriggerError::Configuration(format!("invalid regex in `{field}`: {e}")))
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn folder_condition_is_a_prefix_match() {
        let config = obj(json!({ "event_type": "note_created", "conditions": { "folder": "Projects" } }));
        assert!(event_conditions_hold(&config, &json!({ "path": "Projects/x.md" })));
        assert!(!event_conditions_hold(&config, &json!({ "path": "Other/x.md" })));
        assert!(!event_conditions_hold(&config, &json!({})));
    }

    #[test]
    fn conditions_are_anded() {
        let config = obj(json!({
            "conditions": { "folder": "Work", "tag": "#urgente", "content_pattern": "prazo\\s+\\d+" }
        }));
        let ok = json!({ "path": "Work/a.md", "tags": ["#urgente"], "content": "prazo 3 dias" });
        assert!(event_conditions_hold(&config, &ok));

        let untagged = json!({ "path": "Work/a.md", "tags": [], "content": "prazo 3 dias" });
        assert!(!event_conditions_hold(&config, &untagged));

        let no_match = json!({ "path": "Work/a.md", "tags": ["#urgente"], "content": "sem prazo" });
        assert!(!event_conditions_hold(&config, &no_match));
    }

    #[test]
    fn missing_conditions_always_match() {
        assert!(event_conditions_hold(&obj(json!({ "event_type": "x" })), &json!(null)));
    }

    #[test]
    fn inactivity_threshold() {
        let config = obj(json!({ "condition_type": "inactivity", "threshold_minutes": 60 }));
        let now = Utc::now();
        let idle = json!({ "last_activity": (now - chrono::Duration::minutes(90)).to_rfc3339() });
        let busy = json!({ "last_activity": (now - chrono::Duration::minutes(10)).to_rfc3339() });
        assert!(intelligent_condition_holds(&config, &idle, &now));
        assert!(!intelligent_condition_holds(&config, &busy, &now));
        assert!(!intelligent_condition_holds(&config, &json!({}), &now));
    }

    #[test]
    fn naive_timestamps_are_local() {
        let config = obj(json!({ "condition_type": "inactivity", "threshold_minutes": 30 }));
        let now = Local::now();
        let earlier = (now - chrono::Duration::hours(2)).naive_local();
        let context = json!({ "last_activity": earlier.format("%Y-%m-%dT%H:%M:%S").to_string() });
        assert!(intelligent_condition_holds(&config, &context, &now));
    }

    #[test]
    fn pattern_matches_stringified_data() {
        let config = obj(json!({ "condition_type": "pattern", "pattern": "erro\\d+" }));
        let now = Utc::now();
        assert!(intelligent_condition_holds(&config, &json!({ "data": { "log": "erro42" } }), &now));
        assert!(!intelligent_condition_holds(&config, &json!({ "data": "ok" }), &now));
    }

    #[test]
    fn threshold_operators() {
        let now = Utc::now();
        let context = json!({ "pending": 7 });
        for (op, expected) in [(">=", true), ("<=", false), ("==", false), (">", true), ("<", false)] {
            let config = obj(json!({
                "condition_type": "threshold",
                "field": "pending",
                "threshold": 5,
                "operator": op
            }));
            assert_eq!(intelligent_condition_holds(&config, &context, &now), expected, "{op}");
        }
    }

    #[test]
    fn validation_rejects_bad_configs() {
        assert!(validate_event_config(&obj(json!({}))).is_err());
        assert!(validate_event_config(&obj(json!({
            "event_type": "x",
            "conditions": { "content_pattern": "(" }
        })))
        .is_err());
        assert!(validate_event_config(&obj(json!({ "event_type": "x" }))).is_ok());

        assert!(validate_webhook_config(&obj(json!({}))).is_err());
        assert!(validate_webhook_config(&obj(json!({ "source": "*" }))).is_ok());

        assert!(validate_intelligent_config(&obj(json!({ "condition_type": "vibes" }))).is_err());
        assert!(validate_intelligent_config(&obj(json!({
            "condition_type": "threshold",
            "field": "x",
            "operator": "!="
        })))
        .is_err());
        assert!(validate_intelligent_config(&obj(json!({ "condition_type": "inactivity" }))).is_ok());
    }
}
