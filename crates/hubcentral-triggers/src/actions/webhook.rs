//! Outbound webhooks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value, json};

use super::{ActionContext, ActionHandler, ActionKind, required, str_param};
use crate::error::{Result, TriggerError};
use crate::render::render;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);
const RESPONSE_PREVIEW_CHARS: usize = 500;

/// `send_webhook`: send `payload` (or the whole context) as JSON to `url`.
///
/// A non-2xx answer is a failure.  String values inside `payload` are
/// rendered against the context.
pub struct SendWebhook;

#[async_trait]
impl ActionHandler for SendWebhook {
    fn kind(&self) -> ActionKind {
        ActionKind::SendWebhook
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let url = required(params, "url", context, self.kind())?;
        let method_name = str_param(params, "method").unwrap_or("POST").to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| TriggerError::Execution(format!("invalid HTTP method `{method_name}`")))?;
        let timeout = params
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or(WEBHOOK_TIMEOUT);

        let body = match params.get("payload") {
            Some(payload) => render_values(payload, context),
            None => Value::Object(context.clone()),
        };

        let mut request = deps.http().request(method.clone(), &url).timeout(timeout);
        if let Some(headers) = params.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), render(value, context));
                }
            }
        }
        if method != Method::GET {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TriggerError::Execution(format!("webhook request to {url} failed: {e}")))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let preview: String = text.chars().take(RESPONSE_PREVIEW_CHARS).collect();

        if !status.is_success() {
            return Err(TriggerError::Execution(format!(
                "webhook {url} answered {}: {preview}",
                status.as_u16()
            )));
        }

        tracing::info!(url = %url, method = %method, status = status.as_u16(), "webhook sent");
        Ok(json!({
            "webhook_sent": true,
            "status_code": status.as_u16(),
            "response": preview,
        }))
    }
}

/// Render every string leaf of `value`.
fn render_values(value: &Value, context: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(render(s, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_values(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_values(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}
