//! AI actions routed through the execution engine.

use async_trait::async_trait;
use hubcentral_adapters::StorageAdapter;
use hubcentral_engine::{Category, Provider, Task};
use serde_json::{Map, Value, json};

use super::{ActionContext, ActionHandler, ActionKind, context_str, note_path, rendered, required, str_param};
use crate::error::{Result, TriggerError};
use crate::render::display;

const DEFAULT_INSTRUCTION: &str = "Analyze the following content:";

/// `provider` parameter: absent or `"auto"` lets the decision engine choose.
fn preferred_provider(params: &Map<String, Value>) -> Result<Option<Provider>> {
    match str_param(params, "provider") {
        None | Some("auto") => Ok(None),
        Some(name) => Ok(Some(name.parse()?)),
    }
}

fn category_param(params: &Map<String, Value>) -> Result<Option<Category>> {
    str_param(params, "category")
        .map(str::parse::<Category>)
        .transpose()
        .map_err(Into::into)
}

/// `provider` and `category` must name known values when present.
pub(super) fn validate_params(params: &Map<String, Value>) -> Result<()> {
    let config_error = |e: TriggerError| TriggerError::Configuration(e.to_string());
    preferred_provider(params).map_err(config_error)?;
    category_param(params).map_err(config_error)?;
    Ok(())
}

/// Execute `prompt` and shape the outcome, optionally saving the answer.
async fn run_prompt(
    prompt: String,
    params: &Map<String, Value>,
    context: &Map<String, Value>,
    deps: &ActionContext,
) -> Result<Value> {
    let engine = deps.engine()?;
    let task = engine.create_task(prompt, category_param(params)?, None, preferred_provider(params)?);
    let task = engine.execute(task).await;
    if !task.success {
        return Err(TriggerError::Execution(
            task.error.unwrap_or_else(|| "AI task failed".into()),
        ));
    }

    let saved = match rendered(params, "output_path", context) {
        Some(path) => Some(save_response(&task, &path, params, deps).await?),
        None => None,
    };

    Ok(json!({
        "ai_result": {
            "task_id": task.id,
            "provider": task.provider_used,
            "category": task.category,
            "response": task.result,
            "elapsed_ms": task.elapsed_ms,
        },
        "saved_to": saved,
    }))
}

async fn save_response(
    task: &Task,
    path: &str,
    params: &Map<String, Value>,
    deps: &ActionContext,
) -> Result<String> {
    let path = note_path(path);
    let adapter = deps.storage(str_param(params, "storage")).await?;
    adapter
        .save(
            &json!({ "content": task.result.clone().unwrap_or_default() }),
            Some(&path),
        )
        .await?;
    tracing::info!(task_id = %task.id, path = %path, "AI response saved");
    Ok(path)
}

// ---------------------------------------------------------------------------
// run_ai_analysis
// ---------------------------------------------------------------------------

/// `run_ai_analysis`: render `prompt` and run it through the engine.
pub struct RunAiAnalysis;

#[async_trait]
impl ActionHandler for RunAiAnalysis {
    fn kind(&self) -> ActionKind {
        ActionKind::RunAiAnalysis
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let prompt = required(params, "prompt", context, self.kind())?;
        run_prompt(prompt, params, context, deps).await
    }
}

// ---------------------------------------------------------------------------
// process_with_ai
// ---------------------------------------------------------------------------

/// `process_with_ai`: ask the engine to work on the triggering content
/// (`content` from the context, falling back to `data`).
pub struct ProcessWithAi;

#[async_trait]
impl ActionHandler for ProcessWithAi {
    fn kind(&self) -> ActionKind {
        ActionKind::ProcessWithAi
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let instruction =
            rendered(params, "instruction", context).unwrap_or_else(|| DEFAULT_INSTRUCTION.into());
        let content = match context_str(context, "content") {
            Some(content) => content.to_string(),
            None => context.get("data").map(display).unwrap_or_default(),
        };
        run_prompt(format!("{instruction}\n\n{content}"), params, context, deps).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
