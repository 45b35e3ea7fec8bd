//! Note actions: create, append, summarize a folder, apply a template.

use async_trait::async_trait;
use chrono::Local;
use hubcentral_adapters::{AdapterError, StorageAdapter};
use serde_json::{Map, Value, json};

use super::{ActionContext, ActionHandler, ActionKind, context_str, note_path, rendered, required, str_param};
use crate::error::{Result, TriggerError};
use crate::render::render;

const DEFAULT_NOTE_FOLDER: &str = "Hub Central/Notas Automáticas";
const DEFAULT_TEMPLATES_FOLDER: &str = "Templates";

/// Load a note's markdown body, mapping a missing note to `None`.
async fn load_content(
    deps: &ActionContext,
    storage: Option<&str>,
    path: &str,
) -> Result<Option<String>> {
    let adapter = deps.storage(storage).await?;
    match adapter.load(path).await {
        Ok(doc) => Ok(Some(
            doc.get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )),
        Err(AdapterError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// create_note
// ---------------------------------------------------------------------------

/// `create_note`: write `{path}/{title}.md` with the rendered `template`.
pub struct CreateNote;

#[async_trait]
impl ActionHandler for CreateNote {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateNote
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let folder = rendered(params, "path", context).unwrap_or_else(|| DEFAULT_NOTE_FOLDER.into());
        let title = rendered(params, "title", context)
            .unwrap_or_else(|| format!("Nota_{}", Local::now().format("%Y%m%d_%H%M%S")));
        let content = rendered(params, "template", context).unwrap_or_default();
        let path = note_path(&format!("{}/{title}", folder.trim_end_matches('/')));

        let adapter = deps.storage(str_param(params, "storage")).await?;
        let result = adapter
            .save(&json!({ "title": title, "content": content }), Some(&path))
            .await?;

        tracing::info!(path = %path, storage = adapter.id(), "note created");
        Ok(json!({ "note_created": path, "result": result }))
    }
}

// ---------------------------------------------------------------------------
// update_note
// ---------------------------------------------------------------------------

/// `update_note`: append the rendered `append` text to an existing note.
pub struct UpdateNote;

#[async_trait]
impl ActionHandler for UpdateNote {
    fn kind(&self) -> ActionKind {
        ActionKind::UpdateNote
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let path = note_path(&required(params, "path", context, self.kind())?);
        let append = rendered(params, "append", context).unwrap_or_default();
        let storage = str_param(params, "storage");

        if load_content(deps, storage, &path).await?.is_none() {
            return Err(TriggerError::Execution(format!("note not found: {path}")));
        }

        let adapter = deps.storage(storage).await?;
        let result = adapter
            .save(
                &json!({ "content": format!("\n{append}"), "mode": "append" }),
                Some(&path),
            )
            .await?;

        tracing::info!(path = %path, "note updated");
        Ok(json!({ "note_updated": path, "result": result }))
    }
}

// ---------------------------------------------------------------------------
// generate_summary
// ---------------------------------------------------------------------------

/// `generate_summary`: index the notes under `folder`, optionally writing the
/// index to `target`.
pub struct GenerateSummary;

#[async_trait]
impl ActionHandler for GenerateSummary {
    fn kind(&self) -> ActionKind {
        ActionKind::GenerateSummary
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let period = str_param(params, "period").unwrap_or("day");
        let folder = rendered(params, "folder", context).unwrap_or_default();
        let storage = str_param(params, "storage");
        let adapter = deps.storage(storage).await?;

        let prefix = folder.trim_matches('/');
        let mut notes = adapter
            .list((!prefix.is_empty()).then_some(prefix))
            .await?;
        let target = rendered(params, "target", context).map(|t| note_path(&t));
        if let Some(target) = &target {
            notes.retain(|n| n != target);
        }

        let now = Local::now();
        let scope = if prefix.is_empty() { "all notes" } else { prefix };
        let mut body = format!(
            "# Summary ({period})\n\n**Generated:** {}\n**Scope:** {scope}\n**Notes:** {}\n\n",
            now.format("%d/%m/%Y %H:%M"),
            notes.len()
        );
        for note in &notes {
            let link = note.strip_suffix(".md").unwrap_or(note);
            body.push_str(&format!("- [[{link}]]\n"));
        }

        if let Some(target) = &target {
            adapter
                .save(
                    &json!({ "title": format!("Summary ({period})"), "content": body }),
                    Some(target),
                )
                .await?;
            tracing::info!(target = %target, notes = notes.len(), "summary written");
        }

        Ok(json!({
            "summary_generated": true,
            "period": period,
            "folder": prefix,
            "notes": notes.len(),
            "target": target,
            "content": body,
        }))
    }
}

// ---------------------------------------------------------------------------
// apply_template
// ---------------------------------------------------------------------------

/// `apply_template`: render `{templates_folder}/{template_name}.md` and
/// prepend it to the target note (`note_path` or `path` from the context).
pub struct ApplyTemplate;

#[async_trait]
impl ActionHandler for ApplyTemplate {
    fn kind(&self) -> ActionKind {
        ActionKind::ApplyTemplate
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let template_name = str_param(params, "template_name").unwrap_or("default");
        let folder = str_param(params, "templates_folder").unwrap_or(DEFAULT_TEMPLATES_FOLDER);
        let storage = str_param(params, "storage");

        let target = rendered(params, "target", context)
            .or_else(|| context_str(context, "note_path").map(str::to_string))
            .or_else(|| context_str(context, "path").map(str::to_string))
            .map(|t| note_path(&t))
            .ok_or_else(|| {
                TriggerError::Execution("apply_template needs a target note (`note_path` or `path`)".into())
            })?;

        let template_path = note_path(&format!("{}/{template_name}", folder.trim_end_matches('/')));
        let template = load_content(deps, storage, &template_path)
            .await?
            .ok_or_else(|| TriggerError::Execution(format!("template not found: {template_path}")))?;
        let header = render(&template, context);

        let content = match load_content(deps, storage, &target).await? {
            Some(existing) if !existing.is_empty() => format!("{header}\n\n{existing}"),
            _ => header,
        };

        let adapter = deps.storage(storage).await?;
        adapter.save(&json!({ "content": content }), Some(&target)).await?;

        tracing::info!(template = %template_path, target = %target, "template applied");
        Ok(json!({ "template_applied": template_name, "target": target }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
