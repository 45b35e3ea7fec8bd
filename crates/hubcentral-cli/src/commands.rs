//! Subcommand implementations.

use anyhow::{Context, Result, bail};
use hubcentral_engine::{Category, Provider};
use hubcentral_triggers::{TriggerUpdate, templates};
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::TriggerAction;
use crate::context::HubContext;

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub async fn run(hub: &HubContext) -> Result<()> {
    hub.start().await;

    let stats = hub.triggers.stats().await;
    let jobs = hub.triggers.scheduled_jobs().await;
    let maintenance = match &hub.builtin {
        Some(builtin) => builtin.maintenance_jobs().await,
        None => Vec::new(),
    };
    println!();
    println!("  Hub Central v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  {} providers, {} triggers ({} enabled), {} scheduled jobs",
        hub.engine.registered_providers().len(),
        stats.total,
        stats.enabled,
        jobs.len()
    );
    for job in &maintenance {
        println!("  maintenance: {:<14} {}", job.name, job.schedule);
    }
    println!("  Press Ctrl-C to stop.");
    println!();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");
    hub.shutdown().await
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

pub async fn status(hub: &HubContext) -> Result<()> {
    println!();
    println!("  Hub Central Status");
    println!("  ==================");
    println!();

    let providers = hub.engine.registered_providers();
    if providers.is_empty() {
        println!("  Providers:        NONE (add [[providers]] to the config)");
    } else {
        let names: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
        println!("  Providers:        {}", names.join(", "));
    }

    for (name, health) in hub.storage.health_check_all().await {
        let detail = health.message.as_deref().unwrap_or("");
        println!("  Storage {name:<9} {:?} {detail}", health.status);
    }

    let stats = hub.triggers.stats().await;
    println!(
        "  Triggers:         {} total, {} enabled, {} disabled",
        stats.total, stats.enabled, stats.disabled
    );
    for (trigger_type, count) in &stats.by_type {
        println!("    {trigger_type:<14}  {count}");
    }
    println!(
        "  Trigger runs:     {} ok, {} errors",
        stats.total_runs, stats.total_errors
    );
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// ask / categorize
// ---------------------------------------------------------------------------

pub async fn ask(
    hub: &HubContext,
    prompt: String,
    category: Option<String>,
    provider: Option<String>,
) -> Result<()> {
    let category = category.map(|c| c.parse::<Category>()).transpose()?;
    let provider = provider.map(|p| p.parse::<Provider>()).transpose()?;

    let task = hub.engine.create_task(prompt, category, None, provider);
    let task = hub.engine.execute(task).await;
    match (&task.result, task.success) {
        (Some(answer), true) => {
            let provider = task.provider_used.map_or("unknown", Provider::as_str);
            info!(task_id = %task.id, provider, elapsed_ms = task.elapsed_ms, "task answered");
            println!("{answer}");
            Ok(())
        }
        _ => bail!(
            "task failed after {} attempts: {}",
            task.attempts.len(),
            task.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn categorize(hub: &HubContext, text: &str) {
    let category = hub.engine.decision().categorize(text);
    let ranked = hub.engine.decision().select_providers(category, None);
    let names: Vec<&str> = ranked.iter().map(|p| p.as_str()).collect();

    println!("category:  {category}");
    if names.is_empty() {
        println!("providers: none available");
    } else {
        println!("providers: {}", names.join(", "));
    }
}

// ---------------------------------------------------------------------------
// triggers
// ---------------------------------------------------------------------------

pub async fn triggers(hub: &HubContext, action: TriggerAction) -> Result<()> {
    let registry = &hub.triggers;
    match action {
        TriggerAction::List => {
            let triggers = registry.list().await;
            if triggers.is_empty() {
                println!("no triggers");
            }
            for t in triggers {
                println!(
                    "{}  {:<11} {:<8}  runs={:<4} errors={:<4} {}",
                    t.id,
                    t.trigger_type.as_str(),
                    t.status.as_str(),
                    t.run_count,
                    t.error_count,
                    t.name
                );
            }
        }
        TriggerAction::Templates => {
            for t in templates::catalog() {
                println!(
                    "{:<18} {:<11} {}",
                    t.slug,
                    t.trigger.trigger_type.as_str(),
                    t.trigger.description
                );
            }
        }
        TriggerAction::FromTemplate {
            template,
            name,
            disabled,
        } => {
            let mut overrides = TriggerUpdate::new();
            if let Some(name) = name {
                overrides = overrides.name(name);
            }
            if disabled {
                overrides = overrides.enabled(false);
            }
            let trigger = registry.create_from_template(&template, overrides).await?;
            println!("created {} ({})", trigger.id, trigger.name);
        }
        TriggerAction::Toggle { id } => {
            let trigger = registry.toggle(&id).await?;
            let state = if trigger.enabled { "enabled" } else { "disabled" };
            println!("{} is now {state}", trigger.id);
        }
        TriggerAction::Delete { id } => {
            let trigger = registry.delete(&id).await?;
            println!("deleted {} ({})", trigger.id, trigger.name);
        }
        TriggerAction::Execute { id, context } => {
            let context = parse_context(context.as_deref())?;
            let outcome = registry.execute(&id, context).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                bail!("trigger {id} failed");
            }
        }
        TriggerAction::Stats => {
            let stats = registry.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

fn parse_context(raw: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str(raw).context("--context is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--context must be a JSON object, got {other}"),
    }
}
