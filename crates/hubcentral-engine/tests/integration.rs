//! Integration tests for the hubcentral-engine crate.
//!
//! These tests wire the execution engine to real adapters (local scripts)
//! and to a running event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hubcentral_adapters::{ProviderAdapter, ProviderError, ProviderResult};
use hubcentral_engine::{
    Category, EngineConfig, ExecutionEngine, Provider, ProviderConfig, ProviderKind, Task,
};
use hubcentral_kernel::{BusConfig, EventBus, EventType};
use serde_json::Value;

struct Counting {
    calls: AtomicU32,
    delay: Duration,
}

#[async_trait]
impl ProviderAdapter for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn call(&self, prompt: &str, _: Option<&str>, _: Duration) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if prompt.contains("fail") {
            return Err(ProviderError::Transport("refused".into()));
        }
        Ok(format!("echo: {prompt}"))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Script-backed providers
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn configured_script_provider_answers() {
    let engine = ExecutionEngine::new(EngineConfig::new().with_default_timeout_secs(10));
    let configs = vec![
        ProviderConfig::script(Provider::Gemini, "tr a-z A-Z"),
        ProviderConfig {
            enabled: false,
            ..ProviderConfig::script(Provider::Claude, "cat")
        },
    ];
    assert_eq!(engine.register_configured(&configs).unwrap(), 2);
    assert_eq!(configs[0].kind, ProviderKind::Script);

    let answer = engine.ask("Olá, tudo bem?", None, None).await.unwrap();
    assert_eq!(answer.trim(), "OLá, TUDO BEM?");

    let task = engine.create_task("oi", None, None, None);
    assert!(!task.candidate_providers.contains(&Provider::Claude));
}

#[tokio::test]
async fn failing_script_falls_back_to_next_provider() {
    let engine = ExecutionEngine::new(EngineConfig::new().with_default_timeout_secs(10));
    engine
        .register_configured(&[
            ProviderConfig::script(Provider::Perplexity, "exit 3"),
            ProviderConfig::script(Provider::Gemini, "cat"),
        ])
        .unwrap();

    let task = engine.create_task("pesquisar artigo", Some(Category::Research), None, None);
    let task = engine.execute(task).await;

    assert!(task.success);
    assert_eq!(task.provider_used, Some(Provider::Gemini));
    assert!(!task.attempts[0].success);
    assert!(
        task.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("status 3")
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Parallel execution
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn parallel_execution_returns_every_task() {
    let engine = ExecutionEngine::new(EngineConfig::new().with_max_workers(2));
    let adapter = Arc::new(Counting {
        calls: AtomicU32::new(0),
        delay: Duration::from_millis(50),
    });
    engine.register_provider(Provider::OpenAi, adapter.clone());

    let tasks: Vec<Task> = (0..6)
        .map(|i| {
            let prompt = if i == 3 { "please fail".to_string() } else { format!("job {i}") };
            Task::new(prompt, Category::Code, vec![Provider::OpenAi], 5)
        })
        .collect();
    let mut ids: Vec<_> = tasks.iter().map(|t| t.id).collect();

    let results = engine.execute_parallel(tasks).await;
    assert_eq!(results.len(), 6);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 6);
    assert_eq!(results.iter().filter(|t| t.success).count(), 5);

    let mut returned: Vec<_> = results.iter().map(|t| t.id).collect();
    ids.sort();
    returned.sort();
    assert_eq!(ids, returned);
}

// ═══════════════════════════════════════════════════════════════════════
//  Bus integration
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn outcomes_are_published_as_ai_responses() {
    let bus = EventBus::with_config(BusConfig::new().with_idle_backoff_ms(5));
    bus.start().await;

    let engine = ExecutionEngine::new(EngineConfig::default());
    engine.attach_bus(bus.clone()).await;
    engine.register_provider(
        Provider::Gemini,
        Arc::new(Counting {
            calls: AtomicU32::new(0),
            delay: Duration::ZERO,
        }),
    );

    let long_prompt = "x".repeat(300);
    engine
        .execute(Task::new(long_prompt, Category::Conversation, vec![Provider::Gemini], 5))
        .await;

    bus.stop().await.unwrap();

    let events = bus.history(10).await;
    let ai = events
        .iter()
        .find(|e| e.event_type == EventType::AiResponse)
        .expect("ai_response event");
    assert_eq!(ai.source, "execution_engine");
    assert_eq!(ai.payload["provider"], Value::from("gemini"));
    assert_eq!(ai.payload["success"], Value::Bool(true));
    assert_eq!(ai.payload["prompt"].as_str().unwrap().chars().count(), 100);
    assert_eq!(ai.payload["response"].as_str().unwrap().chars().count(), 200);
}
