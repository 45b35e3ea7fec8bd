//! Decision engine: categorization and provider ranking.
//!
//! Runtime state per [`Provider`] lives in a process-wide [`DashMap`] shared
//! by every task and trigger.  It is fed back after each provider attempt:
//! a success marks the provider online and folds the attempt latency into a
//! rolling average, a failure marks it offline.
//!
//! An offline provider is skipped by [`DecisionEngine::select_providers`]
//! until `offline_cooldown` has elapsed since its last failure, after which
//! it is tried again.  A `None` cooldown keeps it out until it is explicitly
//! reported online.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::category::{Categorizer, Category};
use crate::provider::Provider;

/// Runtime health of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderState {
    pub online: bool,
    pub enabled: bool,
    /// Rolling average attempt latency; `None` until the first success.
    pub avg_latency_ms: Option<u64>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            online: true,
            enabled: true,
            avg_latency_ms: None,
            last_failure: None,
        }
    }
}

/// Routes tasks to providers.
pub struct DecisionEngine {
    categorizer: Categorizer,
    states: DashMap<Provider, ProviderState>,
    offline_cooldown: Option<Duration>,
}

impl DecisionEngine {
    /// Create an engine with every known provider online and enabled.
    #[must_use]
    pub fn new(offline_cooldown: Option<Duration>) -> Self {
        let states = DashMap::new();
        for provider in Provider::ALL {
            states.insert(provider, ProviderState::default());
        }
        Self {
            categorizer: Categorizer::new(),
            states,
            offline_cooldown,
        }
    }

    /// Classify free text.  See [`Categorizer::categorize`].
    pub fn categorize(&self, text: &str) -> Category {
        self.categorizer.categorize(text)
    }

    /// Ordered candidate providers for a task.
    ///
    /// `preferred` goes first when available, followed by the category's
    /// declared providers (duplicates and unavailable ones skipped).  The
    /// list is then stably sorted by average latency, unknown latency
    /// counting as zero.
    pub fn select_providers(&self, category: Category, preferred: Option<Provider>) -> Vec<Provider> {
        let mut selected = Vec::with_capacity(4);
        if let Some(p) = preferred
            && self.is_available(p)
        {
            selected.push(p);
        }
        for &p in category.providers() {
            if !selected.contains(&p) && self.is_available(p) {
                selected.push(p);
            }
        }
        selected.sort_by_key(|p| self.latency(*p));

        tracing::debug!(category = %category, providers = ?selected, "providers selected");
        selected
    }

    /// Record the outcome of an attempt.
    pub fn update_provider_status(&self, provider: Provider, online: bool, latency_ms: Option<u64>) {
        let mut state = self.states.entry(provider).or_default();
        if online {
            state.online = true;
            if let Some(sample) = latency_ms {
                state.avg_latency_ms = Some(match state.avg_latency_ms {
                    Some(avg) => (avg + sample) / 2,
                    None => sample,
                });
            }
        } else {
            state.online = false;
            state.last_failure = Some(Utc::now());
            tracing::warn!(provider = %provider, "provider marked offline");
        }
    }

    /// Administratively enable or disable a provider.
    pub fn set_provider_enabled(&self, provider: Provider, enabled: bool) {
        self.states.entry(provider).or_default().enabled = enabled;
        tracing::info!(provider = %provider, enabled, "provider availability changed");
    }

    /// Whether `provider` may currently be selected.
    pub fn is_available(&self, provider: Provider) -> bool {
        let Some(state) = self.states.get(&provider) else {
            return false;
        };
        if !state.enabled {
            return false;
        }
        if state.online {
            return true;
        }
        match (self.offline_cooldown, state.last_failure) {
            (Some(cooldown), Some(failed_at)) => {
                let elapsed = (Utc::now() - failed_at).to_std().unwrap_or(Duration::ZERO);
                elapsed >= cooldown
            }
            _ => false,
        }
    }

    /// State of one provider.
    pub fn provider_state(&self, provider: Provider) -> Option<ProviderState> {
        self.states.get(&provider).map(|s| s.clone())
    }

    /// Snapshot of every provider's state.
    pub fn provider_states(&self) -> BTreeMap<Provider, ProviderState> {
        self.states
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    fn latency(&self, provider: Provider) -> u64 {
        self.states
            .get(&provider)
            .and_then(|s| s.avg_latency_ms)
            .unwrap_or(0)
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_follows_category_table() {
        let engine = DecisionEngine::default();
        assert_eq!(
            engine.select_providers(Category::Research, None),
            vec![Provider::Perplexity, Provider::Gemini, Provider::OpenAi]
        );
    }

    #[test]
    fn preferred_provider_is_prepended_once() {
        let engine = DecisionEngine::default();
        assert_eq!(
            engine.select_providers(Category::Code, Some(Provider::Ollama)),
            vec![Provider::Ollama, Provider::OpenAi, Provider::Claude, Provider::DeepSeek]
        );
        assert_eq!(
            engine.select_providers(Category::Code, Some(Provider::Claude)),
            vec![Provider::Claude, Provider::OpenAi, Provider::DeepSeek]
        );
    }

    #[test]
    fn offline_provider_is_removed_from_every_category() {
        let engine = DecisionEngine::default();
        engine.update_provider_status(Provider::OpenAi, false, None);
        for category in Category::ALL {
            let selected = engine.select_providers(category, Some(Provider::OpenAi));
            assert!(!selected.contains(&Provider::OpenAi), "{category}");
        }
    }

    #[test]
    fn disabled_provider_is_skipped_even_when_online() {
        let engine = DecisionEngine::default();
        engine.set_provider_enabled(Provider::Gemini, false);
        assert_eq!(
            engine.select_providers(Category::Translate, None),
            vec![Provider::OpenAi, Provider::Claude]
        );
        engine.set_provider_enabled(Provider::Gemini, true);
        assert_eq!(engine.select_providers(Category::Translate, None).len(), 3);
    }

    #[test]
    fn latency_sort_is_stable_and_unknown_sorts_first() {
        let engine = DecisionEngine::default();
        engine.update_provider_status(Provider::Claude, true, Some(400));
        engine.update_provider_status(Provider::OpenAi, true, Some(100));
        // Gemini has no sample and sorts as zero.
        assert_eq!(
            engine.select_providers(Category::Creative, None),
            vec![Provider::Gemini, Provider::OpenAi, Provider::Claude]
        );
    }

    #[test]
    fn latency_is_smoothed() {
        let engine = DecisionEngine::default();
        engine.update_provider_status(Provider::Groq, true, Some(100));
        engine.update_provider_status(Provider::Groq, true, Some(300));
        assert_eq!(engine.provider_state(Provider::Groq).unwrap().avg_latency_ms, Some(200));
    }

    #[test]
    fn success_brings_provider_back_online() {
        let engine = DecisionEngine::default();
        engine.update_provider_status(Provider::Claude, false, None);
        assert!(!engine.is_available(Provider::Claude));
        let state = engine.provider_state(Provider::Claude).unwrap();
        assert!(state.last_failure.is_some());

        engine.update_provider_status(Provider::Claude, true, Some(10));
        assert!(engine.is_available(Provider::Claude));
    }

    #[test]
    fn offline_provider_returns_after_cooldown() {
        let engine = DecisionEngine::new(Some(Duration::from_millis(50)));
        engine.update_provider_status(Provider::Perplexity, false, None);
        assert!(!engine.is_available(Provider::Perplexity));

        std::thread::sleep(Duration::from_millis(80));
        assert!(engine.is_available(Provider::Perplexity));
        assert_eq!(engine.select_providers(Category::Research, None)[0], Provider::Perplexity);
    }

    #[test]
    fn without_cooldown_offline_is_sticky() {
        let engine = DecisionEngine::new(None);
        engine.update_provider_status(Provider::Grok, false, None);
        std::thread::sleep(Duration::from_millis(20));
        assert!(!engine.is_available(Provider::Grok));
    }
}
