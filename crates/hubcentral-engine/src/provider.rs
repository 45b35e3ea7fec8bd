//! Known AI providers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// An interchangeable backend capable of answering a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Claude,
    Gemini,
    Perplexity,
    Groq,
    DeepSeek,
    Grok,
    Ollama,
    Manus,
}

impl Provider {
    pub const ALL: [Provider; 9] = [
        Self::OpenAi,
        Self::Claude,
        Self::Gemini,
        Self::Perplexity,
        Self::Groq,
        Self::DeepSeek,
        Self::Grok,
        Self::Ollama,
        Self::Manus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Perplexity => "perplexity",
            Self::Groq => "groq",
            Self::DeepSeek => "deepseek",
            Self::Grok => "grok",
            Self::Ollama => "ollama",
            Self::Manus => "manus",
        }
    }

    /// OpenAI-compatible base URL of the hosted (or default local) endpoint.
    ///
    /// `None` for providers that have no public compatible endpoint and must
    /// be configured explicitly.
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Claude => Some("https://api.anthropic.com/v1"),
            Self::Gemini => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
            Self::Perplexity => Some("https://api.perplexity.ai"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::DeepSeek => Some("https://api.deepseek.com/v1"),
            Self::Grok => Some("https://api.x.ai/v1"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::Manus => None,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Claude => "claude-3-haiku-20240307",
            Self::Gemini => "gemini-1.5-flash",
            Self::Perplexity => "llama-3.1-sonar-small-128k-online",
            Self::Groq => "llama3-8b-8192",
            Self::DeepSeek => "deepseek-chat",
            Self::Grok => "grok-beta",
            Self::Ollama => "llama3",
            Self::Manus => "manus",
        }
    }

    /// Environment variable holding the API key.  Local Ollama needs none.
    pub fn default_api_key_env(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Claude => Some("ANTHROPIC_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Perplexity => Some("PERPLEXITY_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::DeepSeek => Some("DEEPSEEK_API_KEY"),
            Self::Grok => Some("XAI_API_KEY"),
            Self::Ollama => None,
            Self::Manus => Some("MANUS_API_KEY"),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| EngineError::UnknownProvider(s.to_string()))
    }
}
