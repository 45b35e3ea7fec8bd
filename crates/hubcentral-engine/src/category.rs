//! Task categories and keyword categorization.
//!
//! Each [`Category`] owns a fixed keyword table (Portuguese and English) and
//! an ordered list of preferred providers.  [`Categorizer`] compiles every
//! keyword into one Aho-Corasick automaton and scores a text by how many of
//! each category's keywords it contains.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::provider::Provider;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Classification of a task's intent, used to rank providers.
///
/// Declaration order is the tie-break order of [`Categorizer::categorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Research,
    Creative,
    Analysis,
    Conversation,
    Automation,
    Summarize,
    Translate,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Code,
        Self::Research,
        Self::Creative,
        Self::Analysis,
        Self::Conversation,
        Self::Automation,
        Self::Summarize,
        Self::Translate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Research => "research",
            Self::Creative => "creative",
            Self::Analysis => "analysis",
            Self::Conversation => "conversation",
            Self::Automation => "automation",
            Self::Summarize => "summarize",
            Self::Translate => "translate",
        }
    }

    /// Lowercase keywords whose presence votes for this category.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Code => &[
                "código", "code", "programar", "python", "javascript", "função", "debug", "erro",
                "bug", "api", "script", "algoritmo", "class", "método", "variável", "loop",
                "array", "json", "sql", "html", "css",
            ],
            Self::Research => &[
                "pesquisar", "research", "buscar", "encontrar", "informação", "dados",
                "estatística", "fonte", "referência", "artigo", "notícia",
            ],
            Self::Creative => &[
                "escrever", "criar", "história", "poema", "criativo", "narrativa", "ficção",
                "personagem", "roteiro", "letra", "música",
            ],
            Self::Analysis => &[
                "analisar", "análise", "comparar", "avaliar", "revisar", "examinar",
                "interpretar", "dados", "gráfico", "tendência",
            ],
            Self::Conversation => &[
                "olá", "oi", "como vai", "tudo bem", "obrigado", "ajuda", "explique", "o que é",
                "quem é", "quando", "onde",
            ],
            Self::Automation => &[
                "automatizar", "workflow", "tarefa", "agendar", "repetir", "integrar",
                "conectar", "webhook", "trigger", "bot",
            ],
            Self::Summarize => &[
                "resumir", "resumo", "sintetizar", "principais pontos", "em poucas palavras",
                "tldr", "sumário",
            ],
            Self::Translate => &[
                "traduzir", "translate", "inglês", "português", "espanhol", "francês", "idioma",
                "língua",
            ],
        }
    }

    /// Providers best suited to this category, most preferred first.
    pub fn providers(self) -> &'static [Provider] {
        use Provider::*;
        match self {
            Self::Code => &[OpenAi, Claude, DeepSeek],
            Self::Research => &[Perplexity, Gemini, OpenAi],
            Self::Creative => &[Claude, OpenAi, Gemini],
            Self::Analysis => &[OpenAi, Claude, Gemini],
            Self::Conversation => &[Gemini, Claude, OpenAi],
            Self::Automation => &[OpenAi, Groq, Gemini],
            Self::Summarize => &[Claude, Gemini, OpenAi],
            Self::Translate => &[Gemini, OpenAi, Claude],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| EngineError::UnknownCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Categorizer
// ---------------------------------------------------------------------------

/// Keyword scorer over the fixed category table.
///
/// A keyword shared by several categories (e.g. `dados`) votes for each of
/// them.  Scores count distinct keywords present, not occurrences.
pub struct Categorizer {
    /// Distinct keywords, indexed by automaton pattern id.
    keywords: Vec<&'static str>,

    /// Categories voted for by each keyword.
    owners: Vec<Vec<Category>>,

    /// `None` if the automaton failed to build; matching then falls back to
    /// plain substring search.
    automaton: Option<AhoCorasick>,
}

impl Categorizer {
    #[must_use]
    pub fn new() -> Self {
        let mut keywords: Vec<&'static str> = Vec::new();
        let mut owners: Vec<Vec<Category>> = Vec::new();
        for category in Category::ALL {
            for &keyword in category.keywords() {
                match keywords.iter().position(|k| *k == keyword) {
                    Some(idx) => owners[idx].push(category),
                    None => {
                        keywords.push(keyword);
                        owners.push(vec![category]);
                    }
                }
            }
        }

        let automaton = match AhoCorasick::new(&keywords) {
            Ok(ac) => Some(ac),
            Err(e) => {
                tracing::error!(error = %e, "failed to build categorizer automaton");
                None
            }
        };

        Self {
            keywords,
            owners,
            automaton,
        }
    }

    /// Per-category scores in declaration order.
    pub fn scores(&self, text: &str) -> [usize; 8] {
        let lowered = text.to_lowercase();

        let present: HashSet<usize> = match &self.automaton {
            Some(ac) => ac
                .find_overlapping_iter(&lowered)
                .map(|m| m.pattern().as_usize())
                .collect(),
            None => self
                .keywords
                .iter()
                .enumerate()
                .filter(|(_, k)| lowered.contains(**k))
                .map(|(idx, _)| idx)
                .collect(),
        };

        let mut scores = [0usize; 8];
        for idx in present {
            for category in &self.owners[idx] {
                scores[category.index()] += 1;
            }
        }
        scores
    }

    /// Highest-scoring category; ties go to the earlier category, and a text
    /// with no keyword at all is a [`Category::Conversation`].
    pub fn categorize(&self, text: &str) -> Category {
        let scores = self.scores(text);
        let mut best = Category::Conversation;
        let mut best_score = 0;
        for category in Category::ALL {
            let score = scores[category.index()];
            if score > best_score {
                best = category;
                best_score = score;
            }
        }
        best
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
