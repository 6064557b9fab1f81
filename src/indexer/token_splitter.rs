//! Token-bounded splitting with overlap
//!
//! Text is cut into whitespace-delimited units (a word plus the whitespace
//! that follows it). Each unit costs its estimated token count, at least one.
//! Chunks are exact byte slices of the input made of consecutive units, so the
//! non-overlapping parts of consecutive chunks concatenate back to the input.

use crate::config::{ChunkingConfig, TOKENIZER_CL100K, TOKENIZER_WHITESPACE};
use crate::error::ConfigError;
use anyhow::Context;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+\s*").unwrap());

/// Deterministic token estimation
pub trait TokenCounter: Send + Sync {
    /// Count the number of tokens in the given text
    fn count_tokens(&self, text: &str) -> usize;

    fn name(&self) -> &'static str;
}

/// cl100k_base BPE counter (the encoding used by GPT-4 and ada-002)
pub struct Cl100kCounter {
    bpe: tiktoken_rs::CoreBPE,
}

impl Cl100kCounter {
    pub fn new() -> anyhow::Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().context("Failed to load cl100k_base encoding")?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for Cl100kCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &'static str {
        TOKENIZER_CL100K
    }
}

/// One token per whitespace-separated word
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &'static str {
        TOKENIZER_WHITESPACE
    }
}

/// Resolve a tokenizer name from configuration
pub fn counter_for(name: &str) -> Result<Arc<dyn TokenCounter>, ConfigError> {
    match name {
        TOKENIZER_CL100K => Cl100kCounter::new()
            .map(|c| Arc::new(c) as Arc<dyn TokenCounter>)
            .map_err(|e| ConfigError::InvalidValue {
                key: "chunking.tokenizer".to_string(),
                reason: format!("{:#}", e),
            }),
        TOKENIZER_WHITESPACE => Ok(Arc::new(WhitespaceCounter)),
        other => Err(ConfigError::InvalidValue {
            key: "chunking.tokenizer".to_string(),
            reason: format!("unknown tokenizer '{}'", other),
        }),
    }
}

/// Byte range of one chunk within its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    cost: usize,
}

/// Splits segments into overlapping chunks of at most `max_tokens`
#[derive(Clone)]
pub struct TokenSplitter {
    counter: Arc<dyn TokenCounter>,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl std::fmt::Debug for TokenSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSplitter")
            .field("counter", &self.counter.name())
            .field("max_tokens", &self.max_tokens)
            .field("overlap_tokens", &self.overlap_tokens)
            .finish()
    }
}

impl TokenSplitter {
    /// Requires `0 < max_tokens` and `overlap_tokens < max_tokens`
    pub fn new(
        counter: Arc<dyn TokenCounter>,
        max_tokens: usize,
        overlap_tokens: usize,
    ) -> Result<Self, ConfigError> {
        if max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.max_tokens".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if overlap_tokens >= max_tokens {
            return Err(ConfigError::InvalidValue {
                key: "chunking.overlap_tokens".to_string(),
                reason: format!(
                    "must be less than max_tokens ({} >= {})",
                    overlap_tokens, max_tokens
                ),
            });
        }
        Ok(Self {
            counter,
            max_tokens,
            overlap_tokens,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        let counter = counter_for(&config.tokenizer)?;
        Self::new(counter, config.max_tokens, config.overlap_tokens)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Estimated token count of `text`, as used for splitting
    pub fn estimate_tokens(&self, text: &str) -> usize {
        self.units(text).iter().map(|u| u.cost).sum()
    }

    /// Split a segment into chunk strings
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.split_spans(text)
            .into_iter()
            .map(|span| &text[span.start..span.end])
            .collect()
    }

    /// Split a segment into chunk byte ranges.
    ///
    /// Whitespace-only input yields nothing. A unit whose cost alone exceeds
    /// `max_tokens` becomes a chunk of its own.
    pub fn split_spans(&self, text: &str) -> Vec<Span> {
        let units = self.units(text);
        let n = units.len();
        let mut spans = Vec::new();
        if n == 0 {
            return spans;
        }

        let mut start = 0;
        loop {
            let mut end = start;
            let mut cost = 0;
            while end < n && (end == start || cost + units[end].cost <= self.max_tokens) {
                cost += units[end].cost;
                end += 1;
            }

            spans.push(Span {
                start: units[start].start,
                end: units[end - 1].end,
            });

            if end == n {
                break;
            }

            // Walk back from `end` while the carried tail fits the overlap and
            // still leaves room for the next unit, so every step advances.
            let next_cost = units[end].cost;
            let mut next = end;
            let mut tail = 0;
            while next > start + 1 {
                let candidate = tail + units[next - 1].cost;
                if candidate > self.overlap_tokens || candidate + next_cost > self.max_tokens {
                    break;
                }
                tail = candidate;
                next -= 1;
            }
            start = next;
        }

        spans
    }

    /// Longest prefix of `text` within `max_tokens`, trailing whitespace trimmed
    pub fn truncate<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        let mut cost = 0;
        let mut end = 0;
        for unit in self.units(text) {
            if cost + unit.cost > max_tokens {
                break;
            }
            cost += unit.cost;
            end = unit.end;
        }
        text[..end].trim_end()
    }

    fn units(&self, text: &str) -> Vec<Unit> {
        let mut units: Vec<Unit> = UNIT
            .find_iter(text)
            .map(|m| Unit {
                start: m.start(),
                end: m.end(),
                cost: self.counter.count_tokens(m.as_str().trim_end()).max(1),
            })
            .collect();
        // Leading whitespace belongs to the first unit so spans cover the text
        if let Some(first) = units.first_mut() {
            first.start = 0;
        }
        units
    }
}
