use anyhow::{Context, Result, anyhow};
use moka::sync::Cache;
use serde::Serialize;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model, o200k_base};
use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

/// Token counter backed by tiktoken-rs with a content-hash cache.
/// Shared across bundling threads.
pub struct Budgeter {
    /// Byte Pair Encoding (BPE) tokenizer for counting tokens
    bpe: CoreBPE,

    /// Token count cache keyed by xxh64 of the text
    cache: Cache<u64, usize>,
}

impl Budgeter {
    /// Create a Budgeter for a model name ("gpt-4o") or an encoding name
    /// ("o200k_base", "cl100k_base").
    ///
    /// # Errors
    /// Returns an error if the model or encoding is unsupported or cannot be loaded.
    pub fn new(model_or_encoding: &str) -> Result<Self> {
        let lower = model_or_encoding.to_ascii_lowercase();

        // Model name first, then encoding name
        let bpe = match get_bpe_from_model(&lower) {
            Ok(b) => b,
            Err(_) => match lower.as_str() {
                "o200k_base" => o200k_base().context("load o200k_base")?,
                "cl100k_base" => cl100k_base().context("load cl100k_base")?,
                _ => return Err(anyhow!("Unsupported model/encoding: {model_or_encoding}")),
            },
        };

        Ok(Self { bpe, cache: Cache::new(20_000) })
    }

    /// Number of tokens in `s`
    pub fn count(&self, s: &str) -> usize {
        if s.is_empty() {
            return 0;
        }

        let mut hasher = Xxh64::new(0);
        hasher.update(s.as_bytes());
        let key = hasher.digest();

        if let Some(t) = self.cache.get(&key) {
            return t;
        }

        let t = self.bpe.encode_ordinary(s).len();
        self.cache.insert(key, t);
        t
    }
}

/// Running token total against a ceiling. Once a fragment would cross
/// the ceiling the gate closes for good and every later fragment is
/// refused.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenGate {
    pub max_tokens: usize,
    pub used: usize,
    pub truncated: bool,
}

impl TokenGate {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens, used: 0, truncated: false }
    }

    /// Account for `text`; returns false (and records truncation) when it
    /// does not fit
    pub fn admit(&mut self, budgeter: &Budgeter, text: &str) -> bool {
        if self.truncated {
            return false;
        }

        let tokens = budgeter.count(text);
        if self.used + tokens > self.max_tokens {
            debug!(used = self.used, tokens, max = self.max_tokens, "token budget exhausted");
            self.truncated = true;
            return false;
        }

        self.used += tokens;
        true
    }

    pub fn remaining(&self) -> usize {
        self.max_tokens.saturating_sub(self.used)
    }
}
