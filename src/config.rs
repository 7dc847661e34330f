//! AI provider configuration.
//!
//! Loaded once at startup and passed into the summarizer by value — there is
//! no ambient global state. A missing API key is a warning, not a startup
//! failure: summarization calls will fail at request time and degrade to the
//! raw-text paths.

use tracing::warn;

/// First-choice summarization model.
pub const PRIMARY_MODEL: &str = "gemini-2.5-flash-lite";

/// Safety-net model tried when the primary fails.
pub const FALLBACK_MODEL: &str = "gemma-3-12b-it";

#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Provider API key. `None` means calls fail at request time.
    pub api_key: Option<String>,
    pub primary_model: String,
    pub fallback_model: String,
    /// Output budget per summary.
    pub max_output_tokens: u32,
    /// Low temperature for deterministic, factual summaries.
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            primary_model: PRIMARY_MODEL.to_string(),
            fallback_model: FALLBACK_MODEL.to_string(),
            max_output_tokens: 2048,
            temperature: 0.3,
        }
    }
}

impl AiConfig {
    /// Read the provider credential from `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!("GEMINI_API_KEY not set — summaries will fall back to raw text");
        }
        Self {
            api_key,
            ..Self::default()
        }
    }
}
