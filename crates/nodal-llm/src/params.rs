use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::registry::DEFAULT_MODEL;

pub const MAX_TOKENS_LIMIT: u32 = 65_536;

/// User-facing generation parameters, validated before a request is built.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationParams {
    #[serde(default = "default_model")]
    pub model: String,
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

impl GenerationParams {
    #[must_use]
    pub fn new(max_tokens: u32) -> Self {
        Self {
            model: default_model(),
            max_tokens,
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }

    /// Check every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(LlmError::InvalidRequest("model must not be empty".into()));
        }
        if !(1..=MAX_TOKENS_LIMIT).contains(&self.max_tokens) {
            return Err(LlmError::InvalidRequest(format!(
                "max_tokens must be between 1 and {MAX_TOKENS_LIMIT}, got {}",
                self.max_tokens
            )));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(LlmError::InvalidRequest(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(LlmError::InvalidRequest(format!(
                "top_p must be between 0.0 and 1.0, got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}
