use std::path::PathBuf;

use nodal_llm::GenerationParams;
use nodal_llm::ollama::DEFAULT_OLLAMA_URL;
use nodal_llm::registry::DEFAULT_MODEL;
use nodal_llm::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::vault::Secret;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Defaults for CLI generation requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

/// Base URL overrides for the HTTP vendors. Unset means the vendor default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepseek_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_owned()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesConfig {
    /// Root for relative attachment paths.
    #[serde(default = "default_files_root")]
    pub root: PathBuf,
}

fn default_files_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_files_root(),
        }
    }
}

/// API keys resolved through the vault. Never read from or written to TOML.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
    pub azure_api_key: Option<Secret>,
    pub anthropic_api_key: Option<Secret>,
    pub gemini_api_key: Option<Secret>,
    pub deepseek_api_key: Option<Secret>,
}
