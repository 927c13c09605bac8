//! Static capability matrix for the models nodal knows how to shape requests for.
//!
//! Every entry records the output-token ceiling, the accepted temperature range and
//! which JSON output modes the vendor honors for that model. Lookups are by the full
//! `provider/model` identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

use self::ResponseFormatSupport::{JsonObject, JsonSchema};

/// LLM vendor backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "azure")]
    AzureOpenAi,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [Self; 6] = [
        Self::OpenAi,
        Self::Anthropic,
        Self::Gemini,
        Self::Ollama,
        Self::AzureOpenAi,
        Self::DeepSeek,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::AzureOpenAi => "azure",
            Self::DeepSeek => "deepseek",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| LlmError::UnknownProvider(s.to_owned()))
    }
}

/// Which `response_format` values a model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormatSupport {
    Unsupported,
    JsonObject,
    JsonSchema,
}

impl ResponseFormatSupport {
    #[must_use]
    pub fn accepts_response_format(self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    #[must_use]
    pub fn accepts_schema(self) -> bool {
        matches!(self, Self::JsonSchema)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelConstraints {
    pub max_tokens: u32,
    pub min_temperature: f32,
    pub max_temperature: f32,
    pub supports_json_output: bool,
    pub supports_temperature: bool,
    /// Reasoning models take `max_completion_tokens` and ignore sampling parameters.
    pub reasoning: bool,
    pub response_format: ResponseFormatSupport,
}

impl ModelConstraints {
    const fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            min_temperature: 0.0,
            max_temperature: 1.0,
            supports_json_output: true,
            supports_temperature: true,
            reasoning: false,
            response_format: ResponseFormatSupport::Unsupported,
        }
    }

    const fn max_temperature(mut self, t: f32) -> Self {
        self.max_temperature = t;
        self
    }

    const fn no_json_output(mut self) -> Self {
        self.supports_json_output = false;
        self
    }

    const fn no_temperature(mut self) -> Self {
        self.supports_temperature = false;
        self
    }

    const fn reasoning(mut self) -> Self {
        self.reasoning = true;
        self.supports_temperature = false;
        self
    }

    const fn response_format(mut self, support: ResponseFormatSupport) -> Self {
        self.response_format = support;
        self
    }

    /// Clamp a requested temperature into the model's accepted range.
    #[must_use]
    pub fn clamp_temperature(&self, temperature: f32) -> f32 {
        temperature.clamp(self.min_temperature, self.max_temperature)
    }

    /// Cap a requested output budget at the model's ceiling.
    #[must_use]
    pub fn clamp_max_tokens(&self, max_tokens: u32) -> u32 {
        max_tokens.min(self.max_tokens)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LlmModel {
    pub id: &'static str,
    pub provider: ProviderKind,
    pub name: &'static str,
    pub constraints: ModelConstraints,
}

/// A `provider/model` identifier split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelId<'a> {
    pub provider: ProviderKind,
    /// Vendor-side model name, without the provider prefix.
    pub name: &'a str,
}

impl<'a> ModelId<'a> {
    /// Split a model identifier. Identifiers without a prefix are OpenAI models.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnknownProvider`] for an unrecognized prefix.
    pub fn parse(id: &'a str) -> Result<Self> {
        match id.split_once('/') {
            Some((prefix, name)) => Ok(Self {
                provider: prefix.parse()?,
                name,
            }),
            None => Ok(Self {
                provider: ProviderKind::OpenAi,
                name: id,
            }),
        }
    }
}

pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Known identifier with no capability entry; requests to it skip JSON shaping.
pub const GEMINI_2_0_FLASH_EXP: &str = "gemini/gemini-2.0-flash-exp";

const fn openai(max_tokens: u32) -> ModelConstraints {
    ModelConstraints::new(max_tokens).max_temperature(2.0)
}

const fn model(
    id: &'static str,
    provider: ProviderKind,
    name: &'static str,
    constraints: ModelConstraints,
) -> LlmModel {
    LlmModel {
        id,
        provider,
        name,
        constraints,
    }
}

#[rustfmt::skip]
static MODELS: &[LlmModel] = &[
    // OpenAI
    model("openai/gpt-4o-mini", ProviderKind::OpenAi, "GPT-4O Mini", openai(16384).response_format(JsonSchema)),
    model("openai/gpt-4o", ProviderKind::OpenAi, "GPT-4O", openai(16384).response_format(JsonSchema)),
    model("openai/o1-preview", ProviderKind::OpenAi, "O1 Preview", openai(32768).reasoning()),
    model("openai/o1-mini", ProviderKind::OpenAi, "O1 Mini", openai(65536).reasoning()),
    model("openai/o1", ProviderKind::OpenAi, "O1", openai(100_000).reasoning().response_format(JsonSchema)),
    model("openai/o1-2024-12-17", ProviderKind::OpenAi, "O1 (2024-12-17)", openai(100_000).reasoning().response_format(JsonSchema)),
    model("openai/o1-mini-2024-09-12", ProviderKind::OpenAi, "O1 Mini (2024-09-12)", openai(65536).reasoning()),
    model("openai/o1-preview-2024-09-12", ProviderKind::OpenAi, "O1 Preview (2024-09-12)", openai(32768).reasoning()),
    model("openai/gpt-4-turbo", ProviderKind::OpenAi, "GPT-4 Turbo", openai(4096).response_format(JsonObject)),
    model("openai/chatgpt-4o-latest", ProviderKind::OpenAi, "ChatGPT-4 Optimized Latest", openai(4096).response_format(JsonObject)),
    // Azure OpenAI
    model("azure/gpt-4", ProviderKind::AzureOpenAi, "Azure GPT-4", openai(4096).response_format(JsonObject)),
    model("azure/gpt-4-turbo", ProviderKind::AzureOpenAi, "Azure GPT-4 Turbo", openai(4096).response_format(JsonObject)),
    model("azure/gpt-35-turbo", ProviderKind::AzureOpenAi, "Azure GPT-3.5 Turbo", openai(4096).response_format(JsonObject)),
    // Anthropic
    model("anthropic/claude-3-5-sonnet-latest", ProviderKind::Anthropic, "Claude 3.5 Sonnet Latest", ModelConstraints::new(8192).no_json_output()),
    model("anthropic/claude-3-5-haiku-latest", ProviderKind::Anthropic, "Claude 3.5 Haiku Latest", ModelConstraints::new(8192).no_json_output()),
    model("anthropic/claude-3-opus-latest", ProviderKind::Anthropic, "Claude 3 Opus Latest", ModelConstraints::new(4096).no_json_output()),
    // Google
    model("gemini/gemini-1.5-pro", ProviderKind::Gemini, "Gemini 1.5 Pro", ModelConstraints::new(8192).response_format(JsonSchema)),
    model("gemini/gemini-1.5-flash", ProviderKind::Gemini, "Gemini 1.5 Flash", ModelConstraints::new(8192).response_format(JsonSchema)),
    model("gemini/gemini-1.5-pro-latest", ProviderKind::Gemini, "Gemini 1.5 Pro Latest", ModelConstraints::new(8192).response_format(JsonSchema)),
    model("gemini/gemini-1.5-flash-latest", ProviderKind::Gemini, "Gemini 1.5 Flash Latest", ModelConstraints::new(8192).response_format(JsonSchema)),
    // DeepSeek
    model("deepseek/deepseek-chat", ProviderKind::DeepSeek, "Deepseek Chat", openai(8192).no_json_output()),
    model("deepseek/deepseek-reasoner", ProviderKind::DeepSeek, "Deepseek Reasoner", openai(8192).no_json_output().no_temperature()),
    // Ollama
    model("ollama/phi4", ProviderKind::Ollama, "Phi 4", openai(4096).response_format(JsonObject)),
    model("ollama/llama3.3:70b", ProviderKind::Ollama, "Llama 3.3 (70B)", openai(4096).response_format(JsonObject)),
    model("ollama/llama3.3:8b", ProviderKind::Ollama, "Llama 3.3 (8B)", openai(4096).response_format(JsonObject)),
    model("ollama/llama3.2:8b", ProviderKind::Ollama, "Llama 3.2 (8B)", openai(4096).response_format(JsonObject)),
    model("ollama/llama3.2:1b", ProviderKind::Ollama, "Llama 3.2 (1B)", openai(4096).response_format(JsonObject)),
    model("ollama/llama3", ProviderKind::Ollama, "Llama 3 (8B)", openai(4096).response_format(JsonObject)),
    model("ollama/gemma2", ProviderKind::Ollama, "Gemma 2", openai(4096).response_format(JsonObject)),
    model("ollama/gemma2:2b", ProviderKind::Ollama, "Gemma 2 (2B)", openai(4096).response_format(JsonObject)),
    model("ollama/mistral", ProviderKind::Ollama, "Mistral", openai(4096).response_format(JsonObject)),
    model("ollama/codellama", ProviderKind::Ollama, "CodeLlama", openai(4096).response_format(JsonObject)),
    model("ollama/mixtral-8x7b-instruct-v0.1", ProviderKind::Ollama, "Mixtral 8x7B Instruct", openai(4096).response_format(JsonObject)),
    model("ollama/deepseek-r1", ProviderKind::Ollama, "Deepseek R1", openai(4096).response_format(JsonObject)),
];

/// Look up a model by its full identifier.
#[must_use]
pub fn model_info(id: &str) -> Option<&'static LlmModel> {
    MODELS.iter().find(|m| m.id == id)
}

/// All registered models in declaration order.
#[must_use]
pub fn all_models() -> &'static [LlmModel] {
    MODELS
}
