//! The text generation pipeline: provider selection, request shaping, retries and
//! JSON post-processing.

use std::fmt;
use std::path::PathBuf;

use crate::any::AnyProvider;
use crate::attachments::attachment_part;
use crate::azure::AzureOpenAiProvider;
use crate::claude::ClaudeProvider;
use crate::error::{LlmError, Result};
use crate::ollama::{DEFAULT_OLLAMA_URL, OllamaProvider};
use crate::openai::OpenAiProvider;
use crate::params::GenerationParams;
use crate::provider::{
    Completion, CompletionRequest, LlmProvider, Message, MessageContent, ResponseFormat, Role,
};
use crate::registry::{LlmModel, ModelId, ProviderKind, model_info};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::schema::{
    SimpleSchema, json_only_instruction, normalize_json_response, resolve_output_schema,
    schema_instruction, wrap_named_schema,
};

pub const DEFAULT_MAX_TOKENS: u32 = 100_000;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Vendor API keys. `Debug` never prints the values.
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub azure: Option<String>,
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
    pub deepseek: Option<String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |k: &Option<String>| k.as_ref().map(|_| "<redacted>");
        f.debug_struct("ApiKeys")
            .field("openai", &mask(&self.openai))
            .field("azure", &mask(&self.azure))
            .field("anthropic", &mask(&self.anthropic))
            .field("gemini", &mask(&self.gemini))
            .field("deepseek", &mask(&self.deepseek))
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AzureSettings {
    pub base_url: String,
    pub api_version: Option<String>,
}

/// Everything a [`Generator`] needs to reach the vendors.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub keys: ApiKeys,
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub gemini_base_url: Option<String>,
    pub deepseek_base_url: Option<String>,
    pub azure: AzureSettings,
    pub ollama_base_url: String,
    pub retry: RetryPolicy,
    /// Root for relative attachment paths.
    pub files_root: PathBuf,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            keys: ApiKeys::default(),
            openai_base_url: None,
            anthropic_base_url: None,
            gemini_base_url: None,
            deepseek_base_url: None,
            azure: AzureSettings::default(),
            ollama_base_url: DEFAULT_OLLAMA_URL.to_owned(),
            retry: RetryPolicy::default(),
            files_root: PathBuf::from("."),
        }
    }
}

/// A provider bound to the vendor-side model name it should be called with.
#[derive(Debug, Clone)]
pub struct SelectedProvider {
    pub provider: AnyProvider,
    /// Vendor model name, or the deployment name for Azure.
    pub model: String,
}

/// One `generate_text` call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_mode: bool,
    /// Ollama host override.
    pub api_base: Option<String>,
    /// Named attachment URLs or file paths, in insertion order.
    pub url_variables: Vec<(String, String)>,
    pub output_json_schema: Option<String>,
    pub output_schema: Option<SimpleSchema>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_mode: false,
            api_base: None,
            url_variables: Vec::new(),
            output_json_schema: None,
            output_schema: None,
        }
    }

    /// Build from validated user parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidRequest`] if the parameters are out of range.
    pub fn from_params(params: &GenerationParams, messages: Vec<Message>) -> Result<Self> {
        params.validate()?;
        Ok(Self::new(params.model.clone(), messages)
            .temperature(params.temperature)
            .max_tokens(params.max_tokens))
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    #[must_use]
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    #[must_use]
    pub fn url_variable(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.url_variables.push((name.into(), url.into()));
        self
    }

    #[must_use]
    pub fn output_json_schema(mut self, schema: impl Into<String>) -> Self {
        self.output_json_schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn output_schema(mut self, schema: SimpleSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

pub struct Generator {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("settings", &self.settings)
            .field("client", &"<reqwest::Client>")
            .finish()
    }
}

fn require_key(
    key: Option<&String>,
    provider: &'static str,
    env: &'static str,
) -> Result<String> {
    key.cloned()
        .ok_or(LlmError::MissingCredentials { provider, env })
}

impl Generator {
    #[must_use]
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: crate::http::default_client(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Choose the provider for a model identifier.
    ///
    /// Azure wins for `azure/` models and, when an Azure key is configured, for every
    /// model that is not `ollama/`. `api_base` overrides the Ollama host.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider prefix or a missing API key.
    pub fn select_provider(
        &self,
        model: &str,
        api_base: Option<&str>,
    ) -> Result<SelectedProvider> {
        let keys = &self.settings.keys;

        if model.starts_with("azure/") || (keys.azure.is_some() && !model.starts_with("ollama/")) {
            let key = require_key(keys.azure.as_ref(), "azure", "AZURE_OPENAI_API_KEY")?;
            let deployment = model.split_once('/').map_or(model, |(_, name)| name);
            let provider = AzureOpenAiProvider::new(
                key,
                &self.settings.azure.base_url,
                self.settings.azure.api_version.clone(),
            )
            .with_client(self.client.clone());
            return Ok(SelectedProvider {
                provider: AnyProvider::Azure(provider),
                model: deployment.to_owned(),
            });
        }

        let id = ModelId::parse(model)?;
        let provider = match id.provider {
            ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
                api_base.unwrap_or(&self.settings.ollama_base_url),
            )),
            ProviderKind::OpenAi => AnyProvider::OpenAi(
                OpenAiProvider::openai(
                    require_key(keys.openai.as_ref(), "openai", "OPENAI_API_KEY")?,
                    self.settings.openai_base_url.clone(),
                )
                .with_client(self.client.clone()),
            ),
            ProviderKind::Gemini => AnyProvider::OpenAi(
                OpenAiProvider::gemini(
                    require_key(keys.gemini.as_ref(), "gemini", "GEMINI_API_KEY")?,
                    self.settings.gemini_base_url.clone(),
                )
                .with_client(self.client.clone()),
            ),
            ProviderKind::DeepSeek => AnyProvider::OpenAi(
                OpenAiProvider::deepseek(
                    require_key(keys.deepseek.as_ref(), "deepseek", "DEEPSEEK_API_KEY")?,
                    self.settings.deepseek_base_url.clone(),
                )
                .with_client(self.client.clone()),
            ),
            ProviderKind::Anthropic => AnyProvider::Claude(
                ClaudeProvider::new(
                    require_key(keys.anthropic.as_ref(), "anthropic", "ANTHROPIC_API_KEY")?,
                    self.settings.anthropic_base_url.clone(),
                )
                .with_client(self.client.clone()),
            ),
            ProviderKind::AzureOpenAi => {
                return Err(LlmError::MissingCredentials {
                    provider: "azure",
                    env: "AZURE_OPENAI_API_KEY",
                });
            }
        };

        Ok(SelectedProvider {
            provider,
            model: id.name.to_owned(),
        })
    }

    /// Run one completion with retries against the provider selected for `model`.
    ///
    /// `request.model` is replaced with the vendor-side name.
    ///
    /// # Errors
    ///
    /// Returns the final provider error after retries, or a selection error.
    pub async fn complete(
        &self,
        model: &str,
        request: &CompletionRequest,
        api_base: Option<&str>,
    ) -> Result<Completion> {
        let selected = self
            .select_provider(model, api_base)
            .inspect_err(|e| tracing::error!(model, kind = e.kind(), "provider selection failed: {e}"))?;
        let provider = selected.provider;
        let mut request = request.clone();
        request.model = selected.model;

        tracing::info!(
            model,
            provider = provider.name(),
            vendor_model = %request.model,
            max_tokens = request.max_tokens,
            temperature = ?request.temperature,
            json = request.response_format.is_some(),
            messages = request.messages.len(),
            "LLM request"
        );

        let (provider, request) = (&provider, &request);
        retry_with_backoff(&self.settings.retry, provider.name(), move || {
            provider.complete(request)
        })
        .await
        .inspect_err(|e| {
            tracing::error!(
                model,
                provider = provider.name(),
                max_tokens = request.max_tokens,
                temperature = ?request.temperature,
                response_format = ?request.response_format,
                api_key = self.key_marker(provider.name()),
                kind = e.kind(),
                "LLM request failed: {e}"
            );
        })
    }

    fn key_marker(&self, provider: &str) -> &'static str {
        let keys = &self.settings.keys;
        let present = match provider {
            "openai" => keys.openai.is_some(),
            "azure" => keys.azure.is_some(),
            "anthropic" => keys.anthropic.is_some(),
            "gemini" => keys.gemini.is_some(),
            "deepseek" => keys.deepseek.is_some(),
            _ => false,
        };
        if present { "********" } else { "none" }
    }

    /// Generate text for a transcript, shaping the request to the model's
    /// capabilities and always returning a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is invalid, an attachment cannot be read, or
    /// the provider call fails after retries.
    pub async fn generate_text(&self, req: GenerateRequest) -> Result<String> {
        let info = model_info(&req.model);
        let supports_json = info.is_some_and(|m| m.constraints.supports_json_output);
        let mut request = base_request(&req, info);

        if supports_json && let Some(info) = info {
            let schema = resolve_output_schema(
                req.output_json_schema.as_deref(),
                req.output_schema.as_ref(),
            )?;
            let support = info.constraints.response_format;
            if support.accepts_schema() {
                request.response_format = Some(ResponseFormat::JsonSchema {
                    json_schema: wrap_named_schema(schema.json_schema),
                });
            } else if support.accepts_response_format() {
                request.response_format = Some(ResponseFormat::JsonObject);
                append_to_system(
                    &mut request.messages,
                    &schema_instruction(&schema.prompt_text()),
                );
            }
        }

        if req.json_mode && supports_json {
            if req.model.starts_with("ollama") {
                request
                    .response_format
                    .get_or_insert(ResponseFormat::JsonObject);
            } else if req.model.starts_with("gemini") && !req.url_variables.is_empty() {
                self.attach_url_variables(&mut request.messages, &req.url_variables)
                    .await?;
            } else {
                request
                    .messages
                    .insert(0, Message::system(json_only_instruction()));
            }
        }

        let completion = self
            .complete(&req.model, &request, req.api_base.as_deref())
            .await?;

        Ok(normalize_json_response(
            &completion.content,
            completion.provider_fields.as_ref(),
            supports_json,
        ))
    }

    /// Turn every user message into `[text, attachments...]`.
    async fn attach_url_variables(
        &self,
        messages: &mut [Message],
        url_variables: &[(String, String)],
    ) -> Result<()> {
        let mut attachments = Vec::with_capacity(url_variables.len());
        for (name, url) in url_variables {
            if url.is_empty() {
                continue;
            }
            tracing::debug!(variable = %name, "adding attachment");
            attachments.push(attachment_part(&self.settings.files_root, url).await?);
        }

        for msg in messages.iter_mut().filter(|m| m.role == Role::User) {
            let content = std::mem::replace(&mut msg.content, MessageContent::Parts(Vec::new()));
            let mut parts = content.into_parts();
            parts.extend(attachments.iter().cloned());
            msg.content = MessageContent::Parts(parts);
        }
        Ok(())
    }
}

/// Clamp the caller's budget and temperature to what the model accepts.
fn base_request(req: &GenerateRequest, info: Option<&LlmModel>) -> CompletionRequest {
    let mut request = CompletionRequest::new(req.model.clone(), req.messages.clone(), req.max_tokens);
    request.temperature = Some(req.temperature);
    if let Some(info) = info {
        let c = &info.constraints;
        request.max_tokens = c.clamp_max_tokens(req.max_tokens);
        request.temperature = c
            .supports_temperature
            .then(|| c.clamp_temperature(req.temperature));
        request.max_completion_tokens = c.reasoning;
    }
    request
}

/// Append to the first system message, inserting one at the front if none exists.
fn append_to_system(messages: &mut Vec<Message>, suffix: &str) {
    if let Some(system) = messages.iter_mut().find(|m| m.role == Role::System) {
        system.content.append_text(suffix);
    } else {
        messages.insert(0, Message::system(suffix.trim_start()));
    }
}
