use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::provider::{
    Completion, CompletionRequest, ContentPart, LlmProvider, Message, MessageContent, Role,
};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for ClaudeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ClaudeProvider {
    #[must_use]
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url
            .as_deref()
            .unwrap_or(ANTHROPIC_BASE_URL)
            .trim_end_matches('/')
            .to_owned();
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl LlmProvider for ClaudeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let (system, messages) = split_messages(&request.messages);
        let body = RequestBody {
            model: &request.model,
            max_tokens: request.max_tokens,
            system,
            messages,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("Claude API error {status}: {text}");
            return Err(LlmError::from_status("anthropic", status, text));
        }

        let resp: ApiResponse = serde_json::from_str(&text)?;
        let content: String = resp
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: "anthropic".into(),
            });
        }
        Ok(Completion::text(content))
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

/// Hoist system messages into the top-level `system` field; the rest become turns.
fn split_messages(messages: &[Message]) -> (Option<String>, Vec<ApiMessage>) {
    let mut system_parts = Vec::new();
    let mut chat = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(msg.content.text()),
            Role::User | Role::Assistant => chat.push(ApiMessage {
                role: msg.role.as_str(),
                content: convert_content(&msg.content),
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    (system, chat)
}

fn convert_content(content: &MessageContent) -> Vec<ContentBlock> {
    match content {
        MessageContent::Text(text) => vec![ContentBlock::Text { text: text.clone() }],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => ContentBlock::Text { text: text.clone() },
                ContentPart::ImageUrl { image_url } => ContentBlock::Image {
                    source: image_source(&image_url.url),
                },
            })
            .collect(),
    }
}

fn image_source(url: &str) -> ImageSource {
    if let Some(rest) = url.strip_prefix("data:")
        && let Some((meta, data)) = rest.split_once(',')
        && let Some(media_type) = meta.strip_suffix(";base64")
    {
        return ImageSource::Base64 {
            media_type: media_type.to_owned(),
            data: data.to_owned(),
        };
    }
    ImageSource::Url {
        url: url.to_owned(),
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Debug, PartialEq)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}
