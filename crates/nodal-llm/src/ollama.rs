use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::images::Image as OllamaImage;
use ollama_rs::generation::parameters::FormatType;
use ollama_rs::models::ModelOptions;

use crate::error::{LlmError, Result};
use crate::provider::{
    Completion, CompletionRequest, ContentPart, LlmProvider, Message, MessageContent, Role,
};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Locally hosted models served through the Ollama chat endpoint.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    base_url: String,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(request: &CompletionRequest) -> ChatMessageRequest {
        let model = request
            .model
            .strip_prefix("ollama/")
            .unwrap_or(&request.model)
            .to_owned();
        let messages = request.messages.iter().map(convert_message).collect();

        let mut options =
            ModelOptions::default().num_predict(i32::try_from(request.max_tokens).unwrap_or(i32::MAX));
        if let Some(t) = request.temperature {
            options = options.temperature(t);
        }

        let mut chat = ChatMessageRequest::new(model, messages).options(options);
        if request.response_format.is_some() {
            chat = chat.format(FormatType::Json);
        }
        chat
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        tracing::debug!(host = %self.base_url, model = %request.model, "Ollama chat request");
        let response = self
            .client
            .send_chat_messages(Self::build_request(request))
            .await
            .map_err(|e| LlmError::Ollama(format!("chat request failed: {e}")))?;

        Ok(Completion::text(response.message.content))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

fn convert_message(msg: &Message) -> ChatMessage {
    let text = msg.content.text();
    let images: Vec<OllamaImage> = match &msg.content {
        MessageContent::Text(_) => Vec::new(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::ImageUrl { image_url } => inline_image(&image_url.url),
                ContentPart::Text { .. } => None,
            })
            .collect(),
    };

    match msg.role {
        Role::System => ChatMessage::system(text),
        Role::Assistant => ChatMessage::assistant(text),
        Role::User if images.is_empty() => ChatMessage::user(text),
        Role::User => ChatMessage::user(text).with_images(images),
    }
}

/// Ollama only takes inline base64 images; remote URLs are dropped.
fn inline_image(url: &str) -> Option<OllamaImage> {
    let data = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, data)| data);
    if data.is_none() {
        tracing::warn!("skipping non-inline image for Ollama: {url}");
    }
    data.map(|d| OllamaImage::from_base64(d.to_owned()))
}

pub(crate) fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}
