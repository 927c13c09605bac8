use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LlmError, Result};
use crate::provider::{Completion, CompletionRequest, LlmProvider, Message, ResponseFormat};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Message keys that are part of the standard chat schema, not vendor extras.
const STANDARD_MESSAGE_KEYS: &[&str] = &[
    "role",
    "content",
    "refusal",
    "tool_calls",
    "function_call",
    "annotations",
    "audio",
];

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format.
///
/// OpenAI itself, DeepSeek and Gemini's compatibility endpoint differ only in
/// base URL and the name used in logs and errors.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    name: &'static str,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("name", &self.name)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(name: &'static str, api_key: String, mut base_url: String) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            name,
        }
    }

    #[must_use]
    pub fn openai(api_key: String, base_url: Option<String>) -> Self {
        Self::new(
            "openai",
            api_key,
            base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_owned()),
        )
    }

    #[must_use]
    pub fn deepseek(api_key: String, base_url: Option<String>) -> Self {
        Self::new(
            "deepseek",
            api_key,
            base_url.unwrap_or_else(|| DEEPSEEK_BASE_URL.to_owned()),
        )
    }

    #[must_use]
    pub fn gemini(api_key: String, base_url: Option<String>) -> Self {
        Self::new(
            "gemini",
            api_key,
            base_url.unwrap_or_else(|| GEMINI_BASE_URL.to_owned()),
        )
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = ChatRequest::from_request(request, true);
        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);
        execute_chat(self.name, builder).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a ResponseFormat>,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn from_request(request: &'a CompletionRequest, include_model: bool) -> Self {
        let (max_tokens, max_completion_tokens) = if request.max_completion_tokens {
            (None, Some(request.max_tokens))
        } else {
            (Some(request.max_tokens), None)
        };
        Self {
            model: include_model.then_some(request.model.as_str()),
            messages: &request.messages,
            max_tokens,
            max_completion_tokens,
            temperature: request.temperature,
            response_format: request.response_format.as_ref(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Send a prepared chat request and decode the first choice.
pub(crate) async fn execute_chat(
    provider: &'static str,
    builder: reqwest::RequestBuilder,
) -> Result<Completion> {
    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await.map_err(LlmError::Http)?;

    if !status.is_success() {
        tracing::error!("{provider} API error {status}: {text}");
        return Err(LlmError::from_status(provider, status, text));
    }

    parse_chat_response(provider, &text)
}

pub(crate) fn parse_chat_response(provider: &str, body: &str) -> Result<Completion> {
    let resp: ChatResponse = serde_json::from_str(body)?;
    let message = resp
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LlmError::EmptyResponse {
            provider: provider.to_owned(),
        })?;

    let content = message.content.ok_or_else(|| LlmError::EmptyResponse {
        provider: provider.to_owned(),
    })?;

    let extra: Map<String, Value> = message
        .extra
        .into_iter()
        .filter(|(k, v)| !v.is_null() && !STANDARD_MESSAGE_KEYS.contains(&k.as_str()))
        .collect();

    Ok(Completion {
        content,
        provider_fields: (!extra.is_empty()).then_some(extra),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::provider::{ContentPart, Role};

    fn request() -> CompletionRequest {
        CompletionRequest::new("gpt-4o", vec![Message::system("sys"), Message::user("hi")], 256)
            .with_temperature(0.5)
    }

    fn ok_body(message: Value) -> Value {
        json!({"id": "x", "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]})
    }

    #[test]
    fn constructors_pick_vendor_base_urls() {
        assert_eq!(OpenAiProvider::openai("k".into(), None).base_url(), OPENAI_BASE_URL);
        assert_eq!(OpenAiProvider::deepseek("k".into(), None).base_url(), DEEPSEEK_BASE_URL);
        assert_eq!(OpenAiProvider::gemini("k".into(), None).base_url(), GEMINI_BASE_URL);
        let custom = OpenAiProvider::openai("k".into(), Some("http://proxy/v1///".into()));
        assert_eq!(custom.base_url(), "http://proxy/v1");
        assert_eq!(OpenAiProvider::gemini("k".into(), None).name(), "gemini");
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", OpenAiProvider::openai("sk-secret".into(), None));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn request_body_uses_max_tokens() {
        let req = request().with_response_format(ResponseFormat::JsonObject);
        let body = serde_json::to_value(ChatRequest::from_request(&req, true)).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 256);
        assert!(body.get("max_completion_tokens").is_none());
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn reasoning_request_body_uses_max_completion_tokens() {
        let mut req = CompletionRequest::new("o1", vec![Message::user("q")], 1000);
        req.max_completion_tokens = true;
        let body = serde_json::to_value(ChatRequest::from_request(&req, false)).unwrap();
        assert!(body.get("model").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
        assert_eq!(body["max_completion_tokens"], 1000);
    }

    #[test]
    fn parse_surfaces_vendor_fields() {
        let body = ok_body(json!({
            "role": "assistant",
            "content": "42",
            "reasoning_content": "because",
            "refusal": null,
        }))
        .to_string();
        let completion = parse_chat_response("deepseek", &body).unwrap();
        assert_eq!(completion.content, "42");
        let fields = completion.provider_fields.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["reasoning_content"], "because");
    }

    #[test]
    fn parse_plain_message_has_no_fields() {
        let body = ok_body(json!({"role": "assistant", "content": "ok"})).to_string();
        assert_eq!(parse_chat_response("openai", &body).unwrap(), Completion::text("ok"));
    }

    #[test]
    fn parse_empty_choices() {
        let err = parse_chat_response("openai", r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
        let err = parse_chat_response("openai", &ok_body(json!({"role": "assistant"})).to_string())
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn complete_posts_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o", "max_tokens": 256})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body(json!({"role": "assistant", "content": "hello"}))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::openai("sk-test".into(), Some(format!("{}/v1", server.uri())));
        let completion = provider.complete(&request()).await.unwrap();
        assert_eq!(completion.content, "hello");
    }

    #[tokio::test]
    async fn complete_sends_image_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user", "content": [
                    {"type": "text", "text": "what"},
                    {"type": "image_url", "image_url": {"url": "https://x/y.png"}}
                ]}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body(json!({"role": "assistant", "content": "a cat"}))),
            )
            .mount(&server)
            .await;

        let provider = OpenAiProvider::gemini("g".into(), Some(server.uri()));
        let req = CompletionRequest::new(
            "gemini-1.5-pro",
            vec![Message::with_parts(
                Role::User,
                vec![ContentPart::text("what"), ContentPart::image_url("https://x/y.png")],
            )],
            100,
        );
        assert_eq!(provider.complete(&req).await.unwrap().content, "a cat");
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        for (status, expected) in [
            (401, "authentication"),
            (403, "authentication"),
            (400, "invalid_request"),
            (404, "invalid_request"),
            (429, "rate_limited"),
            (500, "api"),
            (503, "api"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;
            let provider = OpenAiProvider::openai("k".into(), Some(server.uri()));
            let err = provider.complete(&request()).await.unwrap_err();
            assert_eq!(err.kind(), expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        let provider = OpenAiProvider::openai("k".into(), Some(server.uri()));
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
        assert!(err.is_retryable());
    }
}
