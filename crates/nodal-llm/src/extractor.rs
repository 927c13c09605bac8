use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::{LlmError, Result};
use crate::generate::{GenerateRequest, Generator};
use crate::provider::Message;

impl Generator {
    /// Run `generate_text` in JSON mode with a schema derived from `T` and decode the result.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails or the output does not match `T`.
    pub async fn generate_typed<T>(&self, mut req: GenerateRequest) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let mut schema = serde_json::to_value(schemars::schema_for!(T))?;
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
        }
        req.output_json_schema = Some(schema.to_string());
        req.json_mode = true;

        let text = self.generate_text(req).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("typed output did not match schema: {e}");
            LlmError::StructuredParse(format!("{e}: {text}"))
        })
    }
}

/// Pulls a typed value out of free text with one model call.
pub struct Extractor<'a> {
    generator: &'a Generator,
    model: String,
    preamble: Option<String>,
}

impl<'a> Extractor<'a> {
    pub fn new(generator: &'a Generator, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
            preamble: None,
        }
    }

    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// # Errors
    ///
    /// Returns an error if the provider fails or the response cannot be parsed.
    pub async fn extract<T>(&self, input: &str) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let mut messages = Vec::new();
        if let Some(ref preamble) = self.preamble {
            messages.push(Message::system(preamble.as_str()));
        }
        messages.push(Message::user(input));
        self.generator
            .generate_typed::<T>(GenerateRequest::new(self.model.clone(), messages))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::generate::{ApiKeys, ProviderSettings};
    use crate::retry::RetryPolicy;

    #[derive(Debug, serde::Deserialize, schemars::JsonSchema, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    async fn generator_replying(content: &str) -> (MockServer, Generator) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .mount(&server)
            .await;
        let generator = Generator::new(ProviderSettings {
            keys: ApiKeys {
                openai: Some("sk".into()),
                ..ApiKeys::default()
            },
            openai_base_url: Some(server.uri()),
            retry: RetryPolicy::none(),
            ..ProviderSettings::default()
        });
        (server, generator)
    }

    #[tokio::test]
    async fn extract_with_preamble() {
        let (server, generator) = generator_replying(r#"{"name": "Alice", "age": 30}"#).await;
        let person: Person = Extractor::new(&generator, "openai/gpt-4o")
            .with_preamble("Extract the person")
            .extract("Alice turned 30 today")
            .await
            .unwrap();
        assert_eq!(
            person,
            Person {
                name: "Alice".into(),
                age: 30
            }
        );

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let schema = &body["response_format"]["json_schema"];
        assert_eq!(schema["name"], "output");
        assert!(schema["schema"].get("$schema").is_none());
        assert_eq!(schema["schema"]["additionalProperties"], false);
        assert!(schema["schema"]["properties"].get("age").is_some());
        // JSON mode places the JSON-only instruction first, then the preamble
        assert_eq!(body["messages"][1]["content"], "Extract the person");
    }

    #[tokio::test]
    async fn extract_without_preamble() {
        let (_server, generator) = generator_replying(r#"{"name": "Bob", "age": 4}"#).await;
        let person: Person = Extractor::new(&generator, "openai/gpt-4o-mini")
            .extract("Bob is four")
            .await
            .unwrap();
        assert_eq!(person.age, 4);
    }

    #[tokio::test]
    async fn mismatched_output_is_structured_parse_error() {
        let (_server, generator) = generator_replying(r#"{"name": "Eve"}"#).await;
        let err = Extractor::new(&generator, "openai/gpt-4o")
            .extract::<Person>("Eve")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::StructuredParse(_)));
    }
}
