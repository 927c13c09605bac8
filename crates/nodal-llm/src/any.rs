use crate::azure::AzureOpenAiProvider;
use crate::claude::ClaudeProvider;
use crate::error::Result;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{Completion, CompletionRequest, LlmProvider};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given closure for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::OpenAi($p) => $expr,
            AnyProvider::Azure($p) => $expr,
            AnyProvider::Claude($p) => $expr,
            AnyProvider::Ollama($p) => $expr,
        }
    };
}

/// Concrete provider chosen for one call.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    /// OpenAI, DeepSeek and Gemini (OpenAI-compatible endpoints).
    OpenAi(OpenAiProvider),
    Azure(AzureOpenAiProvider),
    Claude(ClaudeProvider),
    Ollama(OllamaProvider),
}

impl LlmProvider for AnyProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        delegate_provider!(self, |p| p.complete(request).await)
    }

    fn name(&self) -> &'static str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_delegates() {
        let cases = [
            (AnyProvider::OpenAi(OpenAiProvider::deepseek("k".into(), None)), "deepseek"),
            (
                AnyProvider::Azure(AzureOpenAiProvider::new("k".into(), "https://r", None)),
                "azure",
            ),
            (AnyProvider::Claude(ClaudeProvider::new("k".into(), None)), "anthropic"),
            (AnyProvider::Ollama(OllamaProvider::default()), "ollama"),
        ];
        for (provider, name) in cases {
            assert_eq!(provider.name(), name);
        }
    }

    #[test]
    fn debug_never_shows_keys() {
        let p = AnyProvider::Claude(ClaudeProvider::new("very-secret".into(), None));
        assert!(!format!("{p:?}").contains("very-secret"));
    }
}
