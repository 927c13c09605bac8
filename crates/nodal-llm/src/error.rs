#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("authentication failed for {provider}: {message}")]
    Authentication { provider: String, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("unknown provider prefix in model id: {0}")]
    UnknownProvider(String),

    #[error("missing API key for {provider} (set {env})")]
    MissingCredentials {
        provider: &'static str,
        env: &'static str,
    },

    #[error("Ollama request failed: {0}")]
    Ollama(String),

    #[error("document conversion failed: {0}")]
    Document(#[from] nodal_docs::DocumentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("structured output parse failed: {0}")]
    StructuredParse(String),
}

impl LlmError {
    /// Whether a failed call may succeed when repeated.
    ///
    /// Credentials, request validation and rate limits are surfaced immediately;
    /// transport failures, server errors and malformed bodies are retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Authentication { .. }
                | Self::InvalidRequest(_)
                | Self::RateLimited { .. }
                | Self::UnknownProvider(_)
                | Self::MissingCredentials { .. }
                | Self::Document(_)
                | Self::Io(_)
                | Self::StructuredParse(_)
        )
    }

    /// Short variant label for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Authentication { .. } => "authentication",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api",
            Self::EmptyResponse { .. } => "empty_response",
            Self::UnknownProvider(_) => "unknown_provider",
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::Ollama(_) => "ollama",
            Self::Document(_) => "document",
            Self::Io(_) => "io",
            Self::StructuredParse(_) => "structured_parse",
        }
    }

    /// Map a non-success HTTP status to an error, keeping the response body as message.
    pub(crate) fn from_status(provider: &str, status: reqwest::StatusCode, body: String) -> Self {
        let provider = provider.to_owned();
        match status.as_u16() {
            401 | 403 => Self::Authentication {
                provider,
                message: body,
            },
            400 | 404 | 422 => Self::InvalidRequest(format!("{provider}: {body}")),
            429 => Self::RateLimited { provider },
            code => Self::Api {
                provider,
                status: code,
                message: body,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
