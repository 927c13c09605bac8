//! Provider-agnostic LLM text generation.
//!
//! [`Generator`] picks a vendor client from the model identifier, shapes the request
//! to the model's capabilities (see [`registry`]), retries transient failures and
//! always hands back a JSON document.

pub mod any;
pub mod attachments;
pub mod azure;
pub mod claude;
pub mod error;
pub mod extractor;
pub mod generate;
pub mod http;
pub mod messages;
pub mod ollama;
pub mod openai;
pub mod params;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod schema;

pub use error::LlmError;
pub use extractor::Extractor;
pub use generate::{ApiKeys, AzureSettings, GenerateRequest, Generator, ProviderSettings};
pub use messages::{FewShotExample, create_messages, create_messages_with_images};
pub use params::GenerationParams;
pub use provider::{LlmProvider, Message, Role};
pub use registry::{LlmModel, ProviderKind, all_models, model_info};
pub use retry::RetryPolicy;
