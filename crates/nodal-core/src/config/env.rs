use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_generation();
        self.apply_env_overrides_endpoints();
        self.apply_env_overrides_retry();
    }

    fn apply_env_overrides_generation(&mut self) {
        if let Ok(v) = std::env::var("NODAL_MODEL") {
            self.generation.model = v;
        }
        if let Ok(v) = std::env::var("NODAL_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.generation.max_tokens = n;
        }
        if let Ok(v) = std::env::var("NODAL_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.generation.temperature = t;
        }
        if let Ok(v) = std::env::var("NODAL_FILES_ROOT") {
            self.files.root = PathBuf::from(v);
        }
    }

    fn apply_env_overrides_endpoints(&mut self) {
        if let Ok(v) = std::env::var("OPENAI_API_BASE") {
            self.llm.openai_base_url = Some(v);
        }
        if let Ok(v) = std::env::var("NODAL_ANTHROPIC_BASE_URL") {
            self.llm.anthropic_base_url = Some(v);
        }
        if let Ok(v) = std::env::var("NODAL_GEMINI_BASE_URL") {
            self.llm.gemini_base_url = Some(v);
        }
        if let Ok(v) = std::env::var("NODAL_DEEPSEEK_BASE_URL") {
            self.llm.deepseek_base_url = Some(v);
        }
        if let Ok(v) = std::env::var("AZURE_OPENAI_API_BASE") {
            self.azure.base_url = v;
        }
        if let Ok(v) = std::env::var("AZURE_OPENAI_API_VERSION") {
            self.azure.api_version = Some(v);
        }
        if let Ok(v) = std::env::var("OLLAMA_BASE_URL") {
            self.ollama.base_url = v;
        }
    }

    fn apply_env_overrides_retry(&mut self) {
        if let Ok(v) = std::env::var("NODAL_RETRY_MAX_ATTEMPTS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.retry.max_attempts = n;
        }
        if let Ok(v) = std::env::var("NODAL_RETRY_MIN_WAIT_SECS")
            && let Ok(n) = v.parse::<u64>()
        {
            self.retry.min_wait_secs = n;
        }
        if let Ok(v) = std::env::var("NODAL_RETRY_MAX_WAIT_SECS")
            && let Ok(n) = v.parse::<u64>()
        {
            self.retry.max_wait_secs = n;
        }
    }
}
