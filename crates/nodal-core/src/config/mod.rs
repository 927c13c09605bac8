mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::Context;
use nodal_llm::{ApiKeys, AzureSettings, ProviderSettings};

use crate::vault::{Secret, VaultProvider};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// A `.env` file in the working directory is loaded first. Falls back to
    /// defaults when the config file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if let Ok(env_path) = dotenvy::dotenv() {
            tracing::debug!(path = %env_path.display(), "loaded .env");
        }

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve vendor API keys through the vault. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        async fn fetch(vault: &dyn VaultProvider, key: &str) -> anyhow::Result<Option<Secret>> {
            Ok(vault
                .get_secret(key)
                .await
                .with_context(|| format!("failed to read {key} from vault"))?
                .filter(|v| !v.trim().is_empty())
                .map(Secret::new))
        }

        self.secrets.openai_api_key = fetch(vault, OPENAI_API_KEY).await?;
        self.secrets.azure_api_key = fetch(vault, AZURE_OPENAI_API_KEY).await?;
        self.secrets.anthropic_api_key = fetch(vault, ANTHROPIC_API_KEY).await?;
        self.secrets.gemini_api_key = fetch(vault, GEMINI_API_KEY).await?;
        self.secrets.deepseek_api_key = fetch(vault, DEEPSEEK_API_KEY).await?;
        Ok(())
    }

    /// Settings for a [`nodal_llm::Generator`] built from this config and its secrets.
    #[must_use]
    pub fn provider_settings(&self) -> ProviderSettings {
        let expose = |s: &Option<Secret>| s.as_ref().map(|s| s.expose().to_owned());
        ProviderSettings {
            keys: ApiKeys {
                openai: expose(&self.secrets.openai_api_key),
                azure: expose(&self.secrets.azure_api_key),
                anthropic: expose(&self.secrets.anthropic_api_key),
                gemini: expose(&self.secrets.gemini_api_key),
                deepseek: expose(&self.secrets.deepseek_api_key),
            },
            openai_base_url: self.llm.openai_base_url.clone(),
            anthropic_base_url: self.llm.anthropic_base_url.clone(),
            gemini_base_url: self.llm.gemini_base_url.clone(),
            deepseek_base_url: self.llm.deepseek_base_url.clone(),
            azure: AzureSettings {
                base_url: self.azure.base_url.clone(),
                api_version: self.azure.api_version.clone(),
            },
            ollama_base_url: self.ollama.base_url.clone(),
            retry: self.retry,
            files_root: self.files.root.clone(),
        }
    }
}
