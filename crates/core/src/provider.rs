use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {provider_name}: pass one explicitly or set {env_var}")]
    MissingApiKey {
        provider_name: String,
        env_var: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Openai,
}

pub struct ProviderConfig {
    pub base_url: &'static str,
    pub image_model: &'static str,
    pub text_model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Gemini => ProviderConfig {
                base_url: "https://generativelanguage.googleapis.com/v1beta",
                image_model: "gemini-3-pro-image-preview",
                text_model: "gemini-3-pro-preview",
                env_var: "GEMINI_API_KEY",
            },
            Provider::Openai => ProviderConfig {
                base_url: "https://api.openai.com/v1",
                image_model: "gpt-5.1",
                text_model: "gpt-5.1",
                env_var: "OPENAI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Openai => "OpenAI",
        }
    }
}

/// Per-session provider choice. Nothing here is read from global state.
#[derive(Clone, Debug, Default)]
pub struct ProviderSettings {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub use_thinking: bool,
}

impl ProviderSettings {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.provider.config().base_url)
            .trim_end_matches('/')
            .to_string()
    }

    /// Explicit key first, then the provider's environment variable.
    pub fn api_key(&self) -> Result<String, ProviderError> {
        self.api_key_with(|var| std::env::var(var).ok())
    }

    fn api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, ProviderError> {
        let config = self.provider.config();
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| env(config.env_var).filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider_name: self.provider.name().to_string(),
                env_var: config.env_var.to_string(),
            })
    }
}
