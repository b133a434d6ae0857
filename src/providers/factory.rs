use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::generator::TextGenerator;

use super::cohere::CohereProvider;
use super::error::ProviderError;
use super::http::HttpConfig;
use super::openai::OpenAIProvider;
use super::types::ApiKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Cohere,
    #[serde(rename = "openai")]
    OpenAI,
}

impl ProviderKind {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cohere => "Cohere",
            Self::OpenAI => "OpenAI",
        }
    }

    #[must_use]
    pub const fn api_key_env(self) -> &'static str {
        match self {
            Self::Cohere => super::cohere::API_KEY_ENV,
            Self::OpenAI => super::openai::API_KEY_ENV,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cohere => f.write_str("cohere"),
            Self::OpenAI => f.write_str("openai"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cohere" => Ok(Self::Cohere),
            "openai" => Ok(Self::OpenAI),
            other => Err(ProviderError::Configuration(format!(
                "Unknown provider '{other}'. Expected 'cohere' or 'openai'."
            ))),
        }
    }
}

/// Everything needed to build a generator, gathered from config and flags.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub http: HttpConfig,
}

pub fn create_generator(settings: &ProviderSettings) -> Result<Arc<dyn TextGenerator>, ProviderError> {
    match settings.kind {
        ProviderKind::Cohere => create_cohere_generator(settings),
        ProviderKind::OpenAI => create_openai_generator(settings),
    }
}

fn create_cohere_generator(
    settings: &ProviderSettings,
) -> Result<Arc<dyn TextGenerator>, ProviderError> {
    let api_key = ApiKey::from_env_or_empty(settings.kind.api_key_env());
    if api_key.is_empty() {
        tracing::warn!(
            env = settings.kind.api_key_env(),
            "API key not set; the service will reject requests"
        );
    }

    let mut provider = CohereProvider::with_http_config(api_key, settings.http.clone())?;
    if let Some(model) = &settings.model {
        provider = provider.with_model(model);
    }
    if let Some(base_url) = &settings.base_url {
        provider = provider.with_base_url(base_url.as_str());
    }

    Ok(Arc::new(provider))
}

fn create_openai_generator(
    settings: &ProviderSettings,
) -> Result<Arc<dyn TextGenerator>, ProviderError> {
    let env_var = settings.kind.api_key_env();
    let api_key = ApiKey::from_env(env_var).map_err(|_| {
        ProviderError::Configuration(format!(
            "API key not found. Set {env_var} environment variable for {} provider.",
            settings.kind.display_name()
        ))
    })?;

    let mut provider = OpenAIProvider::with_http_config(api_key, settings.http.clone())?;
    if let Some(model) = &settings.model {
        provider = provider.with_model(model);
    }
    if let Some(base_url) = &settings.base_url {
        provider = provider.with_base_url(base_url.as_str());
    }

    Ok(Arc::new(provider))
}
