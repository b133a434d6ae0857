use std::fs;

use crate::config::AppConfig;
use crate::core::relay::StreamingRelay;
use crate::core::{RelayError, Result};
use crate::providers::factory::create_generator;

use super::Cli;

/// Layers command-line flags over the loaded configuration.
#[must_use]
pub fn apply_overrides(cli: &Cli, mut config: AppConfig) -> AppConfig {
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = temperature;
    }
    if let Some(truncation) = cli.truncation {
        config.prompt_truncation = truncation;
    }
    if cli.no_web_search {
        config.web_search = false;
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }
    if cli.no_retry {
        config.max_attempts = 1;
    } else if let Some(attempts) = cli.max_attempts {
        config.max_attempts = attempts;
    }
    config
}

pub fn create_relay(config: &AppConfig) -> Result<StreamingRelay> {
    config
        .validate()
        .map_err(|e| RelayError::Config(e.to_string()))?;

    let generator = create_generator(&config.provider_settings())?;

    tracing::debug!(
        provider = %config.provider,
        model = generator.model(),
        retry = config.retry_policy().is_some(),
        "Relay ready"
    );

    Ok(StreamingRelay::with_config(generator, config.relay_config()))
}

/// Context for one-shot mode: the inline flag, the file, or nothing.
pub fn load_context(cli: &Cli) -> Result<String> {
    if let Some(context) = &cli.context {
        return Ok(context.clone());
    }
    match &cli.context_file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok(String::new()),
    }
}
