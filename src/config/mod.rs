use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use crate::core::relay::{RelayConfig, RetryPolicy};
use crate::core::types::{DEFAULT_TEMPERATURE, GenerationParams, PromptTruncation};
use crate::providers::factory::{ProviderKind, ProviderSettings};
use crate::providers::http::HttpConfig;

const APP_DIR: &str = "chatrelay";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "CHATRELAY";
/// Overrides the platform config directory.
pub const CONFIG_DIR_ENV: &str = "CHATRELAY_CONFIG_DIR";

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Config file already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Config directory not found")]
    NoConfigDir,
}

pub fn get_config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|h| h.join("Library/Application Support").join(APP_DIR))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .map(|a| a.join(APP_DIR))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .map(|c| c.join(APP_DIR))
    }
}

/// Settings from `config.toml` and `CHATRELAY_*` variables. Command-line
/// flags are applied on top by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub temperature: f32,
    pub prompt_truncation: PromptTruncation,
    pub web_search: bool,
    /// Establishment attempts per reply; `1` disables retrying.
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            prompt_truncation: PromptTruncation::default(),
            web_search: true,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            base_url: None,
            request_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Loads from the default location, falling back to defaults with a
    /// warning when the file or environment is malformed.
    #[must_use]
    pub fn load() -> Self {
        Self::try_load(Self::get_config_path().as_deref()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default configuration");
            Self::default()
        })
    }

    pub fn try_load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        get_config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn init_default() -> ConfigResult<PathBuf> {
        let path = Self::get_config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::init_at(&path)?;
        Ok(path)
    }

    /// Writes the commented template to `path`, refusing to overwrite.
    pub fn init_at(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        fs::write(path, include_str!("config.template.toml"))?;
        Ok(())
    }

    #[must_use]
    pub fn generation_params(&self) -> GenerationParams {
        let mut params = GenerationParams::default()
            .with_temperature(self.temperature)
            .with_prompt_truncation(self.prompt_truncation);
        if let Some(model) = &self.model {
            params = params.with_model(model.as_str());
        }
        if !self.web_search {
            params = params.without_connectors();
        }
        params
    }

    #[must_use]
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        (self.max_attempts > 1).then(|| {
            RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.retry_base_delay_ms),
            )
        })
    }

    #[must_use]
    pub fn relay_config(&self) -> RelayConfig {
        let config = RelayConfig::default().with_params(self.generation_params());
        match self.retry_policy() {
            Some(policy) => config.with_retry(policy),
            None => config,
        }
    }

    #[must_use]
    pub fn provider_settings(&self) -> ProviderSettings {
        let mut http = HttpConfig::default();
        if let Some(secs) = self.request_timeout_secs {
            http = http.with_read_timeout(Duration::from_secs(secs));
        }

        ProviderSettings {
            kind: self.provider,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            http,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.provider, ProviderKind::Cohere);
        assert!(config.web_search);
        assert_eq!(
            config.retry_policy(),
            Some(RetryPolicy::new(3, Duration::from_secs(1)))
        );

        let params = config.generation_params();
        assert_eq!(params, GenerationParams::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
provider = "openai"
model = "gpt-4o"
temperature = 0.2
prompt_truncation = "OFF"
web_search = false
max_attempts = 1
"#,
        )
        .unwrap();

        let config = AppConfig::try_load(Some(&path)).unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAI);
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.prompt_truncation, PromptTruncation::Off);
        assert!(config.retry_policy().is_none());
        assert_eq!(config.retry_base_delay_ms, 1000);

        let params = config.generation_params();
        assert_eq!(params.model.as_deref(), Some("gpt-4o"));
        assert!(params.connectors.is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::try_load(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(config.max_attempts, AppConfig::default().max_attempts);
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let config = AppConfig {
            max_attempts: 0,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = AppConfig {
            temperature: -1.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_init_writes_parseable_template_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chatrelay").join("config.toml");

        AppConfig::init_at(&path).unwrap();
        assert!(AppConfig::try_load(Some(&path)).is_ok());

        assert!(matches!(
            AppConfig::init_at(&path),
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
