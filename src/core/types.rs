use serde::{Deserialize, Serialize};

use crate::providers::error::ProviderError;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const WEB_SEARCH_CONNECTOR: &str = "web-search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One bubble in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: text.into(),
        }
    }

    #[must_use]
    pub const fn is_bot(&self) -> bool {
        matches!(self.role, Role::Bot)
    }
}

/// How the vendor may shorten an over-long prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptTruncation {
    #[default]
    Auto,
    Off,
    AutoPreserveOrder,
}

impl std::str::FromStr for PromptTruncation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "off" => Ok(Self::Off),
            "auto_preserve_order" => Ok(Self::AutoPreserveOrder),
            other => Err(format!(
                "unknown truncation policy '{other}' (expected auto, off, auto_preserve_order)"
            )),
        }
    }
}

/// A retrieval or tool augmentation attached to a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
}

impl Connector {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[must_use]
    pub fn web_search() -> Self {
        Self::new(WEB_SEARCH_CONNECTOR)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Overrides the generator's default model when set.
    pub model: Option<String>,
    pub temperature: f32,
    pub prompt_truncation: PromptTruncation,
    pub connectors: Vec<Connector>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            prompt_truncation: PromptTruncation::Auto,
            connectors: vec![Connector::web_search()],
        }
    }
}

impl GenerationParams {
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub const fn with_prompt_truncation(mut self, policy: PromptTruncation) -> Self {
        self.prompt_truncation = policy;
        self
    }

    #[must_use]
    pub fn without_connectors(mut self) -> Self {
        self.connectors.clear();
        self
    }
}

/// One item of a generator's stream. Only `TextGeneration` carries answer
/// text; everything else is bookkeeping the relay logs and skips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    StreamStart { generation_id: Option<String> },
    TextGeneration { text: String },
    SearchQueries { queries: Vec<String> },
    SearchResults { documents: usize },
    Citation { count: usize },
    StreamEnd { finish_reason: Option<String> },
}

impl StreamEvent {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextGeneration { text: text.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StreamStart { .. } => "stream-start",
            Self::TextGeneration { .. } => "text-generation",
            Self::SearchQueries { .. } => "search-queries-generation",
            Self::SearchResults { .. } => "search-results",
            Self::Citation { .. } => "citation-generation",
            Self::StreamEnd { .. } => "stream-end",
        }
    }
}

pub type FragmentStream =
    futures::stream::BoxStream<'static, std::result::Result<StreamEvent, ProviderError>>;
