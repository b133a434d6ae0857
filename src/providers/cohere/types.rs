use serde::{Deserialize, Serialize};

use crate::core::types::{Connector, PromptTruncation};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub temperature: f32,
    pub prompt_truncation: PromptTruncation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connectors: Vec<Connector>,
    pub stream: bool,
}

/// One line of the `/v1/chat` streaming response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event_type", rename_all = "kebab-case")]
pub enum ChatStreamEvent {
    StreamStart {
        #[serde(default)]
        generation_id: Option<String>,
    },
    SearchQueriesGeneration {
        #[serde(default)]
        search_queries: Vec<SearchQuery>,
    },
    SearchResults {
        #[serde(default)]
        documents: Option<Vec<serde_json::Value>>,
    },
    TextGeneration {
        text: String,
    },
    CitationGeneration {
        #[serde(default)]
        citations: Vec<serde_json::Value>,
    },
    StreamEnd {
        #[serde(default)]
        finish_reason: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub text: String,
}
