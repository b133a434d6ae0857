use crate::core::prompt::GenerationRequest;
use crate::core::types::{GenerationParams, StreamEvent};
use crate::providers::error::ProviderError;
use crate::providers::types::ModelId;

use super::types::{ChatRequest, ChatStreamEvent};

const ERROR_FINISH_PREFIX: &str = "ERROR";

pub fn to_api_request(
    model: &ModelId,
    request: &GenerationRequest,
    params: &GenerationParams,
) -> ChatRequest {
    ChatRequest {
        message: request.text().to_string(),
        model: params
            .model
            .clone()
            .unwrap_or_else(|| model.as_str().to_string()),
        temperature: params.temperature,
        prompt_truncation: params.prompt_truncation,
        connectors: params.connectors.clone(),
        stream: true,
    }
}

/// Decodes one response line. Unparseable and unknown lines are skipped; a
/// `stream-end` whose finish reason is an `ERROR*` value becomes an error.
pub fn parse_stream_line(line: &str) -> Option<Result<StreamEvent, ProviderError>> {
    let event: ChatStreamEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, line_len = line.len(), "Skipping unparseable stream line");
            return None;
        }
    };

    let event = match event {
        ChatStreamEvent::StreamStart { generation_id } => StreamEvent::StreamStart { generation_id },
        ChatStreamEvent::SearchQueriesGeneration { search_queries } => StreamEvent::SearchQueries {
            queries: search_queries.into_iter().map(|q| q.text).collect(),
        },
        ChatStreamEvent::SearchResults { documents } => StreamEvent::SearchResults {
            documents: documents.map_or(0, |d| d.len()),
        },
        ChatStreamEvent::TextGeneration { text } => StreamEvent::TextGeneration { text },
        ChatStreamEvent::CitationGeneration { citations } => StreamEvent::Citation {
            count: citations.len(),
        },
        ChatStreamEvent::StreamEnd { finish_reason } => {
            if let Some(reason) = finish_reason
                .as_deref()
                .filter(|r| r.starts_with(ERROR_FINISH_PREFIX))
            {
                return Some(Err(ProviderError::StreamError(format!(
                    "generation ended with {reason}"
                ))));
            }
            StreamEvent::StreamEnd { finish_reason }
        }
        ChatStreamEvent::Unknown => return None,
    };

    Some(Ok(event))
}
