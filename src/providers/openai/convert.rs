use crate::core::prompt::GenerationRequest;
use crate::core::types::{GenerationParams, PromptTruncation, StreamEvent};
use crate::providers::error::ProviderError;
use crate::providers::types::ModelId;

use super::types::{ChatCompletionChunk, ChatCompletionRequest, ChatMessage};

pub fn to_api_request(
    model: &ModelId,
    request: &GenerationRequest,
    params: &GenerationParams,
) -> ChatCompletionRequest {
    if params.prompt_truncation != PromptTruncation::Auto || !params.connectors.is_empty() {
        tracing::debug!(
            truncation = ?params.prompt_truncation,
            connectors = params.connectors.len(),
            "Chat completions ignore truncation policy and connectors"
        );
    }

    ChatCompletionRequest {
        model: params
            .model
            .clone()
            .unwrap_or_else(|| model.as_str().to_string()),
        messages: vec![ChatMessage {
            role: "user",
            content: request.text().to_string(),
        }],
        temperature: params.temperature,
        stream: true,
    }
}

/// Decodes one SSE `data:` payload into zero or more events.
pub fn parse_chunk(data: &str) -> Vec<Result<StreamEvent, ProviderError>> {
    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping unparseable completion chunk");
            return Vec::new();
        }
    };

    if let Some(error) = chunk.error {
        return vec![Err(ProviderError::StreamError(error.message))];
    }

    let mut events = Vec::new();
    for choice in chunk.choices {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            events.push(Ok(StreamEvent::TextGeneration { text }));
        }
        if let Some(reason) = choice.finish_reason {
            events.push(Ok(StreamEvent::StreamEnd {
                finish_reason: Some(reason),
            }));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::PromptBuilder;

    #[test]
    fn test_request_is_single_user_message() {
        let request = PromptBuilder::new().build("notes", "Summarise");
        let api = to_api_request(
            &ModelId::from("gpt-4o-mini"),
            &request,
            &GenerationParams::default(),
        );

        assert_eq!(api.model, "gpt-4o-mini");
        assert_eq!(api.messages.len(), 1);
        assert_eq!(api.messages[0].role, "user");
        assert_eq!(api.messages[0].content, request.text());
        assert!(api.stream);
    }

    #[test]
    fn test_parse_content_delta() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#;
        let events = parse_chunk(data);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &StreamEvent::text("Hi"));
    }

    #[test]
    fn test_parse_role_only_first_chunk_yields_nothing() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#;
        assert!(parse_chunk(data).is_empty());
    }

    #[test]
    fn test_parse_finish_reason() {
        let data = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        let events = parse_chunk(data);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::StreamEnd {
                finish_reason: Some("stop".into())
            }
        );
    }

    #[test]
    fn test_inline_error_payload() {
        let data = r#"{"error":{"message":"overloaded"}}"#;
        let events = parse_chunk(data);
        assert!(matches!(&events[0], Err(ProviderError::StreamError(m)) if m == "overloaded"));
    }
}
