use bytes::Bytes;
use futures::stream::Stream;

use super::lines::{LineDecoder, decode_stream};
use crate::providers::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

/// Server-sent events decoder. The OpenAI-style `[DONE]` sentinel is dropped.
#[derive(Debug, Default)]
pub struct SseParser {
    current_event_type: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current_event_type: None,
            data_lines: Vec::new(),
        }
    }

    pub fn parse_stream<S>(
        byte_stream: S,
    ) -> impl Stream<Item = Result<SseEvent, ProviderError>> + Send
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
    {
        decode_stream(byte_stream, Self::new())
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data_lines.is_empty() {
            self.current_event_type = None;
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(SseEvent {
            event_type: self.current_event_type.take(),
            data,
        })
    }
}

impl LineDecoder for SseParser {
    type Item = SseEvent;

    fn decode_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(event_type) = line.strip_prefix("event:") {
            self.current_event_type = Some(event_type.trim().to_string());
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            if data != "[DONE]" {
                self.data_lines.push(data.to_string());
            }
        }
        None
    }
}
