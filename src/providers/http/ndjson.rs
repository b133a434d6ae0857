use bytes::Bytes;
use futures::stream::Stream;

use super::lines::{LineDecoder, decode_stream};
use crate::providers::error::ProviderError;

/// Newline-delimited JSON decoder: every non-blank line is one JSON document.
/// Lines are handed on as text; typed parsing belongs to the provider.
#[derive(Debug, Default)]
pub struct NdjsonParser;

impl NdjsonParser {
    pub fn parse_stream<S>(
        byte_stream: S,
    ) -> impl Stream<Item = Result<String, ProviderError>> + Send
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
    {
        decode_stream(byte_stream, Self)
    }
}

impl LineDecoder for NdjsonParser {
    type Item = String;

    fn decode_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        (!line.is_empty()).then(|| line.to_string())
    }
}
