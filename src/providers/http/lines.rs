use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;

use crate::providers::error::ProviderError;

/// Splits a byte stream into text lines. Bytes are buffered until a newline
/// arrives, so a multi-byte character split across two network chunks is
/// decoded intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Returns every complete line in `chunk`, without the line terminator.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(text.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Takes whatever follows the last newline once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }
}

/// Something that turns lines of a response body into items.
pub trait LineDecoder: Send + 'static {
    type Item: Send + 'static;

    fn decode_line(&mut self, line: &str) -> Option<Self::Item>;

    /// Called once after the body ends, for formats that buffer across lines.
    fn finish(&mut self) -> Option<Self::Item> {
        None
    }
}

/// Drives `decoder` over a response body. A transport error is yielded once
/// and ends the stream.
pub fn decode_stream<S, D>(
    byte_stream: S,
    decoder: D,
) -> impl Stream<Item = Result<D::Item, ProviderError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
    D: LineDecoder,
{
    struct State<S, D: LineDecoder> {
        bytes: S,
        lines: LineBuffer,
        decoder: D,
        ready: VecDeque<D::Item>,
        done: bool,
    }

    let state = State {
        bytes: byte_stream,
        lines: LineBuffer::new(),
        decoder,
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.ready.pop_front() {
                return Some((Ok(item), st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    for line in st.lines.push(&chunk) {
                        if let Some(item) = st.decoder.decode_line(&line) {
                            st.ready.push_back(item);
                        }
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(ProviderError::StreamError(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    if let Some(line) = st.lines.finish()
                        && let Some(item) = st.decoder.decode_line(&line)
                    {
                        st.ready.push_back(item);
                    }
                    if let Some(item) = st.decoder.finish() {
                        st.ready.push_back(item);
                    }
                }
            }
        }
    })
}
