use async_trait::async_trait;
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;

use crate::core::generator::TextGenerator;
use crate::core::prompt::GenerationRequest;
use crate::core::types::{FragmentStream, GenerationParams, StreamEvent};
use crate::providers::error::ProviderError;

/// What the next `open_stream` call does.
#[derive(Debug)]
pub enum ScriptedReply {
    /// Opens, yields every fragment, then a `stream-end`.
    Stream(Vec<String>),
    /// Fails to open.
    Refuse(ProviderError),
    /// Opens, yields the fragments, then fails mid-response.
    FailAfter(Vec<String>, ProviderError),
    /// Opens, yields the fragments, then never produces anything again.
    Stalled(Vec<String>),
}

impl ScriptedReply {
    #[must_use]
    pub fn stream<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream(fragments.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::Refuse(ProviderError::server(503, "Service unavailable"))
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Refuse(ProviderError::auth_with_hint(
            "invalid api token",
            "Check your API key",
        ))
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<ScriptedReply>,
    attempts: Vec<Instant>,
    requests: Vec<String>,
    params: Vec<GenerationParams>,
}

/// In-process generator that replays queued replies, one per establishment
/// attempt, and records when each attempt happened.
#[derive(Clone)]
pub struct ScriptedGenerator {
    name: String,
    model: String,
    script: Arc<Mutex<Script>>,
}

impl ScriptedGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            model: "scripted-model".to_string(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    #[must_use]
    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.script.lock().replies.push_back(reply);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.script.lock().attempts.len()
    }

    /// Instants of every `open_stream` call, in order.
    #[must_use]
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.script.lock().attempts.clone()
    }

    /// Rendered prompt text of every `open_stream` call.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.script.lock().requests.clone()
    }

    #[must_use]
    pub fn params(&self) -> Vec<GenerationParams> {
        self.script.lock().params.clone()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().replies.len()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedGenerator")
            .field("model", &self.model)
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

fn fragments(
    texts: Vec<String>,
) -> impl futures::Stream<Item = Result<StreamEvent, ProviderError>> + Send {
    stream::iter(texts.into_iter().map(|text| Ok(StreamEvent::text(text))))
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn open_stream(
        &self,
        request: &GenerationRequest,
        params: &GenerationParams,
    ) -> Result<FragmentStream, ProviderError> {
        let reply = {
            let mut script = self.script.lock();
            script.attempts.push(Instant::now());
            script.requests.push(request.text().to_string());
            script.params.push(params.clone());
            script.replies.pop_front()
        };

        match reply {
            None => Err(ProviderError::Configuration(
                "ScriptedGenerator: no replies queued".to_string(),
            )),
            Some(ScriptedReply::Refuse(err)) => Err(err),
            Some(ScriptedReply::Stream(texts)) => {
                let end = stream::once(async {
                    Ok(StreamEvent::StreamEnd {
                        finish_reason: Some("COMPLETE".to_string()),
                    })
                });
                Ok(fragments(texts).chain(end).boxed())
            }
            Some(ScriptedReply::FailAfter(texts, err)) => Ok(fragments(texts)
                .chain(stream::once(async move { Err(err) }))
                .boxed()),
            Some(ScriptedReply::Stalled(texts)) => {
                Ok(fragments(texts).chain(stream::pending()).boxed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::PromptBuilder;

    async fn collect(stream: FragmentStream) -> Vec<Result<StreamEvent, ProviderError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_replays_replies_in_order() {
        let generator = ScriptedGenerator::new()
            .with_reply(ScriptedReply::unavailable())
            .with_reply(ScriptedReply::stream(["Hi", " there"]));
        let request = PromptBuilder::new().build("", "hello");
        let params = GenerationParams::default();

        let first = generator.open_stream(&request, &params).await;
        assert!(matches!(first, Err(ProviderError::Server { status: 503, .. })));

        let events = collect(generator.open_stream(&request, &params).await.unwrap()).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].as_ref().unwrap(), &StreamEvent::text("Hi"));
        assert_eq!(events[1].as_ref().unwrap(), &StreamEvent::text(" there"));
        assert!(matches!(events[2], Ok(StreamEvent::StreamEnd { .. })));

        assert_eq!(generator.attempt_count(), 2);
        assert!(generator.requests()[0].contains("USER PROMPT:\nhello"));
    }

    #[tokio::test]
    async fn test_fail_after_yields_error_last() {
        let generator = ScriptedGenerator::new().with_reply(ScriptedReply::FailAfter(
            vec!["partial".to_string()],
            ProviderError::StreamError("connection reset".to_string()),
        ));
        let request = PromptBuilder::new().build("", "hello");

        let events = collect(
            generator
                .open_stream(&request, &GenerationParams::default())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(ProviderError::StreamError(_))));
    }

    #[tokio::test]
    async fn test_error_when_script_exhausted() {
        let generator = ScriptedGenerator::new();
        let request = PromptBuilder::new().build("", "hello");
        let result = generator
            .open_stream(&request, &GenerationParams::default())
            .await;
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
        assert_eq!(generator.attempt_count(), 1);
    }
}
