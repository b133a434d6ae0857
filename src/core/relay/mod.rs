mod accumulator;
pub mod channel;
mod config;
mod retry;

use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;

use accumulator::Accumulator;
use channel::{ChannelReader, ChannelWriter};
use crate::core::error::{RelayError, Result};
use crate::core::generator::TextGenerator;
use crate::core::prompt::{GenerationRequest, PromptBuilder};
use crate::core::types::{FragmentStream, StreamEvent};

pub use channel::{Snapshot, SnapshotWatcher};
pub use config::RelayConfig;
pub use retry::RetryPolicy;

/// Turns `(context, prompt)` into a live stream of accumulated answer text.
///
/// Every call spawns one task that opens the generator's stream (retrying
/// establishment when a [`RetryPolicy`] is configured), appends each text
/// fragment to an accumulator and publishes the whole accumulator to the
/// returned [`StreamHandle`].
pub struct StreamingRelay {
    generator: Arc<dyn TextGenerator>,
    prompt_builder: PromptBuilder,
    config: RelayConfig,
}

impl StreamingRelay {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_config(generator, RelayConfig::default())
    }

    #[must_use]
    pub fn with_config(generator: Arc<dyn TextGenerator>, config: RelayConfig) -> Self {
        Self {
            generator,
            prompt_builder: PromptBuilder::new(),
            config,
        }
    }

    #[must_use]
    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }

    #[must_use]
    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn generate(&self, context: &str, prompt: &str) -> StreamHandle {
        self.generate_with_cancel(context, prompt, CancellationToken::new())
    }

    /// Like [`generate`](Self::generate), stopped early when `cancel` fires.
    /// The relay only listens to `cancel`; finishing or dropping the handle
    /// leaves it untouched.
    #[must_use]
    pub fn generate_with_cancel(
        &self,
        context: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> StreamHandle {
        let request = self.prompt_builder.build(context, prompt);
        self.generate_request(request, cancel)
    }

    #[must_use]
    pub fn generate_request(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> StreamHandle {
        let (writer, reader) = channel::channel();
        let cancel = cancel.child_token();
        let span = tracing::info_span!(
            "relay",
            generator = self.generator.name(),
            model = self.config.params.model.as_deref().unwrap_or(self.generator.model()),
        );

        let task = tokio::spawn(
            drive(
                Arc::clone(&self.generator),
                request,
                self.config.clone(),
                writer,
                cancel.clone(),
            )
            .instrument(span),
        );

        StreamHandle {
            reader,
            task,
            guard: cancel.clone().drop_guard(),
            cancel,
        }
    }
}

impl std::fmt::Debug for StreamingRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingRelay")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Caller's end of one generation. Dropping it cancels the relay task.
pub struct StreamHandle {
    reader: ChannelReader,
    task: JoinHandle<Result<String>>,
    cancel: CancellationToken,
    guard: DropGuard,
}

impl StreamHandle {
    /// Next accumulated snapshot, in order; `None` after the channel closes.
    pub async fn next(&mut self) -> Option<String> {
        self.reader.next().await
    }

    #[must_use]
    pub fn latest(&self) -> String {
        self.reader.latest()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.reader.is_closed()
    }

    #[must_use]
    pub fn watch(&self) -> SnapshotWatcher {
        self.reader.watch()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the relay task and returns the final answer or the reason
    /// there is none.
    pub async fn finish(self) -> Result<String> {
        let Self { task, guard, .. } = self;
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(RelayError::Task(e.to_string())),
        };
        drop(guard);
        outcome
    }
}

async fn drive(
    generator: Arc<dyn TextGenerator>,
    request: GenerationRequest,
    config: RelayConfig,
    writer: ChannelWriter,
    cancel: CancellationToken,
) -> Result<String> {
    let stream = match open(generator.as_ref(), &request, &config, &cancel).await {
        Ok(stream) => stream,
        Err(e) => {
            writer.close();
            return Err(e);
        }
    };
    relay_fragments(stream, writer, &cancel).await
}

async fn open(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    config: &RelayConfig,
    cancel: &CancellationToken,
) -> Result<FragmentStream> {
    let params = &config.params;

    match config.retry {
        Some(policy) => {
            policy
                .establish(cancel, move |attempt| {
                    tracing::debug!(attempt, "Opening stream");
                    generator.open_stream(request, params)
                })
                .await
        }
        None => {
            tracing::debug!("Opening stream");
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(RelayError::Cancelled),
                opened = generator.open_stream(request, params) => opened.map_err(RelayError::from),
            }
        }
    }
}

async fn relay_fragments(
    mut stream: FragmentStream,
    writer: ChannelWriter,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut accumulator = Accumulator::default();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!(fragments = accumulator.fragments(), "Generation cancelled");
                drop(stream);
                writer.close();
                return Err(RelayError::Cancelled);
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(StreamEvent::TextGeneration { text })) => {
                if let Some(snapshot) = accumulator.push(&text)
                    && !writer.publish(snapshot)
                {
                    tracing::trace!("Primary reader detached, continuing for watchers");
                }
            }
            Some(Ok(StreamEvent::StreamEnd { finish_reason })) => {
                tracing::debug!(finish_reason = ?finish_reason, "Stream end received");
                break;
            }
            Some(Ok(event)) => {
                tracing::trace!(kind = event.kind(), "Skipping non-text event");
            }
            Some(Err(source)) => {
                tracing::warn!(
                    fragments = accumulator.fragments(),
                    error = %source,
                    "Stream failed mid-response"
                );
                writer.close();
                return Err(RelayError::MidStream {
                    partial: accumulator.into_text(),
                    source,
                });
            }
            None => break,
        }
    }

    drop(stream);
    writer.close();

    tracing::debug!(fragments = accumulator.fragments(), "Stream complete");
    let text = accumulator.into_text();
    if text.is_empty() {
        Err(RelayError::EmptyResponse)
    } else {
        Ok(text)
    }
}
