use tokio_util::sync::CancellationToken;

use super::session::SessionStore;
use crate::core::error::RelayError;
use crate::core::relay::StreamingRelay;
use crate::core::types::Message;

/// The one message a user sees when a reply could not be produced.
pub const APOLOGY: &str = "An error occurred while generating the response. Please try again.";

#[derive(Debug)]
pub enum SendOutcome {
    /// Blank input; nothing was sent.
    Ignored,
    Answered(String),
    /// The apology was appended; the cause is kept for logging.
    Failed(RelayError),
}

/// Transcript side of the chat: owns the sessions and turns relay output
/// into bubbles in the active one.
#[derive(Debug, Default)]
pub struct Conversation {
    sessions: SessionStore,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_sessions(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub const fn sessions_mut(&mut self) -> &mut SessionStore {
        &mut self.sessions
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.sessions.active().messages()
    }

    pub async fn send<F>(&mut self, relay: &StreamingRelay, input: &str, on_update: F) -> SendOutcome
    where
        F: FnMut(&str),
    {
        self.send_with_cancel(relay, input, CancellationToken::new(), on_update)
            .await
    }

    /// Sends `input` with an empty context and streams the answer into a bot
    /// message, calling `on_update` with each newly arrived piece of text.
    pub async fn send_with_cancel<F>(
        &mut self,
        relay: &StreamingRelay,
        input: &str,
        cancel: CancellationToken,
        mut on_update: F,
    ) -> SendOutcome
    where
        F: FnMut(&str),
    {
        if input.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let session = self.sessions.active_mut();
        session.push(Message::user(input));

        let mut handle = relay.generate_with_cancel("", input, cancel);
        session.push(Message::bot(""));

        let mut shown = 0;
        while let Some(snapshot) = handle.next().await {
            if let Some(delta) = snapshot.get(shown..)
                && !delta.is_empty()
            {
                on_update(delta);
            }
            shown = snapshot.len();
            if let Some(last) = session.last_mut() {
                last.content = snapshot;
            }
        }

        let error = match handle.finish().await {
            Ok(text) if !text.trim().is_empty() => return SendOutcome::Answered(text),
            Ok(_) => RelayError::EmptyResponse,
            Err(e) => e,
        };

        tracing::warn!(error = %error, partial_bytes = shown, "Reply failed");

        if session.last_mut().is_some_and(|m| m.is_bot() && m.content.is_empty()) {
            session.pop();
        }
        session.push(Message::bot(APOLOGY));

        SendOutcome::Failed(error)
    }
}
