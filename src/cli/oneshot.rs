use std::io::Write;
use tokio_util::sync::CancellationToken;

use crate::chat::APOLOGY;
use crate::core::relay::StreamingRelay;
use crate::core::{RelayError, Result};

/// Streams one answer to `out`. On failure the apology is printed and the
/// cause returned for the exit status.
pub async fn run_once<W: Write>(
    relay: &StreamingRelay,
    context: &str,
    prompt: &str,
    cancel: CancellationToken,
    out: &mut W,
) -> Result<String> {
    let mut handle = relay.generate_with_cancel(context, prompt, cancel);
    let mut shown = 0;

    while let Some(snapshot) = handle.next().await {
        if let Some(delta) = snapshot.get(shown..) {
            write!(out, "{delta}")?;
            out.flush()?;
        }
        shown = snapshot.len();
    }

    let outcome = match handle.finish().await {
        Ok(text) if text.trim().is_empty() => Err(RelayError::EmptyResponse),
        other => other,
    };

    if shown > 0 {
        writeln!(out)?;
    }
    if let Err(e) = &outcome {
        tracing::warn!(error = %e, "One-shot reply failed");
        writeln!(out, "{APOLOGY}")?;
    }
    outcome
}
