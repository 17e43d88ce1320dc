//! Streaming response consumer.
//!
//! Drives one backend request to a terminal [`StreamEnd`]. Cancellation is
//! observed at every await point: while the request is in flight and
//! between fragments. Partial text is discarded on cancellation or failure.

use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::prompt::ModelRequest;
use crate::providers::ModelBackend;

use super::TurnError;

/// Terminal result of consuming one reply stream.
#[derive(Debug)]
pub(crate) enum StreamEnd {
    /// End of stream with non-empty text.
    Completed(String),
    /// The token fired first.
    Cancelled,
    /// Request, status or stream failure, or an empty reply.
    Failed(TurnError),
}

/// Send `request` and accumulate its fragments.
///
/// `on_streaming` runs once the backend has accepted the request. Every
/// fragment is appended to the accumulator and mirrored to `partial`.
pub(crate) async fn consume(
    backend: &dyn ModelBackend,
    request: &ModelRequest,
    token: &CancellationToken,
    partial: &watch::Sender<String>,
    on_streaming: impl FnOnce(),
) -> StreamEnd {
    let sent = tokio::select! {
        biased;
        () = token.cancelled() => return StreamEnd::Cancelled,
        sent = backend.send(request) => sent,
    };
    let mut stream = match sent {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, model = backend.model_id(), "model request failed");
            return StreamEnd::Failed(e.into());
        }
    };
    on_streaming();

    let mut accumulated = String::new();
    let mut fragments = 0_usize;
    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(fragments, "stream cancelled");
                return StreamEnd::Cancelled;
            }
            next = stream.next() => match next {
                Some(Ok(fragment)) => {
                    fragments = fragments.saturating_add(1);
                    accumulated.push_str(&fragment);
                    partial.send_replace(accumulated.clone());
                }
                Some(Err(e)) => {
                    warn!(error = %e, fragments, "stream failed");
                    return StreamEnd::Failed(e.into());
                }
                None => break,
            },
        }
    }

    if accumulated.is_empty() {
        warn!("stream ended without text");
        return StreamEnd::Failed(TurnError::Streaming(
            "stream ended without text".to_owned(),
        ));
    }
    debug!(fragments, chars = accumulated.chars().count(), "stream completed");
    StreamEnd::Completed(accumulated)
}
