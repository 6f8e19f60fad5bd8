//! Pull-based pass-through of an agent's message stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt};
use tracing::{debug, trace};

use crate::core::message::Message;
use crate::error::Result;
use crate::io::runtime::MessageStream;

/// Re-yields every item of the underlying stream, in order and unchanged.
///
/// Nothing is read ahead: each `poll_next` polls the inner stream exactly once,
/// so the consumer drives progress. The relay ends when the inner stream ends.
pub struct MessageRelay {
    inner: MessageStream,
    relayed: usize,
    finished: bool,
}

impl MessageRelay {
    pub fn new(inner: MessageStream) -> Self {
        Self {
            inner,
            relayed: 0,
            finished: false,
        }
    }

    /// Number of messages handed to the consumer so far (errors excluded).
    pub fn relayed(&self) -> usize {
        self.relayed
    }
}

impl Stream for MessageRelay {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(message))) => {
                this.relayed += 1;
                trace!(
                    index = this.relayed,
                    message_type = message.message_type().unwrap_or("-"),
                    "relaying message"
                );
                Poll::Ready(Some(Ok(message)))
            }
            Poll::Ready(Some(Err(err))) => {
                debug!(err = %err, relayed = this.relayed, "relaying stream error");
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                if !this.finished {
                    this.finished = true;
                    debug!(relayed = this.relayed, "agent stream ended");
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
