//! Build event delivery.
//!
//! A builder pushes [`BuildEvent`]s into an [`EventSink`]; the caller pulls
//! them from the matching [`BuildEventStream`]. Dropping the stream cancels
//! the run.

use crate::builder::BuildEvent;
use crate::{Error, Result};
use futures::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Sending half handed to a builder.
#[derive(Debug, Clone)]
pub struct EventSink {
    inner: mpsc::UnboundedSender<Result<BuildEvent>>,
}

impl EventSink {
    /// Emit an event. Returns `false` once the caller has gone away.
    pub fn emit(&self, event: BuildEvent) -> bool {
        self.inner.send(Ok(event)).is_ok()
    }

    /// Deliver a terminal error to the caller.
    pub fn fail(&self, error: Error) -> bool {
        self.inner.send(Err(error)).is_ok()
    }

    /// Whether the receiving stream has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Stream of events from one run.
///
/// Ends when the builder finishes and every sink clone is dropped.
#[derive(Debug)]
pub struct BuildEventStream {
    receiver: mpsc::UnboundedReceiver<Result<BuildEvent>>,
    cancel: CancellationToken,
}

impl BuildEventStream {
    /// Create a connected sink and stream sharing `cancel`.
    #[must_use]
    pub fn channel(cancel: CancellationToken) -> (EventSink, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (EventSink { inner: sender }, Self { receiver, cancel })
    }

    /// Ask the builder to stop. Events already sent can still be read, and
    /// the stream ends once the builder has torn down.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token observed by the builder.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain the stream and report whether the last event succeeded.
    /// A stream that ends without any event counts as a failure.
    ///
    /// # Errors
    ///
    /// Returns the first error the builder delivered.
    pub async fn last_success(mut self) -> Result<bool> {
        let mut success = false;
        while let Some(item) = self.next().await {
            success = item?.success;
        }
        Ok(success)
    }
}

impl Stream for BuildEventStream {
    type Item = Result<BuildEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for BuildEventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
