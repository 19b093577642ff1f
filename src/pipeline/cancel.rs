//! Cancellation for streamed responses.

use crate::{BoxStream, Result};
use futures::stream::{FusedStream, Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::debug;

/// Cancels a [`ControlledStream`] from anywhere, including another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Stop the stream: the connection is released on the stream's next poll
    /// (or immediately if it is parked waiting for bytes) and nothing more is yielded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A stream that stops for good on cancellation, on its first error, or on drop.
///
/// Stopping drops the inner stream, and with it the HTTP response body, so no
/// further bytes are read from the connection.
pub struct ControlledStream<T> {
    inner: Option<BoxStream<'static, T>>,
    token: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<T> ControlledStream<T> {
    pub fn new(inner: BoxStream<'static, T>, token: CancellationToken) -> Self {
        let cancelled = Box::pin(token.clone().cancelled_owned());
        Self {
            inner: Some(inner),
            token,
            cancelled,
        }
    }

    /// Wrap with a fresh token.
    pub fn uncontrolled(inner: BoxStream<'static, T>) -> Self {
        Self::new(inner, CancellationToken::new())
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.clone(),
        }
    }

    /// Cancel and release the connection now.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.release("cancelled");
    }

    /// Run `check` on every item; the first failure is yielded in place of
    /// the item and ends the stream. Cancellation is unaffected.
    pub fn check_each<F>(self, mut check: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(&T) -> Result<()> + Send + 'static,
    {
        let Self {
            inner,
            token,
            cancelled,
        } = self;
        let inner = inner.map(|s| -> BoxStream<'static, T> {
            Box::pin(s.map(move |item| item.and_then(|v| check(&v).map(|()| v))))
        });
        Self {
            inner,
            token,
            cancelled,
        }
    }

    fn release(&mut self, why: &str) {
        if self.inner.take().is_some() {
            debug!(reason = why, "response stream released");
        }
    }
}

impl<T> Stream for ControlledStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.inner.is_none() {
            return Poll::Ready(None);
        }
        // Registers the waker too, so a consumer parked on a slow body wakes up on cancel.
        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.release("cancelled");
            return Poll::Ready(None);
        }
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };
        match inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(item))) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(Some(Err(e))) => {
                this.release("error");
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.release("finished");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> FusedStream for ControlledStream<T> {
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T> std::fmt::Debug for ControlledStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlledStream")
            .field("active", &self.inner.is_some())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
