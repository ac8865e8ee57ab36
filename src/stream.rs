//! Lazy event stream over a chat-completions SSE response.

use crate::error::Error;
use crate::protocol;
use crate::sse::SseParser;
use crate::types::{StreamEvent, Usage};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

pin_project! {
    /// A streaming conversation turn.
    ///
    /// Yields `StreamEvent`s in chunk order. The byte stream is read only
    /// when the consumer polls, and it is dropped as soon as the turn ends,
    /// fails, or is cancelled. Dropping the `EventStream` releases it too.
    pub struct EventStream<S> {
        #[pin]
        inner: Option<S>,
        parser: SseParser,
        pending: VecDeque<StreamEvent>,
        cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
        usage: Option<Usage>,
        finished: bool,
    }
}

impl<S> EventStream<S>
where
    S: Stream<Item = Result<Bytes, Error>>,
{
    /// Create a new event stream over an SSE byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Some(inner),
            parser: SseParser::new(),
            pending: VecDeque::with_capacity(2),
            cancelled: None,
            usage: None,
            finished: false,
        }
    }

    /// End the stream when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    /// Latest usage counters seen so far.
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// True once the stream has ended and released its transport.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }
}

/// Drop the byte stream and stop producing events.
fn release<S>(
    mut inner: Pin<&mut Option<S>>,
    cancelled: &mut Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    finished: &mut bool,
) {
    inner.set(None);
    *cancelled = None;
    *finished = true;
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<Bytes, Error>>,
{
    type Item = Result<StreamEvent, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(cancelled) = this.cancelled.as_mut() {
                if cancelled.as_mut().poll(cx).is_ready() {
                    tracing::debug!("stream cancelled by caller");
                    this.pending.clear();
                    this.parser.reset();
                    release(this.inner.as_mut(), this.cancelled, this.finished);
                    return Poll::Ready(None);
                }
            }

            if let Some(event) = this.pending.pop_front() {
                if let StreamEvent::Usage(usage) = &event {
                    *this.usage = Some(*usage);
                }
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            if let Some(sse) = this.parser.next_event() {
                let sse = match sse {
                    Ok(sse) => sse,
                    Err(e) => {
                        this.parser.reset();
                        release(this.inner.as_mut(), this.cancelled, this.finished);
                        return Poll::Ready(Some(Err(e)));
                    }
                };
                if sse.data.trim().is_empty() {
                    continue;
                }
                if SseParser::is_done(&sse.data) {
                    tracing::debug!("stream reached [DONE]");
                    this.parser.reset();
                    release(this.inner.as_mut(), this.cancelled, this.finished);
                    continue;
                }
                match protocol::parse_chunk(&sse.data) {
                    Ok(events) => this.pending.extend(events),
                    Err(e) => {
                        this.parser.reset();
                        release(this.inner.as_mut(), this.cancelled, this.finished);
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                continue;
            }

            let Some(inner) = this.inner.as_mut().as_pin_mut() else {
                // Transport already closed and the buffer is drained.
                *this.finished = true;
                *this.cancelled = None;
                continue;
            };

            match inner.poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.parser.feed(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    tracing::debug!(error = %e, "stream transport error");
                    this.parser.reset();
                    release(this.inner.as_mut(), this.cancelled, this.finished);
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    // Remaining buffered events are drained before finishing.
                    this.parser.finish();
                    this.inner.set(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
