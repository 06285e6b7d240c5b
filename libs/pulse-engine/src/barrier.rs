//! Barrier-and-replay operator.
//!
//! Swallows an upstream stream, and only once it has completed opens a
//! replay stream and forwards it. Poll-driven: the operator owns no task,
//! everything runs on whoever polls it.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::{FusedStream, Stream, StreamExt};

use pulse_api::{Bounds, EventStream, MessageRepository, MessageStream, StageError};

use crate::latch::{Terminal, TerminalLatch};

/// Observable lifecycle of a [`Barrier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingUpstream,
    Replaying,
    Completed,
    Errored,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::WaitingUpstream | Phase::Replaying)
    }
}

/// Which inner stream is currently held.
enum Held<U, R> {
    Upstream(U),
    Replay(R),
    Nothing,
}

/// Gates a replay behind upstream completion.
///
/// - upstream items are discarded;
/// - upstream end opens the replay (exactly once, via `open`);
/// - upstream `Err` is forwarded and the replay is never opened;
/// - replay items and its terminal are forwarded as-is.
///
/// At most one terminal (`Err` item or end of stream after replay) reaches
/// the consumer. Dropping the barrier, or calling [`Barrier::cancel`], drops
/// whichever inner stream is held.
pub struct Barrier<U, F, R> {
    held: Held<U, R>,
    open: Option<F>,
    phase: Phase,
    latch: TerminalLatch,
    discarded: u64,
    label: String,
}

impl<U, F, R> Barrier<U, F, R> {
    pub fn new(label: impl Into<String>, upstream: U, open: F) -> Self
    where
        F: FnOnce() -> R,
    {
        Self {
            held: Held::Upstream(upstream),
            open: Some(open),
            phase: Phase::WaitingUpstream,
            latch: TerminalLatch::new(),
            discarded: 0,
            label: label.into(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Upstream items swallowed so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Downstream cancellation. No-op once terminal.
    pub fn cancel(&mut self) {
        if !self.latch.fire(Terminal::Cancelled) {
            return;
        }
        let from = self.phase;
        self.held = Held::Nothing;
        self.open = None;
        self.phase = Phase::Cancelled;
        tracing::debug!(stage = %self.label, from = ?from, "barrier cancelled");
    }

    /// Close the latch with `terminal` and release inner streams.
    /// Returns whether the signal may be delivered.
    fn finish(&mut self, terminal: Terminal) -> bool {
        self.held = Held::Nothing;
        self.open = None;
        if !self.latch.fire(terminal) {
            tracing::warn!(
                stage = %self.label,
                dropped = ?terminal,
                winner = ?self.latch.terminal(),
                "discarding late terminal signal"
            );
            return false;
        }
        self.phase = match terminal {
            Terminal::Completed => Phase::Completed,
            Terminal::Errored => Phase::Errored,
            Terminal::Cancelled => Phase::Cancelled,
        };
        true
    }
}

impl<U, F, R> Drop for Barrier<U, F, R> {
    fn drop(&mut self) {
        if !self.phase.is_terminal() {
            self.cancel();
        }
    }
}

impl<U, F, R, E, T> Stream for Barrier<U, F, R>
where
    U: Stream<Item = Result<E, StageError>> + Unpin,
    F: FnOnce() -> R + Unpin,
    R: Stream<Item = Result<T, StageError>> + Unpin,
{
    type Item = Result<T, StageError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match &mut this.held {
                Held::Upstream(upstream) => match upstream.poll_next_unpin(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Some(Ok(_))) => {
                        this.discarded += 1;
                    }
                    Poll::Ready(Some(Err(e))) => {
                        if !this.finish(Terminal::Errored) {
                            return Poll::Ready(None);
                        }
                        tracing::error!(
                            stage = %this.label,
                            error = %e,
                            discarded = this.discarded,
                            "upstream failed, replay skipped"
                        );
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(None) => {
                        this.held = Held::Nothing;
                        let Some(open) = this.open.take() else {
                            return Poll::Ready(None);
                        };
                        if !this.latch.is_open() {
                            return Poll::Ready(None);
                        }
                        tracing::debug!(
                            stage = %this.label,
                            discarded = this.discarded,
                            "upstream completed, starting replay"
                        );
                        this.held = Held::Replay(open());
                        this.phase = Phase::Replaying;
                    }
                },
                Held::Replay(replay) => match replay.poll_next_unpin(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Some(Ok(item))) => return Poll::Ready(Some(Ok(item))),
                    Poll::Ready(Some(Err(e))) => {
                        if !this.finish(Terminal::Errored) {
                            return Poll::Ready(None);
                        }
                        tracing::error!(stage = %this.label, error = %e, "replay failed");
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(None) => {
                        if this.finish(Terminal::Completed) {
                            tracing::debug!(stage = %this.label, "replay completed");
                        }
                        return Poll::Ready(None);
                    }
                },
                Held::Nothing => return Poll::Ready(None),
            }
        }
    }
}

impl<U, F, R, E, T> FusedStream for Barrier<U, F, R>
where
    U: Stream<Item = Result<E, StageError>> + Unpin,
    F: FnOnce() -> R + Unpin,
    R: Stream<Item = Result<T, StageError>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        matches!(self.held, Held::Nothing)
    }
}

/// Replay `repository.find(bounds)` once `upstream` completes.
pub fn replay_after(
    label: impl Into<String>,
    upstream: EventStream,
    repository: Arc<dyn MessageRepository>,
    bounds: Bounds,
) -> MessageStream {
    Box::pin(Barrier::new(label, upstream, move || repository.find(&bounds)))
}
