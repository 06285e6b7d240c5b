use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pulse_api::{Message, MessageStream, StageError};

/// How a driven pipeline ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The output stream completed; every message was handed to the sink.
    Completed { delivered: u64 },
    /// The token fired or the receiver went away; the stream was dropped.
    Cancelled { delivered: u64 },
}

impl Outcome {
    pub fn delivered(&self) -> u64 {
        match self {
            Outcome::Completed { delivered } | Outcome::Cancelled { delivered } => *delivered,
        }
    }
}

/// Drive `stream` on its own task, delivering messages into a bounded channel.
///
/// Cancelling `token` or dropping the receiver drops the stream, which in
/// turn cancels every stage feeding it. A stream error ends the task with
/// that error; the channel is closed either way.
pub fn spawn_pipeline(
    stream: MessageStream,
    buffer: usize,
    token: CancellationToken,
) -> (mpsc::Receiver<Message>, JoinHandle<Result<Outcome, StageError>>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let handle = tokio::spawn(drive(stream, tx, token));
    (rx, handle)
}

/// Pump `stream` into `tx` until it ends, fails or is cancelled.
pub async fn drive(
    mut stream: MessageStream,
    tx: mpsc::Sender<Message>,
    token: CancellationToken,
) -> Result<Outcome, StageError> {
    let mut delivered = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            _ = tx.closed() => None,
            next = stream.next() => Some(next),
        };

        let item = match next {
            Some(item) => item,
            None => {
                drop(stream);
                tracing::info!(delivered, "pipeline cancelled");
                return Ok(Outcome::Cancelled { delivered });
            }
        };

        match item {
            Some(Ok(message)) => {
                let sent = tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    res = tx.send(message) => res.is_ok(),
                };
                if !sent {
                    drop(stream);
                    tracing::info!(delivered, "pipeline cancelled");
                    return Ok(Outcome::Cancelled { delivered });
                }
                delivered += 1;
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, delivered, "pipeline failed");
                return Err(e);
            }
            None => {
                tracing::info!(delivered, "pipeline completed");
                return Ok(Outcome::Completed { delivered });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use futures_util::stream;

    use super::*;

    fn msg(id: &str) -> Message {
        Message::new(id, Utc.timestamp_opt(0, 0).unwrap())
    }

    #[tokio::test]
    async fn delivers_everything_then_completes() {
        let stream: MessageStream = Box::pin(stream::iter(vec![
            Ok::<_, StageError>(msg("1")),
            Ok(msg("2")),
        ]));
        let (mut rx, handle) = spawn_pipeline(stream, 4, CancellationToken::new());

        let mut ids = Vec::new();
        while let Some(m) = rx.recv().await {
            ids.push(m.id);
        }
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(handle.await.unwrap(), Ok(Outcome::Completed { delivered: 2 }));
    }

    #[tokio::test]
    async fn stream_error_ends_the_task() {
        let stream: MessageStream = Box::pin(stream::iter(vec![
            Ok(msg("1")),
            Err(StageError::storage("gone")),
        ]));
        let (mut rx, handle) = spawn_pipeline(stream, 4, CancellationToken::new());

        assert_eq!(rx.recv().await.map(|m| m.id), Some("1".to_string()));
        assert_eq!(rx.recv().await, None);
        assert_eq!(handle.await.unwrap(), Err(StageError::storage("gone")));
    }

    #[tokio::test]
    async fn token_cancels_a_waiting_pipeline() {
        let stream: MessageStream = Box::pin(stream::pending::<Result<Message, StageError>>());
        let token = CancellationToken::new();
        let (_rx, handle) = spawn_pipeline(stream, 4, token.clone());

        token.cancel();
        assert_eq!(handle.await.unwrap(), Ok(Outcome::Cancelled { delivered: 0 }));
    }

    #[tokio::test]
    async fn dropped_receiver_cancels() {
        let stream: MessageStream = Box::pin(stream::pending::<Result<Message, StageError>>());
        let (rx, handle) = spawn_pipeline(stream, 4, CancellationToken::new());

        drop(rx);
        assert_eq!(handle.await.unwrap(), Ok(Outcome::Cancelled { delivered: 0 }));
    }
}
