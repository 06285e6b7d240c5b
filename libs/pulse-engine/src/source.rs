use futures_util::stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use pulse_api::{Event, EventStream, StageError};

/// Turn a line-oriented reader into an event stream.
///
/// Each non-empty line becomes one event: parsed as JSON when it is valid
/// JSON, kept as a JSON string otherwise. End of input completes the stream;
/// a read failure is delivered as a terminal `Upstream` error.
pub fn lines_source<R>(reader: R) -> EventStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let lines = reader.lines();
    Box::pin(stream::unfold(Some(lines), |state| async move {
        let mut lines = state?;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some((Ok(parse_event(trimmed)), Some(lines)));
                }
                Ok(None) => return None,
                Err(e) => {
                    let err = StageError::upstream(format!("read input: {e}"));
                    return Some((Err(err), None));
                }
            }
        }
    }))
}

fn parse_event(line: &str) -> Event {
    serde_json::from_str(line).unwrap_or_else(|_| Event::String(line.to_string()))
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn one_event_per_line() {
        let input: &[u8] = b"{\"kind\":\"tick\"}\n\nplain text\n42\n";
        let events: Vec<_> = lines_source(input).collect().await;

        assert_eq!(
            events,
            vec![
                Ok(serde_json::json!({"kind": "tick"})),
                Ok(serde_json::json!("plain text")),
                Ok(serde_json::json!(42)),
            ]
        );
    }

    #[tokio::test]
    async fn empty_input_completes_immediately() {
        let input: &[u8] = b"";
        let events: Vec<_> = lines_source(input).collect().await;
        assert!(events.is_empty());
    }
}
