use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use pulse_api::{Bounds, Message, MessageRepository, MessageStream, StageError};

use super::config::OnMalformed;

// ════════════════════════════════════════════════════════════════
//  FileRepository
// ════════════════════════════════════════════════════════════════

/// Messages stored as JSON Lines in a single file, in append order.
#[derive(Debug, Clone)]
pub struct FileRepository {
    path: PathBuf,
    on_malformed: OnMalformed,
}

impl FileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            on_malformed: OnMalformed::Fail,
        }
    }

    pub fn with_on_malformed(mut self, on_malformed: OnMalformed) -> Self {
        self.on_malformed = on_malformed;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Append ──

    /// Append messages at the end of the file, creating it if needed.
    pub fn append<'a>(
        &self,
        messages: impl IntoIterator<Item = &'a Message>,
    ) -> Result<usize, StageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StageError::io(format!("mkdir {}: {e}", parent.display())))?;
            }
        }

        let f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StageError::io(format!("open {}: {e}", self.path.display())))?;
        let mut w = std::io::BufWriter::new(f);

        let mut written = 0;
        for message in messages {
            let line = serde_json::to_string(message)
                .map_err(|e| StageError::format(format!("json serialize: {e}")))?;
            writeln!(w, "{line}").map_err(|e| StageError::io(format!("write: {e}")))?;
            written += 1;
        }
        w.flush().map_err(|e| StageError::io(format!("flush: {e}")))?;
        Ok(written)
    }
}

// ── Query ──

enum ReadState {
    /// Nothing opened yet.
    Closed,
    Open {
        reader: BufReader<tokio::fs::File>,
        buf: Vec<u8>,
        line_no: u64,
    },
    Done,
}

struct Read {
    path: PathBuf,
    bounds: Bounds,
    on_malformed: OnMalformed,
    state: ReadState,
}

impl Read {
    async fn next_message(&mut self) -> Option<Result<Message, StageError>> {
        loop {
            match &mut self.state {
                ReadState::Closed => match tokio::fs::File::open(&self.path).await {
                    Ok(f) => {
                        tracing::debug!(path = %self.path.display(), "opened dataset file");
                        self.state = ReadState::Open {
                            reader: BufReader::new(f),
                            buf: Vec::new(),
                            line_no: 0,
                        };
                    }
                    // Never-written dataset: nothing to replay.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        self.state = ReadState::Done;
                        return None;
                    }
                    Err(e) => {
                        self.state = ReadState::Done;
                        return Some(Err(StageError::storage(format!(
                            "open {}: {e}",
                            self.path.display()
                        ))));
                    }
                },
                ReadState::Open {
                    reader,
                    buf,
                    line_no,
                } => {
                    buf.clear();
                    match reader.read_until(b'\n', buf).await {
                        Ok(0) => {
                            self.state = ReadState::Done;
                            return None;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            self.state = ReadState::Done;
                            return Some(Err(StageError::storage(format!(
                                "read {}: {e}",
                                self.path.display()
                            ))));
                        }
                    }
                    *line_no += 1;
                    let line_no = *line_no;

                    // Raw bytes: a non-UTF-8 line is malformed like bad JSON.
                    let parsed = match std::str::from_utf8(buf) {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => {
                            serde_json::from_str::<Message>(line).map_err(|e| e.to_string())
                        }
                        Err(e) => Err(format!("invalid UTF-8: {e}")),
                    };

                    match parsed {
                        Ok(message) if self.bounds.matches(&message) => return Some(Ok(message)),
                        Ok(_) => {}
                        Err(reason) => match self.on_malformed {
                            OnMalformed::Skip => {
                                tracing::warn!(
                                    path = %self.path.display(),
                                    line = line_no,
                                    error = %reason,
                                    "skipping malformed message"
                                );
                            }
                            OnMalformed::Fail => {
                                let err = StageError::format(format!(
                                    "{}:{line_no}: {reason}",
                                    self.path.display()
                                ));
                                self.state = ReadState::Done;
                                return Some(Err(err));
                            }
                        },
                    }
                }
                ReadState::Done => return None,
            }
        }
    }
}

impl MessageRepository for FileRepository {
    fn find(&self, bounds: &Bounds) -> MessageStream {
        let read = Read {
            path: self.path.clone(),
            bounds: bounds.clone(),
            on_malformed: self.on_malformed,
            state: ReadState::Closed,
        };
        Box::pin(stream::unfold(read, |mut read| async move {
            let item = read.next_message().await?;
            Some((item, read))
        }))
    }
}
