use std::fmt;

/// Error kind for stage and storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or inconsistent stage/store configuration. Raised at setup only.
    Config,
    /// The input stream terminated abnormally.
    Upstream,
    /// The dataset reader failed (query, connectivity).
    Storage,
    Io,
    Format,
}

/// Error carried on streams and returned by plugin trait methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StageError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Upstream, message: msg.into() }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Storage, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }

    pub fn is_config(&self) -> bool {
        self.kind == ErrorKind::Config
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for StageError {}

// ---------------------------------------------------------------------------
// From impls: standard error types → StageError with correct ErrorKind
// ---------------------------------------------------------------------------

impl From<std::io::Error> for StageError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for StageError {
    fn from(e: serde_json::Error) -> Self {
        Self::format(e.to_string())
    }
}

impl From<toml::de::Error> for StageError {
    fn from(e: toml::de::Error) -> Self {
        Self::config(e.to_string())
    }
}
