use pulse_api::StageError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("stage error: {0}")]
    Stage(#[from] StageError),

    #[error("unknown stage plugin: {0}")]
    UnknownPlugin(String),

    #[error("unknown store kind: {0}")]
    UnknownStoreKind(String),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Stage` variant, context is added to the inner `StageError`.
    /// For other variants, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Stage(e) => EngineError::Stage(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
