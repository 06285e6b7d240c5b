#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{0}")]
    Engine(#[from] pulse_engine::EngineError),

    #[error("stage: {0}")]
    Stage(#[from] pulse_api::StageError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline task: {0}")]
    Join(#[from] tokio::task::JoinError),
}
