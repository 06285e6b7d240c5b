pub mod barrier;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod latch;
pub mod pipeline;
pub mod registry;
pub mod source;

pub use barrier::{Barrier, Phase, replay_after};
pub use bootstrap::Engine;
pub use config::PulseConfig;
pub use error::EngineError;
pub use latch::{Terminal, TerminalLatch};
pub use pipeline::{Outcome, spawn_pipeline};
pub use registry::{PluginRegistry, StoreRegistry};
pub use source::lines_source;
