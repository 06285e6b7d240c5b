use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use crate::error::StageError;
use crate::message::Event;
use crate::repository::{MessageStream, RepositoryProvider};

/// Input of a stage: opaque events, terminated by end of stream or an `Err`.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, StageError>> + Send>>;

/// Context provided to stage factories at configure time.
#[derive(Clone)]
pub struct StageContext {
    /// Store lookup for stages that read persisted data.
    pub repositories: Arc<dyn RepositoryProvider>,
}

/// A configured pipeline stage.
///
/// The stage never spawns work of its own: everything happens when the
/// returned stream is polled.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Attach the stage to its input and return its output.
    fn process(&self, input: EventStream) -> MessageStream;
}

/// Builds stages of one plugin type from their options.
///
/// Registered explicitly by the host application. There is no discovery.
pub trait StageFactory: Send + Sync {
    /// Plugin name referenced by `[[stages]] plugin = "..."`.
    fn plugin(&self) -> &str;

    /// Validate `options` and build a stage.
    ///
    /// Every configuration problem is reported here as `ErrorKind::Config`,
    /// before any stream is attached.
    fn configure(
        &self,
        name: &str,
        options: Option<&toml::Value>,
        ctx: &StageContext,
    ) -> Result<Box<dyn Stage>, StageError>;
}
