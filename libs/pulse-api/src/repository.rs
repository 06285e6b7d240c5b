use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use crate::bounds::Bounds;
use crate::error::StageError;
use crate::message::Message;

/// Lazy, cancellable sequence of messages.
///
/// An `Err` item is terminal. Dropping the stream cancels it and releases
/// whatever it holds (cursor, file handle, connection).
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message, StageError>> + Send>>;

/// Read access to a persisted message dataset.
///
/// The engine doesn't enumerate or know concrete implementations.
/// For the engine, storage is just this trait.
pub trait MessageRepository: Send + Sync {
    /// Open a read over every message matching `bounds`.
    ///
    /// Implementations must not touch storage before the returned stream is
    /// first polled, must not materialize the full result, and yield in
    /// storage-native order.
    fn find(&self, bounds: &Bounds) -> MessageStream;
}

/// Creates repositories of one `kind` from their TOML config table.
pub trait RepositoryFactory: Send + Sync {
    /// Kind name referenced by `[[stores]] kind = "..."`.
    fn kind(&self) -> &str;

    fn create(&self, config: Option<&toml::Value>)
        -> Result<Arc<dyn MessageRepository>, StageError>;
}

/// Resolves a store reference to a live repository.
///
/// `None` selects the default store.
pub trait RepositoryProvider: Send + Sync {
    fn repository(&self, store: Option<&str>) -> Result<Arc<dyn MessageRepository>, StageError>;
}

/// Deserialize a plugin's config table, falling back to `Default` when absent.
pub fn config_or_default<T>(config: Option<&toml::Value>) -> Result<T, StageError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match config {
        Some(value) => value.clone().try_into().map_err(StageError::from),
        None => Ok(T::default()),
    }
}
