pub mod bounds;
pub mod error;
pub mod message;
pub mod repository;
pub mod stage;

pub use bounds::Bounds;
pub use error::{ErrorKind, StageError};
pub use message::{Event, Message};
pub use repository::{MessageRepository, MessageStream, RepositoryFactory, RepositoryProvider};
pub use stage::{EventStream, Stage, StageContext, StageFactory};
