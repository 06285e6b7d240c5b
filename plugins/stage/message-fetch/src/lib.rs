//! `message-fetch`: wait for the input stream to finish, then replay the
//! stored messages.
//!
//! Whatever flows in is ignored. Once the input completes, every message of
//! the configured store inside the time range and language set is emitted,
//! and the output completes or fails with the read. An input error is passed
//! through and nothing is read.

mod options;

use std::sync::Arc;

use pulse_api::{
    Bounds, EventStream, MessageRepository, MessageStream, Stage, StageContext, StageError,
    StageFactory,
};
use pulse_engine::replay_after;

pub use options::{MessageFetchOptions, parse_date};

pub const PLUGIN_NAME: &str = "message-fetch";

/// Replays a store once the input stream completes.
pub struct MessageFetch {
    name: String,
    repository: Arc<dyn MessageRepository>,
    bounds: Bounds,
}

impl MessageFetch {
    pub fn new(
        name: impl Into<String>,
        repository: Arc<dyn MessageRepository>,
        bounds: Bounds,
    ) -> Self {
        Self {
            name: name.into(),
            repository,
            bounds,
        }
    }
}

impl Stage for MessageFetch {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, input: EventStream) -> MessageStream {
        replay_after(
            self.name.clone(),
            input,
            self.repository.clone(),
            self.bounds.clone(),
        )
    }
}

pub struct MessageFetchFactory;

impl StageFactory for MessageFetchFactory {
    fn plugin(&self) -> &str {
        PLUGIN_NAME
    }

    fn configure(
        &self,
        name: &str,
        options: Option<&toml::Value>,
        ctx: &StageContext,
    ) -> Result<Box<dyn Stage>, StageError> {
        let opts = MessageFetchOptions::from_toml(options)?;
        let bounds = opts.bounds()?;
        let repository = ctx.repositories.repository(opts.store.as_deref())?;

        tracing::debug!(
            stage = %name,
            store = opts.store.as_deref().unwrap_or("<default>"),
            since = ?bounds.since(),
            until = ?bounds.until(),
            languages = ?bounds.languages(),
            "configured message fetch"
        );
        Ok(Box::new(MessageFetch::new(name, repository, bounds)))
    }
}
