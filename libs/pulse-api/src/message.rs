use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque upstream event. Stages that gate on stream lifecycle never look inside.
pub type Event = serde_json::Value;

/// A persisted message. Owned by storage, read-only for stages.
///
/// Only `date` and `language` take part in filtering. Everything the store
/// keeps beyond the known fields lands in `extra` and is written back as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// UTC timestamp, the index for time-range reads.
    pub date: DateTime<Utc>,
    /// Language tag (e.g. "en"). Untagged messages never match a language filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    pub fn new(id: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            date,
            language: None,
            text: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Convert into an opaque event for the next stage of a pipeline.
    pub fn into_event(self) -> Result<Event, serde_json::Error> {
        serde_json::to_value(self)
    }
}
