use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::StageError;
use crate::message::Message;

/// Filter applied by a dataset read.
///
/// - `since` / `until` are both inclusive; `None` leaves that side unbounded.
/// - An empty `languages` set means no language restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds {
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    languages: BTreeSet<String>,
}

impl Bounds {
    /// Unbounded: matches every stored message.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build validated bounds. `until < since` and blank language tags are
    /// configuration errors.
    pub fn new<I, S>(
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        languages: I,
    ) -> Result<Self, StageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let (Some(since), Some(until)) = (since, until) {
            if until < since {
                return Err(StageError::config(format!(
                    "until ({until}) is before since ({since})"
                )));
            }
        }

        let mut set = BTreeSet::new();
        for lang in languages {
            let lang: String = lang.into();
            let lang = lang.trim();
            if lang.is_empty() {
                return Err(StageError::config("language tag must not be empty"));
            }
            set.insert(lang.to_string());
        }

        Ok(Self {
            since,
            until,
            languages: set,
        })
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }

    pub fn languages(&self) -> &BTreeSet<String> {
        &self.languages
    }

    /// Whether `date` falls inside `[since, until]`.
    pub fn contains_date(&self, date: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if *date < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if *date > until {
                return false;
            }
        }
        true
    }

    /// Whether a language tag passes the language filter.
    pub fn accepts_language(&self, language: Option<&str>) -> bool {
        if self.languages.is_empty() {
            return true;
        }
        language.is_some_and(|l| self.languages.contains(l))
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.contains_date(&message.date) && self.accepts_language(message.language.as_deref())
    }
}
