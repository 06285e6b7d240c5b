use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use pulse_api::repository::config_or_default;
use pulse_api::{Bounds, StageError};

/// Options of the `message-fetch` stage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageFetchOptions {
    /// Store to replay from. Absent selects the default store.
    #[serde(default, alias = "db")]
    pub store: Option<String>,
    /// Lower time bound, inclusive.
    #[serde(default, deserialize_with = "de_date")]
    pub since: Option<DateTime<Utc>>,
    /// Upper time bound, inclusive.
    #[serde(default, deserialize_with = "de_date")]
    pub until: Option<DateTime<Utc>>,
    /// Accepted language tags. Absent or empty accepts every language.
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}

impl MessageFetchOptions {
    pub fn from_toml(options: Option<&toml::Value>) -> Result<Self, StageError> {
        config_or_default(options)
    }

    /// Validated read bounds.
    pub fn bounds(&self) -> Result<Bounds, StageError> {
        Bounds::new(
            self.since,
            self.until,
            self.languages.iter().flatten().cloned(),
        )
    }
}

/// Parse an RFC 3339 timestamp, or a plain `YYYY-MM-DD` date taken as
/// midnight UTC.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date '{s}' (expected RFC 3339 or YYYY-MM-DD)"))
}

fn de_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match toml::Value::deserialize(deserializer)? {
        toml::Value::String(s) => s,
        // Native TOML dates/datetimes (`since = 2016-01-01`).
        toml::Value::Datetime(dt) => dt.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a date, found {}",
                other.type_str()
            )));
        }
    };
    parse_date(&raw).map(Some).map_err(serde::de::Error::custom)
}
