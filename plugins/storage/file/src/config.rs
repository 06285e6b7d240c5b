// ════════════════════════════════════════════════════════════════
//  Configuration
// ════════════════════════════════════════════════════════════════

/// What to do with a line that does not parse as a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnMalformed {
    /// Fail the read with a `Format` error.
    #[default]
    Fail,
    /// Log and move on to the next line.
    Skip,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileRepositoryConfig {
    /// JSON Lines file holding the dataset, one message per line.
    pub path: String,
    #[serde(default)]
    pub on_malformed: OnMalformed,
}
