use std::collections::HashSet;

use serde::Deserialize;

use crate::error::EngineError;

/// Name of the store used when a stage does not reference one.
pub const DEFAULT_STORE: &str = "default";

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct PulseConfig {
    /// Store (dataset) definitions.
    #[serde(default)]
    pub stores: Vec<StoreConfig>,

    /// Stage definitions, chained in declaration order.
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    /// Channel capacity between the last stage and the sink.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

fn default_buffer() -> usize {
    1024
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    /// Repository kind, e.g. "memory" or "file".
    pub kind: String,
    #[serde(default)]
    pub config: Option<toml::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageConfig {
    pub name: String,
    /// Registered stage plugin name, e.g. "message-fetch".
    pub plugin: String,
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl PulseConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that don't need the plugin registry.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.stages.is_empty() {
            return Err(EngineError::Config("no [[stages]] configured".into()));
        }
        if self.buffer == 0 {
            return Err(EngineError::Config("buffer must be greater than zero".into()));
        }

        let mut seen = HashSet::new();
        for store in &self.stores {
            if !seen.insert(store.name.as_str()) {
                return Err(EngineError::Config(format!("duplicate store '{}'", store.name)));
            }
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(EngineError::Config(format!("duplicate stage '{}'", stage.name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stores_and_stages() {
        let config = PulseConfig::parse(
            r#"
            [[stores]]
            name = "default"
            kind = "file"
            config = { path = "messages.jsonl" }

            [[stages]]
            name = "fetch"
            plugin = "message-fetch"
            config = { since = "2016-01-01", languages = ["en", "it"] }
            "#,
        )
        .unwrap();

        assert_eq!(config.buffer, 1024);
        assert_eq!(config.stores.len(), 1);
        assert_eq!(config.stores[0].kind, "file");
        assert_eq!(config.stages[0].plugin, "message-fetch");
        let stage_cfg = config.stages[0].config.as_ref().unwrap();
        assert_eq!(stage_cfg["languages"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn rejects_missing_stages() {
        let err = PulseConfig::parse("buffer = 8").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = PulseConfig::parse(
            r#"
            [[stores]]
            name = "a"
            kind = "memory"

            [[stores]]
            name = "a"
            kind = "memory"

            [[stages]]
            name = "fetch"
            plugin = "message-fetch"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate store 'a'"));
    }
}
