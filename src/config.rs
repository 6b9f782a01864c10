//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::matching::{CellMatch, SelectionOptions};

/// Configuration for a [`MatchingEngine`](crate::service::MatchingEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Concurrency limit for resources the registry does not know.
    pub default_max_concurrent: u32,
    /// Entries retained by each catalog cache.
    pub cache_capacity: usize,
    /// Events held by `MatchingEngine::with_buffered_events` before new ones are dropped.
    pub event_buffer: usize,
    /// Rank shorter variants first.
    pub prioritize_speed: bool,
    /// Cell matching mode.
    pub cell_match: CellMatch,
    /// Slot width of utilization matrices.
    pub utilization_slot_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_concurrent: 1,
            cache_capacity: 256,
            event_buffer: 1024,
            prioritize_speed: false,
            cell_match: CellMatch::AllListed,
            utilization_slot_minutes: 60,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Rejects zero limits, buffers and slot widths.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("default_max_concurrent", self.default_max_concurrent == 0),
            ("cache_capacity", self.cache_capacity == 0),
            ("event_buffer", self.event_buffer == 0),
            ("utilization_slot_minutes", self.utilization_slot_minutes == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(EngineError::Config(format!("{field} must be positive"))),
            None => Ok(()),
        }
    }

    /// Default selection options derived from this configuration.
    pub fn selection_options(&self) -> SelectionOptions {
        SelectionOptions {
            prioritize_speed: self.prioritize_speed,
            cell_match: self.cell_match,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_max_concurrent, 1);
        assert_eq!(config.utilization_slot_minutes, 60);
        assert!(!config.selection_options().prioritize_speed);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{"prioritize_speed": true, "cell_match": "any_listed", "event_buffer": 8}"#,
        )
        .unwrap();
        assert!(config.prioritize_speed);
        assert_eq!(config.cell_match, CellMatch::AnyListed);
        assert_eq!(config.event_buffer, 8);
        assert_eq!(config.cache_capacity, 256);
    }

    #[test]
    fn test_rejects_zero_and_garbage() {
        let err = EngineConfig::from_json_str(r#"{"default_max_concurrent": 0}"#).unwrap_err();
        assert!(err.to_string().contains("default_max_concurrent"));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_file("/nonexistent/engine.json"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("u-match-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"utilization_slot_minutes": 15}"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.utilization_slot_minutes, 15);
    }
}
