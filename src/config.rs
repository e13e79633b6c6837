//! Engine configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};
use crate::resolver::{Schema, Slot};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read(_) => "HOOPQL_CONFIG_READ",
            ConfigError::Parse(_) => "HOOPQL_CONFIG_PARSE",
            ConfigError::Invalid(_) => "HOOPQL_CONFIG_INVALID",
        }
    }
}

/// Default slots for unprefixed fields in comparison mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default = "default_slot")]
    pub filter_slot: Slot,

    #[serde(default = "default_slot")]
    pub sort_slot: Slot,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            filter_slot: default_slot(),
            sort_slot: default_slot(),
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Division the CLI builds baselines for
    #[serde(default = "default_gender")]
    pub gender: String,

    /// Ascending identity tie-break for team queries
    #[serde(default = "default_team_identity")]
    pub team_identity_fields: Vec<String>,

    /// Ascending identity tie-break for player queries
    #[serde(default = "default_player_identity")]
    pub player_identity_fields: Vec<String>,

    /// Descending tie-break applied after identity, for both schemas
    #[serde(default = "default_volume_field")]
    pub volume_field: String,

    #[serde(default)]
    pub comparison: ComparisonConfig,

    /// Minimum logged severity
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_depth")]
    pub max_expression_depth: usize,
}

fn default_gender() -> String {
    "Men".to_string()
}
fn default_team_identity() -> Vec<String> {
    vec!["team_name".to_string(), "year".to_string()]
}
fn default_player_identity() -> Vec<String> {
    vec!["code".to_string(), "year".to_string()]
}
fn default_volume_field() -> String {
    "off_team_poss_pct".to_string()
}
fn default_slot() -> Slot {
    Slot::Prev
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_max_depth() -> usize {
    crate::expr::DEFAULT_MAX_DEPTH
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gender: default_gender(),
            team_identity_fields: default_team_identity(),
            player_identity_fields: default_player_identity(),
            volume_field: default_volume_field(),
            comparison: ComparisonConfig::default(),
            log_level: default_log_level(),
            max_expression_depth: default_max_depth(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;

        let path_text = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", &path_text)]);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.team_identity_fields.is_empty() || self.player_identity_fields.is_empty() {
            return Err(ConfigError::Invalid(
                "identity field lists must not be empty".to_string(),
            ));
        }
        if self.volume_field.trim().is_empty() {
            return Err(ConfigError::Invalid("volume_field must not be empty".to_string()));
        }
        if self.max_expression_depth == 0 {
            return Err(ConfigError::Invalid("max_expression_depth must be > 0".to_string()));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> Result<Severity, ConfigError> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::Invalid(format!("unknown log_level '{}'", self.log_level))
        })
    }

    /// Identity tie-break fields for `schema`
    pub fn identity_fields(&self, schema: Schema) -> &[String] {
        match schema {
            Schema::Team => &self.team_identity_fields,
            Schema::Player => &self.player_identity_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let file = write_config("{}");
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.identity_fields(Schema::Team), ["team_name", "year"]);
        assert_eq!(config.comparison.filter_slot, Slot::Prev);
    }

    #[test]
    fn test_overrides() {
        let file = write_config(
            r#"{"gender": "Women", "comparison": {"sort_slot": "next"}, "log_level": "info"}"#,
        );
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.gender, "Women");
        assert_eq!(config.comparison.sort_slot, Slot::Next);
        assert_eq!(config.comparison.filter_slot, Slot::Prev);
        assert_eq!(config.severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_validation_failures() {
        for content in [
            r#"{"team_identity_fields": []}"#,
            r#"{"volume_field": " "}"#,
            r#"{"max_expression_depth": 0}"#,
            r#"{"log_level": "chatty"}"#,
        ] {
            let file = write_config(content);
            let err = EngineConfig::load(file.path()).unwrap_err();
            assert_eq!(err.code(), "HOOPQL_CONFIG_INVALID", "{}", content);
        }
    }

    #[test]
    fn test_unknown_slot_rejected() {
        let file = write_config(r#"{"comparison": {"filter_slot": "current"}}"#);
        let err = EngineConfig::load(file.path()).unwrap_err();
        assert_eq!(err.code(), "HOOPQL_CONFIG_PARSE");
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/hoopql.json")).unwrap_err();
        assert_eq!(err.code(), "HOOPQL_CONFIG_READ");
    }
}
