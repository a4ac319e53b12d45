#![deny(unsafe_code)]

//! Configuration loading and validation for searchgrid.
//!
//! Loads TOML configuration files and validates them before anything in
//! `searchgrid-core` sees them. [`AppConfig`] is the central structure; table
//! definitions under `[[tables]]` describe the filterable columns of each
//! data table.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column match modes accepted in `match_mode`.
pub const MATCH_MODES: [&str; 8] = [
    "startsWith",
    "endsWith",
    "contains",
    "exact",
    "lt",
    "lte",
    "gt",
    "gte",
];

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search expression settings.
    #[serde(default)]
    pub expressions: ExpressionsConfig,

    /// Filtering settings shared by all tables.
    #[serde(default)]
    pub filtering: FilteringConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Data table definitions.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

/// The stage the hosting application runs in.
///
/// Expression validation only happens in [`ProjectStage::Development`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStage {
    /// Extra grammar checks, clearer errors.
    Development,
    /// Grammar checks skipped.
    #[default]
    Production,
}

/// Search expression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionsConfig {
    /// Project stage: "development" or "production".
    #[serde(default)]
    pub stage: ProjectStage,

    /// Naming container separator character.
    #[serde(default = "default_separator")]
    pub separator: char,
}

impl Default for ExpressionsConfig {
    fn default() -> Self {
        Self {
            stage: ProjectStage::default(),
            separator: default_separator(),
        }
    }
}

fn default_separator() -> char {
    ':'
}

/// Filtering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteringConfig {
    /// Suffix of the global filter request parameter, appended to the
    /// table client id and the separator.
    #[serde(default = "default_global_filter_param")]
    pub global_filter_param: String,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            global_filter_param: default_global_filter_param(),
        }
    }
}

fn default_global_filter_param() -> String {
    "globalFilter".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A data table definition.
///
/// ## TOML Example
///
/// ```toml
/// [[tables]]
/// client_id = "form:cars"
/// paginator = true
///
/// [[tables.columns]]
/// id = "status"
/// filter_by = "#{car.status}"
/// match_mode = "exact"
///
/// [[tables.columns]]
/// id = "dyn"
/// fields = ["#{car.brand}", "#{car.color}"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Client id of the table component.
    pub client_id: String,

    /// Whether rows are paged in by an external data source.
    #[serde(default)]
    pub lazy: bool,

    /// Whether the table shows a paginator.
    #[serde(default)]
    pub paginator: bool,

    /// Filterable columns.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// A filterable column, or a group of dynamic columns when `fields` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Column id, unique within its table.
    pub id: String,

    /// Filter binding of a single column (e.g. `#{car.model}`).
    #[serde(default)]
    pub filter_by: Option<String>,

    /// Filter bindings of a dynamic column group, one per column index.
    #[serde(default)]
    pub fields: Vec<String>,

    /// One of [`MATCH_MODES`].
    #[serde(default = "default_match_mode")]
    pub match_mode: String,
}

fn default_match_mode() -> String {
    "startsWith".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), "Loaded config file");
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a table definition by client id.
    pub fn table(&self, client_id: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.client_id == client_id)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sep = self.expressions.separator;
        if sep == '@' || sep == '(' || sep == ')' || sep == ',' || sep.is_whitespace() {
            return Err(ConfigError::Validation(format!(
                "expressions.separator must not be '@', a parenthesis, a comma or whitespace, got {sep:?}"
            )));
        }
        if self.filtering.global_filter_param.is_empty() {
            return Err(ConfigError::Validation(
                "filtering.global_filter_param must not be empty".to_string(),
            ));
        }
        if self.logging.level.is_empty() {
            return Err(ConfigError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }

        for (i, table) in self.tables.iter().enumerate() {
            if table.client_id.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "tables[{i}].client_id must not be empty"
                )));
            }
            for (j, column) in table.columns.iter().enumerate() {
                if column.id.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "tables[{i}].columns[{j}].id must not be empty"
                    )));
                }
                if column.filter_by.is_none() && column.fields.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "tables[{i}].columns[{j}] needs either filter_by or fields"
                    )));
                }
                if column.filter_by.is_some() && !column.fields.is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "tables[{i}].columns[{j}] must not set both filter_by and fields"
                    )));
                }
                if !MATCH_MODES.contains(&column.match_mode.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "tables[{i}].columns[{j}].match_mode must be one of {:?}, got {:?}",
                        MATCH_MODES, column.match_mode
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.expressions.separator, ':');
        assert_eq!(config.expressions.stage, ProjectStage::Production);
        assert_eq!(config.filtering.global_filter_param, "globalFilter");
        assert_eq!(config.logging.level, "info");
        assert!(config.tables.is_empty());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.expressions.separator, ':');
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r##"
            [expressions]
            stage = "development"
            separator = "_"

            [filtering]
            global_filter_param = "search"

            [logging]
            level = "debug"

            [[tables]]
            client_id = "form_cars"
            paginator = true

            [[tables.columns]]
            id = "status"
            filter_by = "#{car.status}"
            match_mode = "exact"

            [[tables.columns]]
            id = "dyn"
            fields = ["#{car.brand}", "#{car.color}"]
        "##;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.expressions.stage, ProjectStage::Development);
        assert_eq!(config.expressions.separator, '_');
        assert_eq!(config.filtering.global_filter_param, "search");
        assert_eq!(config.logging.level, "debug");

        let table = config.table("form_cars").unwrap();
        assert!(table.paginator);
        assert!(!table.lazy);
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].match_mode, "exact");
        assert_eq!(table.columns[1].match_mode, "startsWith");
        assert_eq!(table.columns[1].fields.len(), 2);
    }

    #[test]
    fn test_validation_rejects_keyword_separator() {
        let toml = r#"
            [expressions]
            separator = "@"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_whitespace_separator() {
        let toml = r#"
            [expressions]
            separator = " "
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_parse_rejects_multi_char_separator() {
        let toml = r#"
            [expressions]
            separator = "::"
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_stage() {
        let toml = r#"
            [expressions]
            stage = "staging"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_match_mode() {
        let toml = r##"
            [[tables]]
            client_id = "cars"

            [[tables.columns]]
            id = "model"
            filter_by = "#{car.model}"
            match_mode = "regex"
        "##;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("match_mode"));
    }

    #[test]
    fn test_validation_requires_binding() {
        let toml = r#"
            [[tables]]
            client_id = "cars"

            [[tables.columns]]
            id = "model"
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("filter_by or fields"));
    }

    #[test]
    fn test_validation_rejects_both_bindings() {
        let toml = r##"
            [[tables]]
            client_id = "cars"

            [[tables.columns]]
            id = "model"
            filter_by = "#{car.model}"
            fields = ["#{car.brand}"]
        "##;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_table_id() {
        let toml = r#"
            [[tables]]
            client_id = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_log_level() {
        let toml = r#"
            [logging]
            level = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_table_lookup_missing() {
        let config = AppConfig::default();
        assert!(config.table("nope").is_none());
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[test_log::test(tokio::test)]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("searchgrid.toml");
        tokio::fs::write(&path, b"[expressions]\nstage = \"development\"\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.expressions.stage, ProjectStage::Development);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/file.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[")
            .await
            .unwrap();

        let result = AppConfig::load(&path).await;
        assert!(result.is_err());
    }

    // ── Error display ─────────────────────────────────────────────────

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
