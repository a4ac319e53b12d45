//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::PathBuf;

use searchgrid_config::{AppConfig, ColumnConfig, ProjectStage, TableConfig};
use tempfile::TempDir;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .stage(ProjectStage::Development)
///     .table(table("form:cars", false).column(column("brand", "#{car.brand}")))
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn stage(mut self, stage: ProjectStage) -> Self {
        self.config.expressions.stage = stage;
        self
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.config.expressions.separator = separator;
        self
    }

    pub fn global_filter_param(mut self, name: &str) -> Self {
        self.config.filtering.global_filter_param = name.to_string();
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn table(mut self, table: TestTableBuilder) -> Self {
        self.config.tables.push(table.build());
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for a `[[tables]]` entry.
pub struct TestTableBuilder {
    table: TableConfig,
}

/// Start a table definition.
pub fn table(client_id: &str, paginator: bool) -> TestTableBuilder {
    TestTableBuilder {
        table: TableConfig {
            client_id: client_id.to_string(),
            lazy: false,
            paginator,
            columns: Vec::new(),
        },
    }
}

impl TestTableBuilder {
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.table.lazy = lazy;
        self
    }

    pub fn column(mut self, column: ColumnConfig) -> Self {
        self.table.columns.push(column);
        self
    }

    pub fn build(self) -> TableConfig {
        self.table
    }
}

/// A single column with the default match mode.
pub fn column(id: &str, filter_by: &str) -> ColumnConfig {
    ColumnConfig {
        id: id.to_string(),
        filter_by: Some(filter_by.to_string()),
        fields: Vec::new(),
        match_mode: "startsWith".to_string(),
    }
}

/// A single column with an explicit match mode.
pub fn column_with_mode(id: &str, filter_by: &str, match_mode: &str) -> ColumnConfig {
    ColumnConfig {
        match_mode: match_mode.to_string(),
        ..column(id, filter_by)
    }
}

/// A dynamic column group.
pub fn dynamic_column(id: &str, fields: &[&str]) -> ColumnConfig {
    ColumnConfig {
        id: id.to_string(),
        filter_by: None,
        fields: fields.iter().map(|f| f.to_string()).collect(),
        match_mode: "startsWith".to_string(),
    }
}

/// A config file written to a temp directory that lives as long as this
/// value.
pub struct TestConfigFile {
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestConfigFile {
    /// Write `toml_content` to `searchgrid.toml` in a fresh temp directory.
    pub fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("searchgrid.toml");
        std::fs::write(&path, toml_content).expect("failed to write test config");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }
}
