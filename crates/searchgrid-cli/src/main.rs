#![deny(unsafe_code)]

//! SearchGrid CLI: resolve search expressions and filter tables from files.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use searchgrid_config::AppConfig;
use searchgrid_core::{
    CallbackParams, ComponentArena, ComponentSpec, ComponentTree, DataTable, DiagnosticCollector,
    DiagnosticReader, ExpressionResolver, FilterError, FilterFeature, FilterRequest,
    TableRenderer, split_expressions,
};
use searchgrid_core::filter::ColumnBinding;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// SearchGrid: search expressions and data table filtering.
#[derive(Parser)]
#[command(name = "searchgrid", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "searchgrid.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split an expression list into its top-level expressions.
    Split {
        /// Comma or whitespace separated expressions.
        expressions: String,
    },

    /// Resolve expressions against a component tree.
    Resolve {
        /// JSON file holding the root's children as component specs.
        #[arg(long)]
        tree: PathBuf,

        /// Client id of the component the expressions are relative to.
        #[arg(long)]
        source: String,

        /// Print client tokens instead of one client id per line.
        #[arg(long)]
        client: bool,

        /// Expressions to resolve.
        expressions: String,
    },

    /// Filter the rows of a configured table.
    Filter {
        /// Client id of a table from the configuration file.
        #[arg(long)]
        table: String,

        /// JSON file holding the rows as an array.
        #[arg(long)]
        rows: PathBuf,

        /// Column filter as `column=value`, or a raw `parameter=value`.
        #[arg(long = "param", value_name = "K=V")]
        params: Vec<String>,

        /// Global filter value.
        #[arg(long)]
        global: Option<String>,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let collector = DiagnosticCollector::new(64);
    let diagnostics = collector.reader();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(collector)
        .init();

    if !cli.config.exists() {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Split { expressions } => cmd_split(&expressions),
        Commands::Resolve {
            tree,
            source,
            client,
            expressions,
        } => cmd_resolve(&config, &tree, &source, client, &expressions).await?,
        Commands::Filter {
            table,
            rows,
            params,
            global,
        } => cmd_filter(&config, &table, &rows, &params, global.as_deref()).await?,
        Commands::Config { show } => cmd_config(&config, &cli.config, show)?,
    }

    report_diagnostics(&diagnostics);
    Ok(())
}

fn cmd_split(expressions: &str) {
    for expression in split_expressions(expressions) {
        println!("{expression}");
    }
}

async fn cmd_resolve(
    config: &AppConfig,
    tree_path: &Path,
    source: &str,
    client: bool,
    expressions: &str,
) -> Result<()> {
    let content = tokio::fs::read_to_string(tree_path)
        .await
        .with_context(|| format!("reading component tree {}", tree_path.display()))?;
    let specs: Vec<ComponentSpec> = serde_json::from_str(&content)
        .with_context(|| format!("parsing component tree {}", tree_path.display()))?;

    let tree = ComponentArena::from_specs(config.expressions.separator, &specs);
    let Some(source_id) = tree.find_by_client_id(source) else {
        bail!("source component \"{source}\" not found in {}", tree_path.display());
    };
    debug!(components = tree.len(), source, "Loaded component tree");

    let resolver = ExpressionResolver::from_config(&config.expressions);
    if client {
        println!(
            "{}",
            resolver.resolve_components_for_client(&tree, source_id, expressions)?
        );
    } else {
        for component in resolver.resolve_components(&tree, source_id, expressions)? {
            println!("{}", tree.client_id(component));
        }
    }
    Ok(())
}

async fn cmd_filter(
    config: &AppConfig,
    table_id: &str,
    rows_path: &Path,
    params: &[String],
    global: Option<&str>,
) -> Result<()> {
    let Some(table_config) = config.table(table_id) else {
        bail!("table \"{table_id}\" is not configured");
    };

    let content = tokio::fs::read_to_string(rows_path)
        .await
        .with_context(|| format!("reading rows {}", rows_path.display()))?;
    let rows: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("parsing rows {}", rows_path.display()))?;

    let mut table = DataTable::from_config(
        table_config,
        &config.filtering,
        config.expressions.separator,
        rows,
    )?;

    let request = build_request(&table, params, global)?;
    let mut callback = CallbackParams::new();
    let feature = FilterFeature;
    feature.decode(&mut table, &request, Some(&mut callback))?;

    let stdout = std::io::stdout();
    let mut renderer = JsonLinesRenderer::new(stdout.lock());
    feature.encode(&table, &mut renderer)?;

    let callback = callback.to_json();
    if callback.as_object().is_some_and(|params| !params.is_empty()) {
        eprintln!("{callback}");
    }
    Ok(())
}

fn cmd_config(config: &AppConfig, config_path: &Path, show: bool) -> Result<()> {
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load(path).await.map_err(|e| anyhow::anyhow!(e))
    } else {
        Ok(AppConfig::default())
    }
}

/// Build a filter request for `table` from `key=value` arguments.
///
/// A key naming a column becomes that column's filter parameter; any other
/// key is passed through as a raw request parameter. Dynamic column groups
/// have one parameter per field, so they must be addressed by raw name.
fn build_request(
    table: &DataTable<Value>,
    params: &[String],
    global: Option<&str>,
) -> Result<FilterRequest> {
    let mut request = FilterRequest::new().with_param(table.filtering_param(), "true");

    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            bail!("filter parameter \"{param}\" is not in key=value form");
        };
        let prefix = format!("{}{}{key}", table.client_id(), table.separator());
        let name = match table.columns().iter().find(|c| c.id() == key) {
            Some(column) if matches!(column.binding(), ColumnBinding::Dynamic(_)) => {
                bail!("column \"{key}\" is a dynamic group; pass {prefix}_colIndex_N_filter=...");
            }
            Some(_) => format!("{prefix}_filter"),
            None => key.to_string(),
        };
        request = request.with_param(name, value);
    }

    if let Some(global) = global {
        request = request.with_param(table.global_filter_param(), global);
    }
    Ok(request)
}

fn report_diagnostics(diagnostics: &DiagnosticReader) {
    let count = diagnostics.len();
    if count > 0 {
        eprintln!("{count} warning(s) emitted");
    }
}

/// Writes rows as one JSON document per line.
struct JsonLinesRenderer<W> {
    out: W,
}

impl<W: Write> JsonLinesRenderer<W> {
    fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> TableRenderer<Value> for JsonLinesRenderer<W> {
    fn encode_rows(
        &mut self,
        table: &DataTable<Value>,
        matched_only: bool,
    ) -> Result<(), FilterError> {
        let rows = match (matched_only, table.filtered_value()) {
            (true, Some(rows)) => rows,
            _ => table.rows().to_vec(),
        };
        for row in &rows {
            serde_json::to_writer(&mut self.out, row)
                .map_err(|e| FilterError::Render(e.to_string()))?;
            writeln!(self.out).map_err(|e| FilterError::Render(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use searchgrid_core::FilterColumn;
    use searchgrid_test_utils::config::TestConfigFile;
    use searchgrid_test_utils::fixtures::car_rows;

    fn cars() -> DataTable<Value> {
        DataTable::new("cars", ':', car_rows())
            .with_column(FilterColumn::new("brand", "#{car.brand}"))
    }

    #[test]
    fn test_cli_parses_filter_command() {
        let cli = Cli::try_parse_from([
            "searchgrid",
            "-v",
            "filter",
            "--table",
            "cars",
            "--rows",
            "rows.json",
            "--param",
            "brand=vol",
            "--param",
            "year=2005",
            "--global",
            "o",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Filter {
                table,
                params,
                global,
                ..
            } => {
                assert_eq!(table, "cars");
                assert_eq!(params, vec!["brand=vol", "year=2005"]);
                assert_eq!(global.as_deref(), Some("o"));
            }
            _ => panic!("expected filter command"),
        }
    }

    #[test]
    fn test_cli_requires_resolve_source() {
        let parsed = Cli::try_parse_from(["searchgrid", "resolve", "--tree", "t.json", "@this"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_build_request_maps_columns() {
        let table = cars();
        let params = vec!["brand=vol".to_string(), "cars:other=x".to_string()];
        let request = build_request(&table, &params, Some("o")).unwrap();

        assert_eq!(request.get("cars_filtering"), Some("true"));
        assert_eq!(request.get("cars:brand_filter"), Some("vol"));
        assert_eq!(request.get("cars:other"), Some("x"));
        assert_eq!(request.get("cars:globalFilter"), Some("o"));

        assert!(build_request(&table, &["novalue".to_string()], None).is_err());
    }

    #[test]
    fn test_build_request_rejects_dynamic_group() {
        let table = cars().with_column(FilterColumn::dynamic(
            "cols",
            vec!["#{car.brand}".to_string(), "#{car.color}".to_string()],
        ));

        let err = build_request(&table, &["cols=v".to_string()], None).unwrap_err();
        assert!(err.to_string().contains("cars:cols_colIndex_N_filter"));

        let raw = vec!["cars:cols_colIndex_1_filter=bl".to_string()];
        let request = build_request(&table, &raw, None).unwrap();
        assert_eq!(request.get("cars:cols_colIndex_1_filter"), Some("bl"));
    }

    #[test]
    fn test_json_lines_renderer() {
        let mut table = cars();
        let request = build_request(&table, &["brand=b".to_string()], None).unwrap();
        FilterFeature.decode(&mut table, &request, None).unwrap();

        let mut out = Vec::new();
        FilterFeature
            .encode(&table, &mut JsonLinesRenderer::new(&mut out))
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let row: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(row["brand"], "BMW");
    }

    #[tokio::test]
    async fn test_load_config_from_file_and_defaults() {
        let file = TestConfigFile::with_toml(
            r##"
            [expressions]
            stage = "development"
            separator = "_"

            [[tables]]
            client_id = "cars"

            [[tables.columns]]
            id = "brand"
            filter_by = "#{car.brand}"
            "##,
        );
        let config = load_config(&file.path).await.unwrap();
        assert_eq!(config.expressions.separator, '_');
        assert!(config.table("cars").is_some());

        let missing = file.path.with_file_name("missing.toml");
        let defaults = load_config(&missing).await.unwrap();
        assert!(defaults.tables.is_empty());
    }

    #[tokio::test]
    async fn test_load_config_rejects_invalid_file() {
        let file = TestConfigFile::with_toml("[expressions]\nseparator = \"@\"\n");
        assert!(load_config(&file.path).await.is_err());
    }
}
