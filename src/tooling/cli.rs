//! CLI Tooling
//!
//! Command-line interface over [`TreeStore`]. `view` reads rows from a JSON
//! file; `fetch` pulls them from a remote endpoint over HTTP.

use crate::config::{ConfigLoader, GroveConfig};
use crate::logging::LoggingConfig;
use crate::query::{FilterCondition, FilterMode, FilterOperator, Filters, SortDirection, Sorters};
use crate::schema::{FieldDef, Schema};
use crate::store::{ArrayBackend, ExpandDepth, HttpFetch, StoreOptions, TreeStore};
use crate::tooling::format::{format_store_json, format_store_text};
use crate::types::Row;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Grove CLI - browse hierarchical record stores
#[derive(Parser)]
#[command(name = "grove")]
#[command(about = "Load, sort, filter, and expand hierarchical record stores")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory holding grove.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level on stderr)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings: config file values overlaid with command-line flags
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if self.verbose {
            config.level = "debug".to_string();
            config.output = "stderr".to_string();
        }
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show records from a JSON file: {"fields": [...], "rows": [...]}
    View {
        /// Input file
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        query: QueryArgs,
    },
    /// Fetch records from a remote endpoint
    Fetch {
        /// Endpoint URL (defaults to remote.url from config)
        #[arg(long)]
        url: Option<String>,

        /// Field to request, as NAME or NAME:TYPE (repeatable, in order)
        #[arg(long = "field", value_name = "NAME[:TYPE]")]
        fields: Vec<FieldDef>,

        /// Let the server sort
        #[arg(long)]
        remote_sort: bool,

        /// Let the server filter
        #[arg(long)]
        remote_filter: bool,

        #[command(flatten)]
        query: QueryArgs,
    },
}

/// Options shared by every command that renders a store
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Primary key field (repeatable)
    #[arg(long = "primary-key", value_name = "FIELD")]
    pub primary_keys: Vec<String>,

    /// Name of the field holding child rows
    #[arg(long)]
    pub children_field: Option<String>,

    /// Sort key, as FIELD or FIELD:ASC|DESC (repeatable, first wins)
    #[arg(long = "sort", value_name = "FIELD[:DIR]")]
    pub sort: Vec<String>,

    /// Filter, as FIELD<OP>VALUE with OP one of = != < <= > >= ~ (repeatable)
    #[arg(long = "filter", value_name = "EXPR")]
    pub filter: Vec<String>,

    /// Keep rows matching any filter instead of all
    #[arg(long)]
    pub any: bool,

    /// Expand lazily loaded children: a level count or "all"
    #[arg(long, value_name = "LEVELS|all")]
    pub expand_all: Option<String>,

    /// Page to load (1-based)
    #[arg(long)]
    pub page: Option<usize>,

    /// Page size
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Input file accepted by `view`
#[derive(Debug, Deserialize)]
struct ViewInput {
    fields: Vec<FieldDef>,
    #[serde(default)]
    primary_keys: Vec<String>,
    /// Positional arrays or objects
    rows: Vec<Value>,
}

/// CLI context: resolved configuration for one invocation
pub struct CliContext {
    workspace_root: PathBuf,
    config: GroveConfig,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ConfigLoader::load(&workspace_root).context("Failed to load configuration")?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn with_config(workspace_root: PathBuf, config: GroveConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &GroveConfig {
        &self.config
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::View { input, query } => {
                let path = self.resolve(input);
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let input: ViewInput = serde_json::from_str(&text)
                    .with_context(|| format!("Invalid input file {}", path.display()))?;

                let mut primary_keys = input.primary_keys.clone();
                if primary_keys.is_empty() {
                    primary_keys = self.config.store.primary_keys.clone();
                }
                let schema = Arc::new(self.schema(input.fields, primary_keys, query));
                let rows = view_rows(&schema, &input.rows)?;
                info!(rows = rows.len(), input = %path.display(), "Viewing file");

                let backend = Arc::new(ArrayBackend::from_rows(rows));
                let store = TreeStore::new(schema, backend, StoreOptions::default());
                self.run(store, query).await
            }
            Commands::Fetch {
                url,
                fields,
                remote_sort,
                remote_filter,
                query,
            } => {
                let url = url
                    .clone()
                    .or_else(|| self.config.remote.url.clone())
                    .ok_or_else(|| anyhow!("No URL given and remote.url is not configured"))?;
                if fields.is_empty() {
                    bail!("At least one --field is required");
                }

                let schema = Arc::new(self.schema(
                    fields.clone(),
                    self.config.store.primary_keys.clone(),
                    query,
                ));
                let mut options = StoreOptions::from(&self.config.store);
                options.remote_sort |= *remote_sort;
                options.remote_filter |= *remote_filter;
                if query.limit.is_some() {
                    options.limit = query.limit;
                }

                let fetcher = HttpFetch::new(
                    self.config.remote.response_fields(),
                    self.config.remote.timeout(),
                )?;
                info!(url = %url, "Fetching remote store");
                let store = TreeStore::remote(schema, Arc::new(fetcher), url, options);
                self.run(store, query).await
            }
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn schema(&self, fields: Vec<FieldDef>, primary_keys: Vec<String>, query: &QueryArgs) -> Schema {
        let keys = if query.primary_keys.is_empty() {
            primary_keys
        } else {
            query.primary_keys.clone()
        };
        let children_field = query
            .children_field
            .clone()
            .unwrap_or_else(|| self.config.store.children_field.clone());
        Schema::new(fields)
            .with_primary_keys(keys)
            .with_children_field(children_field)
    }

    /// Apply the query to `store`, load it, and render the result.
    async fn run(&self, mut store: TreeStore, query: &QueryArgs) -> Result<String> {
        let sorters = parse_sorters(&query.sort)?;
        let filters = parse_filters(&query.filter)?;
        let mode = if query.any {
            FilterMode::Or
        } else {
            self.config.store.filter_mode
        };

        // Requested before the first load so remote parameters carry them.
        if !sorters.is_empty() {
            store.multi_sort(sorters).await;
        }
        store.set_filters(Some(filters), mode).await;
        if let Some(page) = query.page {
            store.set_page(page);
        }

        if !store.load().await {
            bail!("Failed to load records");
        }

        if let Some(depth) = &query.expand_all {
            let fetched = store.expand_all(parse_depth(depth)?).await;
            info!(fetched, "Expanded children");
        }

        match query.format.as_str() {
            "text" => Ok(format_store_text(&store)),
            "json" => Ok(format_store_json(&store)?),
            other => bail!("Invalid format: {} (must be 'text' or 'json')", other),
        }
    }
}

/// Name positional rows after `schema`; object rows pass through.
fn view_rows(schema: &Schema, rows: &[Value]) -> Result<Vec<Row>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Array(values) => Ok(schema.row_from_positional(values)),
            Value::Object(map) => Ok(map.clone()),
            other => Err(anyhow!("Row {} is neither an array nor an object: {}", index, other)),
        })
        .collect()
}

/// Parse `FIELD` or `FIELD:DIR` sort arguments.
pub fn parse_sorters(specs: &[String]) -> Result<Sorters> {
    let mut sorters = Sorters::new();
    for spec in specs {
        let (field, direction) = match spec.split_once(':') {
            Some((field, dir)) => (field, dir.parse::<SortDirection>().map_err(|e| anyhow!(e))?),
            None => (spec.as_str(), SortDirection::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            bail!("Missing field in sort '{}'", spec);
        }
        if sorters.get(field).is_none() {
            sorters.set(field, direction);
        }
    }
    Ok(sorters)
}

/// Operators recognized in filter expressions, longest first
const FILTER_OPERATORS: [(&str, FilterOperator); 7] = [
    ("!=", FilterOperator::Ne),
    ("<=", FilterOperator::Le),
    (">=", FilterOperator::Ge),
    ("=", FilterOperator::Eq),
    ("<", FilterOperator::Lt),
    (">", FilterOperator::Gt),
    ("~", FilterOperator::Like),
];

/// Parse one `FIELD<OP>VALUE` expression.
///
/// The value is read as JSON when it parses, as a plain string otherwise.
pub fn parse_filter(expr: &str) -> Result<(String, FilterCondition)> {
    let found = expr.char_indices().find_map(|(index, _)| {
        FILTER_OPERATORS
            .iter()
            .find(|(token, _)| expr[index..].starts_with(token))
            .map(|(token, operator)| (index, *token, *operator))
    });
    let Some((index, token, operator)) = found else {
        bail!("No operator in filter '{}'", expr);
    };

    let field = expr[..index].trim();
    if field.is_empty() {
        bail!("Missing field in filter '{}'", expr);
    }
    let raw = expr[index + token.len()..].trim();
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((field.to_string(), FilterCondition::new(value, operator)))
}

pub fn parse_filters(exprs: &[String]) -> Result<Filters> {
    exprs
        .iter()
        .map(|expr| parse_filter(expr))
        .collect::<Result<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}

/// Parse `--expand-all`: a level count or `all`
pub fn parse_depth(spec: &str) -> Result<ExpandDepth> {
    match spec.trim() {
        "all" | "true" => Ok(ExpandDepth::Unbounded),
        levels => levels
            .parse::<usize>()
            .map(ExpandDepth::Levels)
            .map_err(|_| anyhow!("Invalid expand depth: {} (use a number or 'all')", levels)),
    }
}
