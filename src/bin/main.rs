//! cubeq CLI - Build, validate and run cube queries
//!
//! Usage:
//!   cubeq meta
//!   cubeq validate <query.json>
//!   cubeq run <query.json> [--limit <n>]
//!   cubeq filters <query.json>
//!
//! Examples:
//!   cubeq meta
//!   cubeq validate queries/orders_by_status.json
//!   cubeq run queries/orders_by_status.json --limit 20
//!   CUBEQ_CONFIG=./staging.toml cubeq filters saved.json

use clap::{Parser, Subcommand};
use cubeq::builder::{QueryBuilder, SchemaStatus, ValidationStatus};
use cubeq::client::HttpCubeClient;
use cubeq::config::Settings;
use cubeq::filter::{count_leaves, FilterNode};
use cubeq::persist::{save_persisted, PersistedState};
use cubeq::query::{normalize_query, CubeQuery};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cubeq")]
#[command(about = "cubeq - Build, validate and run queries against a cube semantic layer")]
#[command(version)]
struct Cli {
    /// Path to a cubeq.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cubes and their members
    Meta,

    /// Dry-run a query and print the generated SQL
    Validate {
        /// Query file (a bare query or a saved `{"query": ...}` snapshot)
        file: PathBuf,
    },

    /// Validate then run a query, printing rows and the total row count
    Run {
        /// Query file (a bare query or a saved `{"query": ...}` snapshot)
        file: PathBuf,

        /// Number of rows to display
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Show the filter tree of a query and check it against the schema
    Filters {
        /// Query file (a bare query or a saved `{"query": ...}` snapshot)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using default settings");
        Settings::default()
    });
    if let Some(url) = cli.url {
        settings.api.url = url;
    }

    let client = match HttpCubeClient::new(&settings.api) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let builder = QueryBuilder::with_settings(client, &settings.builder);
    let snapshot_path = match settings.persistence.resolved_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Meta => cmd_meta(&builder).await,
        Commands::Validate { file } => cmd_validate(&builder, &file).await,
        Commands::Run { file, limit } => {
            cmd_run(&builder, &file, limit, snapshot_path.as_deref()).await
        }
        Commands::Filters { file } => cmd_filters(&builder, &file).await,
    }
}

fn read_query(file: &Path) -> Result<CubeQuery, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&source)
        .map_err(|e| format!("Error parsing '{}': {}", file.display(), e))?;

    let parsed = if value.get("query").is_some() {
        serde_json::from_value::<PersistedState>(value).map(|s| s.query)
    } else {
        serde_json::from_value::<CubeQuery>(value)
    };
    parsed.map_err(|e| format!("Error reading query from '{}': {}", file.display(), e))
}

async fn load_schema(builder: &QueryBuilder) -> Result<(), String> {
    builder.load_schema().await;
    let state = builder.state();
    match state.schema_status {
        SchemaStatus::Success => Ok(()),
        _ => Err(state
            .schema_error
            .unwrap_or_else(|| "schema unavailable".to_string())),
    }
}

async fn cmd_meta(builder: &QueryBuilder) -> ExitCode {
    if let Err(e) = load_schema(builder).await {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    let Some(schema) = builder.state().schema else {
        return ExitCode::FAILURE;
    };

    for cube in &schema.cubes {
        println!("{}", cube.name);
        for measure in &cube.measures {
            println!("  measure    {}", measure.name);
        }
        for dimension in &cube.dimensions {
            println!(
                "  dimension  {} ({})",
                dimension.name,
                String::from(dimension.member_type.clone())
            );
        }
        for segment in &cube.segments {
            println!("  segment    {}", segment.name);
        }
        println!();
    }
    ExitCode::SUCCESS
}

/// Load a query into the builder and dry-run it.
async fn prepare(builder: &QueryBuilder, file: &Path) -> Result<(), String> {
    let query = read_query(file)?;
    if query.is_empty() {
        return Err("query selects no measures or dimensions".to_string());
    }
    builder.set_query(query);

    match builder.validate_now().await {
        ValidationStatus::Valid => Ok(()),
        _ => Err(builder
            .state()
            .validation_error
            .unwrap_or_else(|| "query is invalid".to_string())),
    }
}

async fn cmd_validate(builder: &QueryBuilder, file: &Path) -> ExitCode {
    if let Err(e) = prepare(builder, file).await {
        eprintln!("Invalid: {}", e);
        return ExitCode::FAILURE;
    }

    println!("OK: {} is valid", file.display());
    if let Some(sql) = builder.state().validation_sql {
        println!();
        println!("{}", sql);
    }
    ExitCode::SUCCESS
}

async fn cmd_run(
    builder: &QueryBuilder,
    file: &Path,
    limit: Option<u64>,
    snapshot_path: Option<&Path>,
) -> ExitCode {
    if let Some(limit) = limit {
        if let Err(e) = builder.set_display_limit(limit).await {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }
    if let Err(e) = prepare(builder, file).await {
        eprintln!("Invalid: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = builder.execute().await {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let state = builder.state();
    if let Some(error) = state.execution_error {
        eprintln!("Error: {}", error);
        return ExitCode::FAILURE;
    }

    if let Some(path) = snapshot_path {
        if let Err(e) = save_persisted(path, &builder.snapshot()) {
            tracing::warn!(path = %path.display(), error = %e, "failed to save query");
        }
    }

    let output = serde_json::json!({
        "query": normalize_query(&state.query),
        "rows": state.execution_results.map(|r| r.data).unwrap_or_default(),
        "totalRowCount": state.total_row_count,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

async fn cmd_filters(builder: &QueryBuilder, file: &Path) -> ExitCode {
    let query = match read_query(file) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Filters ({} conditions):", count_leaves(&query.filters));
    for node in &query.filters {
        print_node(node, 1);
    }
    builder.set_query(query);

    if let Err(e) = load_schema(builder).await {
        eprintln!("Schema unavailable, skipping checks: {}", e);
        return ExitCode::SUCCESS;
    }

    let issues = builder.filter_issues();
    if issues.is_empty() {
        println!();
        println!("OK: all filters match the schema");
        return ExitCode::SUCCESS;
    }

    eprintln!();
    eprintln!("Filter issues:");
    for issue in &issues {
        eprintln!("  {}", issue);
    }
    ExitCode::FAILURE
}

fn print_node(node: &FilterNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        FilterNode::Simple(leaf) if leaf.is_malformed() => {
            println!("{}<unrecognized> {}", indent, leaf.raw().cloned().unwrap_or_default());
        }
        FilterNode::Simple(leaf) => {
            println!(
                "{}{} {} {}",
                indent,
                leaf.member,
                leaf.operator,
                leaf.values.join(", ")
            );
        }
        FilterNode::Group(group) => {
            println!("{}{}", indent, group.kind.as_str().to_uppercase());
            for child in &group.children {
                print_node(child, depth + 1);
            }
        }
    }
}
