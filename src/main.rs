//! migrate-plan CLI
//!
//! Loads two declarative schema files (TOML) and prints the ordered DDL
//! operations that transform the source into the target, or reports
//! any foreign keys MySQL would reject with error 1215.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use migrate_plan::{config::Config, planner, schema_file};

#[derive(Parser, Debug)]
#[command(name = "migrate-plan")]
#[command(about = "Plans ordered DDL operations between two MySQL schemas", long_about = None)]
struct Args {
    /// Path to the target schema (TOML)
    #[arg(long)]
    to: PathBuf,

    /// Path to the source schema (TOML). Omit to plan from an empty database.
    #[arg(long)]
    from: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "migrate-plan.toml")]
    config: PathBuf,

    /// Override output format (text, json)
    #[arg(long)]
    format: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = if args.config.exists() {
        Config::from_file(&args.config).context("failed to load configuration")?
    } else {
        Config::default()
    };

    let format = args
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .to_string();

    let db_to = schema_file::load(&args.to)
        .with_context(|| format!("failed to load target schema {}", args.to.display()))?;
    let db_from = args
        .from
        .as_deref()
        .map(schema_file::load)
        .transpose()
        .context("failed to load source schema")?;

    let result = planner::plan(&db_to, db_from.as_ref());

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    if !result.errors_1215.is_empty() {
        eprintln!(
            "Cannot generate migration plan: the target schema has unsatisfiable foreign keys."
        );
        for error in &result.errors_1215 {
            eprintln!("  1215: {error}");
        }
        std::process::exit(1);
    }

    match format.as_str() {
        "json" => {
            let rendered: Vec<String> =
                result.operations.iter().map(|op| op.to_string()).collect();
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        _ => {
            println!("{result}");
        }
    }

    if let Some(snapshot_path) = &config.output.snapshot_path {
        schema_file::save(&db_to, snapshot_path).context("failed to write schema snapshot")?;
    }

    Ok(())
}
