#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the AV service map data toolchain.
//!
//! Wraps the three dataset operations: validate the events CSV and its
//! geometry files, check the CSV header layout against the schema, and
//! import the dataset into Supabase.

use std::path::PathBuf;
use std::process::exit;

use av_map_import::ImportConfig;
use av_map_schema::Schema;
use av_map_validate::Severity;
use clap::{Parser, Subcommand};
use dialoguer::Input;

#[derive(Parser)]
#[command(name = "av_map_cli", about = "AV service map dataset toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the events CSV and geometry files
    Validate {
        /// Path to the events CSV
        #[arg(long, default_value = "events.csv")]
        csv: PathBuf,
        /// Directory holding the GeoJSON boundary files
        #[arg(long, default_value = "geometries")]
        geometries: PathBuf,
        /// Schema file to validate against (defaults to the built-in schema)
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Check the CSV headers against the schema and print a schema summary
    CheckSchema {
        /// Path to the events CSV
        #[arg(long, default_value = "events.csv")]
        csv: PathBuf,
        /// Schema file to check against (defaults to the built-in schema)
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Import the events CSV into Supabase
    Import {
        /// Path to the events CSV
        #[arg(long, default_value = "events.csv")]
        csv: PathBuf,
    },
}

fn load_schema(path: Option<&PathBuf>) -> Result<Schema, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => Schema::load(path)?,
        None => Schema::builtin(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            csv,
            geometries,
            schema,
        } => {
            let schema = load_schema(schema.as_ref())?;
            log::info!(
                "Validating {} against schema version {}",
                csv.display(),
                schema.version()
            );
            let report = av_map_validate::run(&csv, &geometries, &schema)?;

            for issue in &report.issues {
                if issue.severity == Severity::Error {
                    println!("{issue}");
                }
            }
            for issue in &report.issues {
                if issue.severity == Severity::Warning {
                    println!("{issue}");
                }
            }

            println!(
                "{} error(s), {} warning(s)",
                report.error_count(),
                report.warning_count()
            );
            if report.passed() {
                println!("Validation passed");
            } else {
                println!("Validation failed");
                exit(1);
            }
        }
        Commands::CheckSchema { csv, schema } => {
            let schema = load_schema(schema.as_ref())?;
            let events = av_map_events::EventsFile::read(&csv)?;
            let drift = av_map_validate::drift::check_headers(&events.headers, &schema);

            if !drift.matches {
                println!("CSV headers do not match the schema");
                println!("Expected: {:?}", drift.expected);
                println!("Found:    {:?}", drift.found);
                if !drift.missing.is_empty() {
                    println!("Missing columns: {:?}", drift.missing);
                }
                if !drift.extra.is_empty() {
                    println!("Extra columns: {:?}", drift.extra);
                }
                exit(1);
            }

            println!("CSV headers match schema version {}", schema.version());
            println!("Columns: {}", schema.columns().len());
            println!(
                "Required columns: {}",
                schema.required_columns().join(", ")
            );
            println!("Event types: {}", schema.event_types().len());
            for event_type in schema.event_types() {
                println!(
                    "  {event_type}: {} required field(s)",
                    schema.required_fields(event_type).len()
                );
            }
        }
        Commands::Import { csv } => {
            let config = ImportConfig::from_env()?;
            println!(
                "Importing to {} ({})",
                config.events_table(),
                config.environment()
            );

            if !config.staging && !config.ci {
                let answer: String = Input::new()
                    .with_prompt("This will OVERWRITE the production table. Type PRODUCTION to continue")
                    .allow_empty(true)
                    .interact_text()?;
                if answer != "PRODUCTION" {
                    println!("Import cancelled");
                    return Ok(());
                }
            }

            log::info!(
                "Starting import of {} ({} environment)",
                csv.display(),
                config.environment()
            );
            let summary = av_map_import::run(&config, &csv).await?;
            println!(
                "Imported {} event(s) into {}",
                summary.imported, summary.table
            );
        }
    }

    Ok(())
}
