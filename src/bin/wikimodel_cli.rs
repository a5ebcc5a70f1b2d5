//! WikiModel CLI
//!
//! Commands: validate, generate, stats, schema-docs
//! JSON goes to stdout, logs go to stderr.
//! Returns 2 when validation found errors.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wikimodel_core::{
    documentation::schema_to_table,
    schema::{field_schema, form_schema, model_schema, settings_schema},
    Pipeline, PipelineError, Registry, Settings, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "wikimodel-cli")]
#[command(about = "WikiModel CLI - validate an expanded model and generate wiki pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the settings JSON file
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both integrity passes
    Validate {
        /// Registry snapshot (JSON)
        #[arg(short, long)]
        registry: PathBuf,
    },

    /// Generate all pages
    Generate {
        /// Registry snapshot (JSON)
        #[arg(short, long)]
        registry: PathBuf,
    },

    /// Generate and print the statistics summary
    Stats {
        /// Registry snapshot (JSON)
        #[arg(short, long)]
        registry: PathBuf,
    },

    /// Render a schema as an HTML table
    SchemaDocs {
        #[arg(value_enum)]
        schema: SchemaKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    Field,
    Model,
    Form,
    Settings,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Value, String> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read settings {}: {}", path.display(), e))?;
            serde_json::from_str(&content)
                .map_err(|e| format!("Invalid settings {}: {}", path.display(), e))
        }
        None => Ok(json!({})),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), PipelineError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    println!("{}", json!({"success": false, "error": message.to_string()}));
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let settings = match load_settings(cli.settings.as_deref()) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let pipeline = Pipeline::new();

    match cli.command {
        Commands::Validate { registry } => {
            let registry = match Registry::load_from_file(&registry) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };

            match pipeline.check(&settings, &registry) {
                Ok(report) => {
                    if let Err(e) = print_json(&report) {
                        return fail(e);
                    }
                    if report.has_errors() {
                        ExitCode::from(2)
                    } else {
                        ExitCode::SUCCESS
                    }
                }
                Err(e) => fail(e),
            }
        }

        Commands::Generate { registry } => {
            let mut registry = match Registry::load_from_file(&registry) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };

            match pipeline.run(&settings, &mut registry) {
                Ok(report) => {
                    let output = json!({
                        "success": true,
                        "engineVersion": ENGINE_VERSION,
                        "runId": report.run_id,
                        "generated": registry.generated,
                        "statistics": report.statistics,
                    });
                    match print_json(&output) {
                        Ok(()) => ExitCode::SUCCESS,
                        Err(e) => fail(e),
                    }
                }
                Err(e) => fail(e),
            }
        }

        Commands::Stats { registry } => {
            let mut registry = match Registry::load_from_file(&registry) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };
            let build_graph = Settings::from_value_lenient(&settings)
                .map(|(s, _)| s.build_graph)
                .unwrap_or(false);

            match pipeline.run(&settings, &mut registry) {
                Ok(report) => {
                    for line in report.statistics.unwrap_or_default().summary_lines(build_graph) {
                        println!("{}", line);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }

        Commands::SchemaDocs { schema } => {
            let (definition, record_type) = match schema {
                SchemaKind::Field => (field_schema(), Some("field")),
                SchemaKind::Model => (model_schema(), Some("model")),
                SchemaKind::Form => (form_schema(), Some("form")),
                SchemaKind::Settings => (settings_schema(), None),
            };
            println!("{}", schema_to_table(&definition, record_type));
            ExitCode::SUCCESS
        }
    }
}
