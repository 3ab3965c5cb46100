//! CLI entry point for the cm-dictionary engine.
//!
//! This binary validates, compiles, and diffs content-model documents.
//!
//! # Usage
//!
//! ```bash
//! cm-dict [OPTIONS] <COMMAND>
//!
//! # Validate an ordered set of model documents
//! cm-dict validate models/core.json models/custom.json
//!
//! # Compile and print a dictionary summary (or full JSON)
//! cm-dict compile models/*.json --labels labels/en.json
//! cm-dict compile models/*.json --format json
//!
//! # Diff two versions of a model set
//! cm-dict diff --old v1/model.json --new v2/model.json
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]
// A CLI prints its results to stdout.
#![allow(clippy::print_stdout)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use cm_compiler::CompiledModel;
use cm_core::{QName, Tenant};
use cm_diff::{ModelDiffReport, diff_models};
use cm_registry::{DictionaryBootstrap, DictionarySession, ModelResource};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// CLI tool for validating, compiling, and diffing content-model documents.
#[derive(Parser)]
#[command(name = "cm-dict", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Parse and compile model documents, reporting the first failure.
    Validate {
        /// Model documents, in dependency order.
        #[arg(required = true)]
        models: Vec<Utf8PathBuf>,
    },

    /// Compile model documents and print the resulting dictionary.
    Compile {
        /// Model documents, in dependency order.
        #[arg(required = true)]
        models: Vec<Utf8PathBuf>,

        /// Label bundles to load alongside the models.
        #[arg(short, long)]
        labels: Vec<Utf8PathBuf>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Diff two versions of a model set and classify the changes.
    Diff {
        /// The old model documents, in dependency order.
        #[arg(long, required = true, num_args = 1..)]
        old: Vec<Utf8PathBuf>,

        /// The new model documents, in dependency order.
        #[arg(long, required = true, num_args = 1..)]
        new: Vec<Utf8PathBuf>,

        /// Restrict the diff to one model (prefixed name, e.g. `ex:example`).
        #[arg(short, long)]
        model: Option<String>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Report output format.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// JSON.
    Json,
}

// =============================================================================
// INITIALIZATION
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise uses
/// `debug` level with `--verbose`, or `info` by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(level.to_owned())
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Bootstraps a fresh session from an ordered list of model files.
fn load_session(
    models: &[Utf8PathBuf],
    labels: &[Utf8PathBuf],
) -> color_eyre::Result<DictionarySession> {
    let session = DictionarySession::default();
    let mut bootstrap = DictionaryBootstrap::new();
    for path in models {
        bootstrap.add_model(ModelResource::path(path.clone()));
    }
    for path in labels {
        bootstrap.add_label_bundle(ModelResource::path(path.clone()));
    }
    bootstrap
        .bootstrap(&session)
        .map_err(|e| color_eyre::eyre::eyre!("[{}] {e}", e.message_id()))?;
    Ok(session)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Validates model documents by bootstrapping them into a throwaway
/// session.
fn run_validate(models: &[Utf8PathBuf]) -> color_eyre::Result<()> {
    info!(models = models.len(), "Validating models");
    let session = load_session(models, &[])?;

    let count = session.model_count(&Tenant::default());
    println!("OK: {count} model(s) compiled cleanly");
    Ok(())
}

/// Compiles model documents and prints the dictionary.
async fn run_compile(
    models: &[Utf8PathBuf],
    labels: &[Utf8PathBuf],
    format: OutputFormat,
    output: Option<Utf8PathBuf>,
) -> color_eyre::Result<()> {
    info!(models = models.len(), "Compiling models");
    let session = load_session(models, labels)?;
    let dictionary = session
        .get_dictionary(&Tenant::default())
        .await
        .map_err(|e| color_eyre::eyre::eyre!("[{}] {e}", e.message_id()))?;

    let content = match format {
        OutputFormat::Json => {
            let models: Vec<&CompiledModel> = dictionary.models().collect();
            serde_json::to_string_pretty(&models)?
        }
        OutputFormat::Text => {
            let mut text = String::new();
            render_summary(&mut text, &dictionary)?;
            text
        }
    };

    if let Some(path) = output {
        std::fs::write(path.as_std_path(), &content)?;
        info!(path = %path, "Report written");
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{content}")?;
    }
    Ok(())
}

/// Diffs two versions of a model set.
async fn run_diff(
    old: &[Utf8PathBuf],
    new: &[Utf8PathBuf],
    model: Option<&str>,
    format: OutputFormat,
) -> color_eyre::Result<()> {
    let old_session = load_session(old, &[])?;
    let new_session = load_session(new, &[])?;
    let tenant = Tenant::default();
    let old_dictionary = old_session
        .get_dictionary(&tenant)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("[{}] {e}", e.message_id()))?;
    let new_dictionary = new_session
        .get_dictionary(&tenant)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("[{}] {e}", e.message_id()))?;

    // Decide which model names to diff.
    let names: Vec<QName> = match model {
        Some(prefixed) => {
            let name = old_dictionary
                .resolve_name(prefixed)
                .or_else(|_| new_dictionary.resolve_name(prefixed))
                .map_err(|e| color_eyre::eyre::eyre!("[{}] {e}", e.message_id()))?;
            vec![name]
        }
        None => {
            let core = QName::new(cm_compiler::CORE_DATATYPE_URI, "dictionary");
            let mut names: Vec<QName> = old_dictionary
                .models()
                .chain(new_dictionary.models())
                .map(|m| m.name().clone())
                .filter(|n| *n != core)
                .collect();
            names.sort();
            names.dedup();
            names
        }
    };

    let mut sections = Vec::with_capacity(names.len());
    for name in names {
        let report = diff_models(
            old_dictionary.model(&name),
            new_dictionary.model(&name),
        )
        .map_err(|e| color_eyre::eyre::eyre!("[{}] {e}", e.message_id()))?;
        sections.push(DiffSection {
            model: name,
            incremental: report.is_incremental(),
            report,
        });
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sections)?);
        }
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            for section in &sections {
                render_diff_section(&mut handle, section)?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// One model's diff in the report output.
#[derive(Serialize)]
struct DiffSection {
    model: QName,
    incremental: bool,
    report: ModelDiffReport,
}

fn render_summary(
    out: &mut String,
    dictionary: &cm_compiler::CompiledDictionary,
) -> color_eyre::Result<()> {
    use std::fmt::Write;

    writeln!(out, "Compiled Dictionary")?;
    writeln!(out, "===================")?;
    for model in dictionary.models() {
        let info = model.info();
        writeln!(out)?;
        writeln!(out, "model {}", info.prefixed_name)?;
        if let Some(description) = &info.description {
            writeln!(out, "  {description}")?;
        }
        writeln!(
            out,
            "  types: {}, aspects: {}, properties: {}, associations: {}, constraints: {}, data types: {}",
            model.iter_types().count(),
            model.iter_aspects().count(),
            model.iter_properties().count(),
            model.iter_associations().count(),
            model.iter_constraints().count(),
            model.iter_data_types().count(),
        )?;
    }
    Ok(())
}

fn render_diff_section(
    handle: &mut impl Write,
    section: &DiffSection,
) -> color_eyre::Result<()> {
    let verdict = if section.incremental {
        "incremental"
    } else {
        "breaking"
    };
    writeln!(handle)?;
    writeln!(handle, "model {} [{verdict}]", section.model)?;
    for entry in section.report.entries() {
        writeln!(
            handle,
            "  {:?} {} -> {:?}",
            entry.element, entry.name, entry.kind
        )?;
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    match &cli.command {
        Commands::Validate { models } => run_validate(models),
        Commands::Compile {
            models,
            labels,
            format,
            output,
        } => run_compile(models, labels, *format, output.clone()).await,
        Commands::Diff {
            old,
            new,
            model,
            format,
        } => run_diff(old, new, model.as_deref(), *format).await,
    }
}
