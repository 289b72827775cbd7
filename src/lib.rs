//! Convgraph: object format conversion graphs for PIM synchronization.
//!
//! Sync members store contacts, events and notes in their own formats.
//! Convgraph keeps a registry of object types and formats, a graph of
//! converter edges between them, and finds the cheapest chain of converters
//! that brings a change into a format the receiving side accepts, checking
//! the data with detectors along the way.
//!
//! # Modules
//!
//! - [`registry`]: Object types, formats and their hooks
//! - [`converter`]: Converter edges, data detectors and their registry
//! - [`env`]: The format environment tying registries and operations together
//! - [`path`]: Path costs, target sets and the path finder
//! - [`conversion`]: Path execution and conversion reports
//! - [`plugin`]: Two-phase format plugin loading
//! - [`manifest`]: Declarative graphs in YAML or JSON
//! - [`validation`]: Graph consistency checks
//! - [`inspect`]: Graph summaries
//! - [`error`]: Error types for convgraph operations

pub mod change;
pub mod conversion;
pub mod converter;
pub mod env;
pub mod error;
pub mod inspect;
pub mod manifest;
pub mod path;
pub mod plugin;
pub mod registry;
pub mod transform;
pub mod validation;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

pub use change::Change;
pub use conversion::ConversionReport;
pub use converter::{Conversion, ConvertError, Converted, ConverterFlags, ConverterKind};
pub use env::FormatEnv;
pub use error::ConvGraphError;
pub use path::{KnownObjType, Path, PathCost, Target, TargetFn};
pub use plugin::{FormatPlugin, PluginLoadReport};
pub use registry::{CompareResult, FormatId, ObjTypeId};

/// The convgraph CLI application.
#[derive(Parser)]
#[command(name = "convgraph")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log search and conversion steps to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check a format graph for unresolved and unreachable parts.
    Check(CheckArgs),
    /// List the object types, formats and converters of a graph.
    List(ListArgs),
    /// Find the cheapest conversion path between formats.
    Path(PathArgs),
    /// Convert a file along the cheapest path.
    Convert(ConvertArgs),
    /// Detect the format of a file's contents.
    Detect(DetectArgs),
}

/// Manifests making up the graph.
#[derive(clap::Args)]
struct GraphArgs {
    /// Graph manifest (YAML, or JSON by extension). Repeat to load several.
    #[arg(
        short,
        long = "graph",
        required = true,
        env = "CONVGRAPH_GRAPH",
        value_delimiter = ','
    )]
    graphs: Vec<PathBuf>,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the list subcommand.
#[derive(clap::Args)]
struct ListArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the path subcommand.
#[derive(clap::Args)]
struct PathArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Source format.
    #[arg(long)]
    from: String,

    /// Acceptable target format. Repeat for several.
    #[arg(long, required = true)]
    to: Vec<String>,

    /// Sample data; enables detection during the search.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Source format of the input.
    #[arg(long)]
    from: String,

    /// Acceptable target format. Repeat for several.
    #[arg(long, required = true)]
    to: Vec<String>,

    /// Input file.
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the converted data (stdout if omitted).
    #[arg(short = 'o', long)]
    output_file: Option<PathBuf>,
}

/// Arguments for the detect subcommand.
#[derive(clap::Args)]
struct DetectArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Format the input is labelled with.
    #[arg(long)]
    from: String,

    /// Input file.
    #[arg(short, long)]
    input: PathBuf,

    /// Unwrap containers and keep detecting down to the innermost format.
    #[arg(long)]
    full: bool,
}

/// Run the convgraph CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), ConvGraphError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::List(args)) => run_list(args),
        Some(Commands::Path(args)) => run_path(args),
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Detect(args)) => run_detect(args),
        None => {
            println!("convgraph {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Object format conversion graphs for PIM synchronization.");
            println!();
            println!("Run 'convgraph --help' for usage information.");
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("convgraph=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when run() is called twice in
    // one process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), ConvGraphError> {
    let env = manifest::load_graph(&args.graph.graphs)?;
    let report = validation::validate_graph(&env);

    match args.output.as_str() {
        "json" => print_json(&report)?,
        "text" => print!("{}", report),
        other => return Err(unsupported_output(other)),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(ConvGraphError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the list subcommand.
fn run_list(args: ListArgs) -> Result<(), ConvGraphError> {
    let env = manifest::load_graph(&args.graph.graphs)?;
    let report = inspect::inspect_graph(&env);

    match args.output.as_str() {
        "json" => print_json(&report),
        "text" => {
            print!("{}", report);
            Ok(())
        }
        other => Err(unsupported_output(other)),
    }
}

/// Execute the path subcommand.
fn run_path(args: PathArgs) -> Result<(), ConvGraphError> {
    if !matches!(args.output.as_str(), "text" | "json") {
        return Err(unsupported_output(&args.output));
    }

    let env = manifest::load_graph(&args.graph.graphs)?;
    let targets = resolve_formats(&env, &args.to)?;
    let data = args.input.as_deref().map(fs::read).transpose()?;
    let change = env.new_change("input", &args.from, data)?;

    let path = env
        .find_path(&change, &targets)
        .ok_or_else(|| ConvGraphError::NoPath {
            from: args.from.clone(),
            targets: args.to.join(", "),
        })?;
    let report = env.conversion_report(&path, &targets);

    if args.output == "json" {
        print_json(&report)
    } else {
        print!("{}", report);
        Ok(())
    }
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), ConvGraphError> {
    let env = manifest::load_graph(&args.graph.graphs)?;
    let targets = resolve_formats(&env, &args.to)?;
    let data = fs::read(&args.input)?;
    let mut change = env.new_change(args.input.display().to_string(), &args.from, Some(data))?;

    let path = env.convert_to(&mut change, &targets)?;
    let report = env.conversion_report(&path, &targets);
    for message in report.warning_messages() {
        tracing::warn!("{message}");
    }

    let output = change.into_data().unwrap_or_default();
    match &args.output_file {
        Some(path) => {
            fs::write(path, &output)?;
            println!(
                "Converted {} from {} to {} ({} step(s)) -> {}",
                args.input.display(),
                report.from,
                report.reached,
                report.steps.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Execute the detect subcommand.
fn run_detect(args: DetectArgs) -> Result<(), ConvGraphError> {
    let env = manifest::load_graph(&args.graph.graphs)?;
    let data = fs::read(&args.input)?;
    let change = env.new_change(args.input.display().to_string(), &args.from, Some(data))?;

    let detected = if args.full {
        Some(env.detect_objformat_full(&change)?)
    } else {
        env.detect_objformat(&change)
    };

    match detected {
        Some(format) => println!("{}", env.format_name(format)),
        None => println!("{} (no detector matched)", args.from),
    }
    Ok(())
}

fn resolve_formats(env: &FormatEnv, names: &[String]) -> Result<Vec<FormatId>, ConvGraphError> {
    names
        .iter()
        .map(|name| {
            env.find_objformat(name)
                .ok_or_else(|| ConvGraphError::UnknownFormat(name.clone()))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ConvGraphError> {
    let json = serde_json::to_string_pretty(value).map_err(ConvGraphError::ReportJson)?;
    println!("{json}");
    Ok(())
}

fn unsupported_output(other: &str) -> ConvGraphError {
    ConvGraphError::UnsupportedOutput(format!("'{}' (supported: text, json)", other))
}
