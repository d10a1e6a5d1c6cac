//! Command-line front end for x86-64 instruction selection.
//!
//! ```bash
//! # Print the machine IR of a JSON-serialized module
//! fp-x64 lower module.json
//!
//! # Dump it as JSON instead, with a custom intrinsic marker
//! fp-x64 --config win64.json lower module.json --emit json --output module.mir.json
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::{Result, WrapErr};
use fp_codegen_core::ir::Module;
use fp_codegen_core::pretty::{pretty, PrettyOptions};
use fp_x64_isel::{LoweringConfig, X64Lowering};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "fp-x64",
    version = env!("CARGO_PKG_VERSION"),
    about = "Lower SSA IR modules to x86-64 machine IR (Windows x64 ABI)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Set log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Lowering configuration (JSON); defaults to the Win64 ABI
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a JSON-serialized IR module
    Lower(LowerArgs),
}

#[derive(Args)]
struct LowerArgs {
    /// Input module (JSON)
    input: PathBuf,

    /// Output representation
    #[arg(long, value_enum, default_value = "text")]
    emit: EmitKind,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Omit machine types from operands in text output
    #[arg(long)]
    no_types: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmitKind {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet, cli.log, cli.log_format);

    let config = load_config(cli.config.as_deref())?;
    let result = match cli.command {
        Commands::Lower(args) => lower_command(args, config),
    };

    if let Err(e) = result {
        error!("{e:#}");
        if cli.verbose > 0 {
            error!(?e, "detailed error context");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<LoweringConfig> {
    let Some(path) = path else {
        return Ok(LoweringConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("parsing config {}", path.display()))
}

fn lower_command(args: LowerArgs, config: LoweringConfig) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .wrap_err_with(|| format!("reading {}", args.input.display()))?;
    let module: Module = serde_json::from_str(&text)
        .wrap_err_with(|| format!("parsing module {}", args.input.display()))?;
    info!(module = %module.name, input = %args.input.display(), "loaded module");

    let lowered = X64Lowering::new(config).lower(&module)?;
    let rendered = match args.emit {
        EmitKind::Text => {
            let options = PrettyOptions {
                show_types: !args.no_types,
                ..PrettyOptions::default()
            };
            pretty(&lowered, options).to_string()
        }
        EmitKind::Json => serde_json::to_string_pretty(&lowered)?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .wrap_err_with(|| format!("writing {}", path.display()))?;
            info!(output = %path.display(), "wrote machine module");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool, log_level: Option<LogLevel>, log_format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // stdout carries the emitted module.
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    match log_format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(formatter)
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(formatter.json())
                .with(filter)
                .init();
        }
    }
}
