//! Binary entry point for the stubforge CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Generate stub packages for both modules
//! stubforge generate
//!
//! # Only one module, into a custom directory
//! stubforge generate --only OpenImageIO --out-path out/stubs
//!
//! # Build the package and upload it to Test PyPI
//! stubforge publish
//!
//! # Upload to the production index
//! stubforge publish --release
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use stubforge::driver::{generate_all, GenerateOptions};
use stubforge::error::{ErrorCode, StubforgeError};
use stubforge::output::emit_response;
use stubforge::profiles::{builtin_profiles, ModuleProfile};
use stubforge::publish::{
    install_interrupt_handler, publish, PublishOptions, PublishOutcome, RestorePoint, StdinConfirm,
};
use stubforge::stubgen::{resolve_python, MypyStubgen};

// ============================================================================
// CLI Structure
// ============================================================================

/// Typing-stub tooling for the OpenImageIO and PyOpenColorIO bindings.
#[derive(Parser, Debug)]
#[command(
    name = "stubforge",
    version,
    about = "Generate and publish typing stubs for OpenImageIO and PyOpenColorIO"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for the generate command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum GenerateFormat {
    /// Human-readable per-module summary (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the stub packages.
    Generate {
        /// Only generate stubs for this module.
        #[arg(long, value_name = "MODULE")]
        only: Option<String>,
        /// Directory to write the stub packages into.
        #[arg(long, default_value = "types_oiio_python")]
        out_path: PathBuf,
        /// Python interpreter that imports the bound modules.
        #[arg(long)]
        python: Option<PathBuf>,
        /// Succeed as long as at least one module generates.
        #[arg(long)]
        best_effort: bool,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: GenerateFormat,
    },
    /// Build the package and upload it to a package index.
    Publish {
        /// Upload to PyPI instead of Test PyPI.
        #[arg(long)]
        release: bool,
        /// Directory holding README.md and the package sources.
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
        /// Python interpreter used for the build tool.
        #[arg(long)]
        python: Option<PathBuf>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.global.log_level);

    // Execute command and handle errors
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = ErrorCode::from(&err);
            eprintln!("error: {}", err);
            let _ = io::stderr().flush();
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), StubforgeError> {
    match cli.command {
        Command::Generate {
            only,
            out_path,
            python,
            best_effort,
            format,
        } => execute_generate(only, out_path, python, best_effort, format),
        Command::Publish {
            release,
            project_root,
            python,
        } => execute_publish(release, project_root, python),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

/// Execute the generate command.
fn execute_generate(
    only: Option<String>,
    out_path: PathBuf,
    python: Option<PathBuf>,
    best_effort: bool,
    format: GenerateFormat,
) -> Result<(), StubforgeError> {
    let profiles = select_profiles(only.as_deref())?;
    let python = resolve_python(python)?;
    let backend = MypyStubgen::new(python);
    let options = GenerateOptions {
        out_dir: out_path,
        require_all: !best_effort,
    };

    if format == GenerateFormat::Text {
        println!("Stub output directory: {}", options.out_dir.display());
    }

    let summary = generate_all(&profiles, &backend, &options)?;

    match format {
        GenerateFormat::Json => {
            emit_response(&summary, &mut io::stdout())
                .map_err(|e| StubforgeError::internal(e.to_string()))?;
            let _ = io::stdout().flush();
        }
        GenerateFormat::Text => {
            for report in &summary.modules {
                if let Some(path) = &report.stub_path {
                    println!("✓ Generated {} stubs: {}", report.module, path);
                } else {
                    let reason = report.error.as_deref().unwrap_or("unknown error");
                    println!("✗ Failed to generate {} stubs: {}", report.module, reason);
                }
            }
            if summary.is_ok() {
                println!("\n✓ Stub generation completed successfully!");
            } else {
                println!("\n✗ Some stub generation tasks failed");
            }
        }
    }

    if summary.is_ok() {
        Ok(())
    } else {
        Err(StubforgeError::ModulesFailed {
            failed: summary.failed(),
            total: summary.total(),
        })
    }
}

/// Pick the built-in profiles, optionally restricted to one module.
fn select_profiles(only: Option<&str>) -> Result<Vec<ModuleProfile>, StubforgeError> {
    let mut profiles = builtin_profiles();
    if let Some(module) = only {
        profiles.retain(|p| p.module == module);
        if profiles.is_empty() {
            let known: Vec<String> = builtin_profiles().into_iter().map(|p| p.module).collect();
            return Err(StubforgeError::invalid_args(format!(
                "unknown module '{}', expected one of: {}",
                module,
                known.join(", ")
            )));
        }
    }
    Ok(profiles)
}

/// Execute the publish command.
fn execute_publish(
    release: bool,
    project_root: PathBuf,
    python: Option<PathBuf>,
) -> Result<(), StubforgeError> {
    let python = resolve_python(python)?;
    let options = PublishOptions {
        release,
        project_root,
        python,
    };

    let restore = RestorePoint::default();
    install_interrupt_handler(&restore)?;

    match publish(&options, &restore, &StdinConfirm)? {
        PublishOutcome::Published { .. } => println!("✓ Publishing completed successfully!"),
        PublishOutcome::Declined => println!("Aborted."),
        PublishOutcome::NothingToPublish => println!("No files to publish."),
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
