//! Launcher for `harness = false` test binaries.
//!
//! A test target registers its classes in a [`CandidatePool`] and hands it to [`run`]:
//!
//! ```rust,no_run
//! use paramtest::prelude::*;
//!
//! # #[derive(Default)] struct Numbers;
//! # impl TestClass for Numbers {
//! #     fn definition() -> ClassDef<Self> { ClassDef::new("Numbers") }
//! # }
//! fn main() {
//!     paramtest::cli::run(CandidatePool::new().with_class::<Numbers>());
//! }
//! ```
//!
//! ## Modules
//!
//! - `reporter` - Console and JSON listeners, plan rendering
//! - `selection` - Tag, keyword, and explicit method filters
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Internal functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod reporter;
pub mod selection;

use std::ffi::OsString;
use std::fmt;
use std::process;

use clap::{Parser, ValueEnum};

use crate::config::{OutputFormat, RunConfig};
use crate::engine::discovery::{CandidatePool, discover};
use crate::engine::errors::ConfigError;
use crate::engine::executor::StagedExecutor;
use crate::engine::listener::{ExecutionListener, NotifyPolicy};

use reporter::{ConsoleReporter, JsonReporter, render_plan};
use selection::Selection;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Configuration or usage error; nothing was executed.
    pub const CONFIG: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let rendered = format!("{:?}", miette::Report::new(err));
        Self::new(rendered, ExitCode::CONFIG)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    #[value(alias = "pretty", alias = "terse")]
    Console,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Console => OutputFormat::Console,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Parameterized test runner
#[derive(Parser, Debug)]
#[command(name = "paramtest")]
#[command(version = VERSION)]
#[command(about = "Run parameterized test classes", long_about = None)]
pub struct Cli {
    /// Only run classes or tests whose name contains FILTER
    #[arg(value_name = "FILTER")]
    pub filter: Option<String>,

    /// Filter tests by keyword expression
    #[arg(short = 'k', value_name = "EXPR")]
    pub keyword: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only run classes carrying TAG (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Skip classes carrying TAG (repeatable)
    #[arg(long = "exclude-tag", value_name = "TAG")]
    pub exclude_tags: Vec<String>,

    /// Run only CLASS::METHOD, or a whole CLASS (repeatable)
    #[arg(long = "select", value_name = "CLASS::METHOD")]
    pub select: Vec<String>,

    /// Print the discovered tree and exit
    #[arg(long)]
    pub list: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Console)]
    pub format: FormatArg,

    /// Disable ANSI colours
    #[arg(long)]
    pub no_color: bool,

    /// Do not capture backtraces for failures
    #[arg(long)]
    pub no_backtrace: bool,

    /// Maximum number of frames per failure trace
    #[arg(long, value_name = "N")]
    pub trace_depth: Option<usize>,

    /// Report class nodes even when only one class runs
    #[arg(long)]
    pub full_tree: bool,

    // libtest compatibility; accepted and ignored
    #[arg(long, hide = true)]
    pub nocapture: bool,
    #[arg(long, hide = true)]
    pub show_output: bool,
    #[arg(long, hide = true)]
    pub exact: bool,
    #[arg(long, hide = true)]
    pub ignored: bool,
    #[arg(long, hide = true)]
    pub include_ignored: bool,
    #[arg(short = 'q', long, hide = true)]
    pub quiet: bool,
    #[arg(long = "test-threads", value_name = "N", hide = true)]
    pub test_threads: Option<usize>,
    #[arg(long = "color", value_name = "WHEN", hide = true)]
    pub color_when: Option<String>,
    #[arg(long, hide = true)]
    pub bench: bool,
    #[arg(long, hide = true)]
    pub test: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        let mut config = RunConfig::from_env()
            .with_verbose(self.verbose)
            .with_format(self.format.into());
        if self.no_color || self.color_when.as_deref() == Some("never") {
            config = config.with_color(false);
        }
        if self.no_backtrace {
            config = config.with_capture_backtrace(false);
        }
        if let Some(depth) = self.trace_depth {
            config = config.with_trace_depth(depth);
        }
        if self.full_tree {
            config = config.with_notify(NotifyPolicy::Full);
        }
        config
    }

    pub fn selection(&self) -> Selection {
        Selection {
            keyword: self.keyword.clone().or_else(|| self.filter.clone()),
            tags: self.tags.clone(),
            exclude_tags: self.exclude_tags.clone(),
            selectors: self.select.clone(),
        }
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main entry point for a test binary.
///
/// This is the only place where `process::exit` is called.
pub fn run(pool: CandidatePool) -> ! {
    init_tracing();
    let code = run_with_args(pool, std::env::args_os());
    process::exit(code.0)
}

/// Parse `args`, run the pool, print everything, and return the exit code.
pub fn run_with_args<I, T>(pool: CandidatePool, args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { ExitCode::CONFIG } else { ExitCode::SUCCESS };
        }
    };

    match execute(&cli, pool) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            e.exit_code
        }
    }
}

/// Initialize structured logging with env-based filter, defaulting to warn.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Select, discover, and execute; returns the exit code.
fn execute(cli: &Cli, pool: CandidatePool) -> CliResult<ExitCode> {
    let config = cli.run_config();
    let pool = cli.selection().apply(pool)?;
    let tree = discover(&pool)?;

    if cli.list {
        print!("{}", render_plan(&tree));
        return Ok(ExitCode::SUCCESS);
    }

    let mut listener: Box<dyn ExecutionListener> = match config.format {
        OutputFormat::Console => Box::new(ConsoleReporter::new(config.verbose, config.color)),
        OutputFormat::Json => Box::new(JsonReporter::new()),
    };
    let report = StagedExecutor::new(&config).execute(&tree, listener.as_mut());

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Failures were already printed by the reporter
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

// ============================================================================
// Tests
// ============================================================================
