//! huskc - parse a husk source file and dump its AST.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use huskc_drv::{run, Config};

/// The husk compiler front end.
///
/// Reads a source file, parses it to end-of-file, and prints the abstract
/// syntax tree. Exits non-zero with a diagnostic on any error.
#[derive(Parser, Debug)]
#[command(name = "huskc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parse a husk source file and dump its AST", long_about = None)]
struct Cli {
    /// Source file to parse
    input: PathBuf,

    /// Enable verbose output
    #[arg(short, long, env = "HUSKC_VERBOSE")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("HUSKC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config { input: cli.input };
    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
