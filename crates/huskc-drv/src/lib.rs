//! huskc-drv - Compiler Driver
//!
//! The driver wires the front-end phases together behind the `huskc`
//! binary:
//!
//! ```text
//! Source file (.hs)
//!        │
//!        ▼
//!   [read file]
//!        │
//!        ▼
//!   [huskc-lex] ──▶ token stream (layout applied)
//!        │
//!        ▼
//!   [huskc-par] ──▶ tagged AST
//!        │
//!        ▼
//!   [dump] ──▶ stdout
//! ```
//!
//! Every failure is fatal: the first lex/parse error aborts the run, the
//! diagnostic chain is printed to stderr, and the process exits non-zero.
//! There is no error recovery and no partial output.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use huskc_par::Parser;

/// Driver configuration, filled in from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source file to parse.
    pub input: PathBuf,
}

/// Run the front end: read, parse to end-of-file, dump the AST to stdout.
pub fn run(config: &Config) -> Result<()> {
    let source = fs::read_to_string(&config.input)
        .with_context(|| format!("cannot read {}", config.input.display()))?;
    debug!(file = %config.input.display(), bytes = source.len(), "parsing");

    let ast = Parser::new(&source)
        .parse_program()
        .with_context(|| format!("{}", config.input.display()))?;
    debug!("parse complete");

    print!("{}", ast.dump());
    Ok(())
}
