//! CLI argument parsing for Rastro

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Output format for the recorded dependency sets
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DepFormat {
    /// JSON record with "inputs" and "outputs" arrays (default)
    Json,
    /// Makefile-style depfile (outputs: inputs)
    Make,
}

#[derive(Parser, Debug)]
#[command(name = "rastro")]
#[command(version)]
#[command(about = "Fallback build-step dependency discovery via strace", long_about = None)]
pub struct Cli {
    /// Write the dependency record to this file instead of stdout
    #[arg(long = "depfile", value_name = "PATH")]
    pub depfile: Option<PathBuf>,

    /// Dependency record format
    #[arg(long = "format", value_enum, default_value = "json")]
    pub format: DepFormat,

    /// Tracer binary to invoke
    #[arg(long = "tracer", value_name = "BIN", default_value = "strace")]
    pub tracer: String,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,

    /// Command to run (everything after --)
    #[arg(last = true)]
    pub command: Option<Vec<String>>,
}
