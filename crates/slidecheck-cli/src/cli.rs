//! CLI command definitions and argument parsing.

use crate::config::{OutputFormat, Profile};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// SlideCheck - Find inconsistencies across the slides of a PowerPoint deck.
#[derive(Debug, Parser)]
#[command(name = "slidecheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SLIDECHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a presentation
    Run(RunArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the PowerPoint (.pptx) file
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable trace logging and print error details
    #[arg(long)]
    pub debug: bool,

    /// Directory containing rendered slide images (slide1.png, ...)
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Preset applied over the configuration file (`free` paces requests for free-tier quotas)
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Coloured table (default)
    Rich,
    /// Plain text
    Simple,
    /// JSON report
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Rich => OutputFormat::Rich,
            CliFormat::Simple => OutputFormat::Simple,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}
