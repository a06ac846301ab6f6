use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for fueltui
#[derive(Parser, Debug)]
#[command(version, about = "fueltui")]
pub struct Args {
    /// Excel workbook of refuel records; falls back to the configured
    /// default path when omitted
    pub path: Option<PathBuf>,

    /// Worksheet to read, by name or 0-based index (default: first sheet)
    #[arg(long = "sheet")]
    pub sheet: Option<String>,

    /// Enable debug mode to show operational information
    #[arg(long = "debug", action)]
    pub debug: bool,
}
