use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::repair::FieldMismatchPolicy;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Repair and analyse the IBGE 2022 indigenous literacy census CSV",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline and print statistics and the correlation matrix
    Analyze(AnalyzeArgs),
    /// Summarise every repaired column before missing values are filled
    Explore(ExploreArgs),
    /// Show the first repaired records with their derived age band
    Preview(PreviewArgs),
    /// Five-number summary and outliers of the indigenous population column
    Outliers(ReportArgs),
    /// Histogram of the indigenous population column
    Distribution(DistributionArgs),
    /// Mean indigenous population grouped by age band and sex
    Groups(ReportArgs),
}

/// Options shared by every subcommand for locating and parsing the input.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input census CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// YAML configuration file (input, delimiter, encoding, field_mismatch)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ';', ',', 'tab', '|'; defaults to ';')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// What to do with packed values that do not split into five fields
    #[arg(long = "on-field-mismatch", value_enum)]
    pub on_field_mismatch: Option<FieldMismatchPolicy>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Emit the results as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub source: InputArgs,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Emit the results as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DistributionArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Number of equal-width bins
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u16).range(1..))]
    pub bins: u16,
    /// Emit the results as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
