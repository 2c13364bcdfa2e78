pub mod bucket;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod error;
pub mod explore;
pub mod io_utils;
pub mod loader;
pub mod pipeline;
pub mod preview;
pub mod repair;
pub mod report;
pub mod stats;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::{
    cli::{Cli, Commands},
    error::PipelineError,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("censo_indigena", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => stats::execute(&args),
        Commands::Explore(args) => explore::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Outliers(args) => report::execute_outliers(&args),
        Commands::Distribution(args) => report::execute_distribution(&args),
        Commands::Groups(args) => report::execute_groups(&args),
    }
}

/// Renders an error chain, prefixed with the failing stage when the root
/// cause is a [`PipelineError`].
pub fn describe_error(err: &anyhow::Error) -> String {
    match err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
    {
        Some(pipeline_err) => format!("{} stage failed: {err:#}", pipeline_err.stage()),
        None => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::Context;

    use super::*;

    #[test]
    fn describe_error_names_the_failing_stage() {
        let err = Err::<(), _>(PipelineError::NotFound {
            path: PathBuf::from("censo.csv"),
        })
        .context("Analysing \"censo.csv\"")
        .unwrap_err();
        let message = describe_error(&err);
        assert!(message.starts_with("load stage failed: "), "{message}");
        assert!(message.contains("not found"), "{message}");
    }

    #[test]
    fn describe_error_passes_through_other_errors() {
        let err = anyhow::anyhow!("No input file given");
        assert_eq!(describe_error(&err), "No input file given");
    }
}
