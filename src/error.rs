//! Fatal pipeline failures and recovered per-row events.
//!
//! A [`PipelineError`] aborts the run. A [`Recovery`] is recorded in
//! [`Diagnostics`] and the row continues through the pipeline with a missing
//! value (or, for [`Recovery::RowSkipped`], is dropped).

use std::{fmt, io, path::PathBuf};

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Repair,
    Coerce,
    Impute,
    Bucket,
    Statistics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Repair => "repair",
            Stage::Coerce => "coerce",
            Stage::Impute => "impute",
            Stage::Bucket => "bucket",
            Stage::Statistics => "statistics",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Input file {path:?} not found")]
    NotFound { path: PathBuf },

    #[error("Malformed input in {path:?}: {reason}")]
    MalformedInput { path: PathBuf, reason: String },

    #[error("Failed to read {path:?}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("Packed column '{expected}' not found (headers: {found:?})")]
    SchemaMismatch {
        expected: String,
        found: Vec<String>,
    },

    #[error("Row {row} split into {found} field(s), expected {expected}")]
    FieldCountMismatch {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Column '{column}' has no values to compute a median from")]
    EmptyColumn { column: String },

    #[error("No records available for statistics")]
    NoRecords,
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::NotFound { .. }
            | PipelineError::MalformedInput { .. }
            | PipelineError::IoFailure { .. }
            | PipelineError::UnknownEncoding(_) => Stage::Load,
            PipelineError::SchemaMismatch { .. } | PipelineError::FieldCountMismatch { .. } => {
                Stage::Repair
            }
            PipelineError::EmptyColumn { .. } => Stage::Impute,
            PipelineError::NoRecords => Stage::Statistics,
        }
    }
}

/// A per-row problem that was absorbed instead of aborting the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    RowSkipped { row: usize, found: usize },
    CoercedToMissing { row: usize, raw: String },
    AgeExtractionFailed { row: usize, label: String },
}

impl Recovery {
    pub fn stage(&self) -> Stage {
        match self {
            Recovery::RowSkipped { .. } => Stage::Repair,
            Recovery::CoercedToMissing { .. } => Stage::Coerce,
            Recovery::AgeExtractionFailed { .. } => Stage::Bucket,
        }
    }

    pub fn row(&self) -> usize {
        match self {
            Recovery::RowSkipped { row, .. }
            | Recovery::CoercedToMissing { row, .. }
            | Recovery::AgeExtractionFailed { row, .. } => *row,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    events: Vec<Recovery>,
}

impl Diagnostics {
    pub fn record(&mut self, event: Recovery) {
        debug!(
            "Recovered at {} (row {}): {:?}",
            event.stage(),
            event.row(),
            event
        );
        self.events.push(event);
    }

    pub fn events(&self) -> &[Recovery] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.events.iter().filter(|e| e.stage() == stage).count()
    }
}
