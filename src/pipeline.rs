//! The repair pipeline as an explicit function chain.
//!
//! Each stage consumes the previous stage's table and returns the next one:
//! load → repair → coerce → impute → bucket. [`Pipeline::run`] then hands the
//! finished table to the [`StatisticsEngine`]. Fatal failures come back as
//! [`PipelineError`]; per-row recoveries accumulate in [`Diagnostics`].

use crate::{
    bucket::{self, CensusTable},
    coerce::{self, CoercedTable, Imputation},
    config::PipelineConfig,
    error::{Diagnostics, PipelineError},
    loader::{self, RawTable},
    repair,
    stats::{CorrelationMatrix, PopulationStatistics, StatisticsEngine},
};

/// The table as it stands after coercion, before missing values are filled.
#[derive(Debug, Clone)]
pub struct Exploration {
    pub table: CoercedTable,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct Census {
    pub table: CensusTable,
    pub imputation: Imputation,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub census: Census,
    pub statistics: PopulationStatistics,
    pub correlation: CorrelationMatrix,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn load(&self) -> Result<RawTable, PipelineError> {
        loader::load(
            &self.config.input,
            self.config.delimiter,
            Some(self.config.encoding.as_str()),
        )
    }

    pub fn explore(&self) -> Result<Exploration, PipelineError> {
        let raw = self.load()?;
        process_to_coerced(raw, &self.config)
    }

    pub fn census(&self) -> Result<Census, PipelineError> {
        let raw = self.load()?;
        process(raw, &self.config)
    }

    pub fn run(&self) -> Result<PipelineOutput, PipelineError> {
        let census = self.census()?;
        let engine = StatisticsEngine::new(&census.table);
        let statistics = engine.calculate_statistics()?;
        let correlation = engine.calculate_correlation();
        Ok(PipelineOutput {
            census,
            statistics,
            correlation,
        })
    }
}

fn process_to_coerced(
    raw: RawTable,
    config: &PipelineConfig,
) -> Result<Exploration, PipelineError> {
    let mut diagnostics = Diagnostics::default();
    let repaired = repair::repair(raw, config.field_mismatch, &mut diagnostics)?;
    let table = coerce::coerce(repaired, &mut diagnostics);
    Ok(Exploration { table, diagnostics })
}

/// Runs every stage after loading over an already-resident raw table.
pub fn process(raw: RawTable, config: &PipelineConfig) -> Result<Census, PipelineError> {
    let Exploration {
        table,
        mut diagnostics,
    } = process_to_coerced(raw, config)?;
    let imputed = coerce::impute(table)?;
    let imputation = imputed.imputation;
    let table = bucket::bucket(imputed, &mut diagnostics);
    Ok(Census {
        table,
        imputation,
        diagnostics,
    })
}
