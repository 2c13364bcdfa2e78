//! Numeric coercion of `populacao_indigena` and median imputation.
//!
//! Coercion never fails: a token that does not parse as a finite number
//! becomes a missing value and is recorded in [`Diagnostics`]. Imputation
//! then fills every missing value with the median of the values that were
//! present, which is why it has to run strictly after coercion.

use log::{info, warn};
use serde::Serialize;

use crate::{
    error::{Diagnostics, PipelineError, Recovery},
    repair::{RepairedRecord, RepairedTable},
};

pub const POPULATION_COLUMN: &str = "populacao_indigena";

/// An extra source column whose every non-empty value parses as a number.
/// `NaN` and infinite tokens are kept as missing, like in the population column.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoercedRecord {
    pub row: usize,
    pub id_municipio: String,
    pub sexo: String,
    pub grupo_idade: String,
    pub alfabetizacao: String,
    pub populacao_indigena: Option<f64>,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoercedTable {
    pub records: Vec<CoercedRecord>,
    pub extra_headers: Vec<String>,
    pub numeric_columns: Vec<NumericColumn>,
}

impl CoercedTable {
    pub fn population(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.populacao_indigena).collect()
    }

    pub fn missing_population(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.populacao_indigena.is_none())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImputedRecord {
    pub row: usize,
    pub id_municipio: String,
    pub sexo: String,
    pub grupo_idade: String,
    pub alfabetizacao: String,
    pub populacao_indigena: f64,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImputedTable {
    pub records: Vec<ImputedRecord>,
    pub extra_headers: Vec<String>,
    pub numeric_columns: Vec<NumericColumn>,
    pub imputation: Imputation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Imputation {
    pub median: f64,
    pub filled: usize,
}

/// Parses a numeric token; blanks, garbage and non-finite values are missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn coerce(table: RepairedTable, diagnostics: &mut Diagnostics) -> CoercedTable {
    let numeric_columns = detect_numeric_columns(&table);
    let records = table
        .records
        .into_iter()
        .map(|record| coerce_record(record, diagnostics))
        .collect::<Vec<_>>();
    let coerced = CoercedTable {
        records,
        extra_headers: table.extra_headers,
        numeric_columns,
    };
    let missing = coerced.missing_population();
    if missing > 0 {
        warn!(
            "{} of {} '{}' value(s) could not be parsed and are missing",
            missing,
            coerced.records.len(),
            POPULATION_COLUMN
        );
    }
    info!(
        "Coerced '{}' to numeric; {} extra numeric column(s) detected",
        POPULATION_COLUMN,
        coerced.numeric_columns.len()
    );
    coerced
}

fn coerce_record(record: RepairedRecord, diagnostics: &mut Diagnostics) -> CoercedRecord {
    let populacao_indigena = parse_number(&record.populacao_indigena);
    if populacao_indigena.is_none() {
        diagnostics.record(Recovery::CoercedToMissing {
            row: record.row,
            raw: record.populacao_indigena.clone(),
        });
    }
    CoercedRecord {
        row: record.row,
        id_municipio: record.id_municipio,
        sexo: record.sexo,
        grupo_idade: record.grupo_idade,
        alfabetizacao: record.alfabetizacao,
        populacao_indigena,
        extras: record.extras,
    }
}

fn detect_numeric_columns(table: &RepairedTable) -> Vec<NumericColumn> {
    table
        .extra_headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let mut present = 0usize;
            let mut values = Vec::with_capacity(table.records.len());
            for record in &table.records {
                let raw = record.extras.get(idx).map(|s| s.as_str()).unwrap_or("");
                if raw.trim().is_empty() {
                    values.push(None);
                    continue;
                }
                let parsed = raw.trim().parse::<f64>().ok()?;
                if parsed.is_finite() {
                    present += 1;
                    values.push(Some(parsed));
                } else {
                    values.push(None);
                }
            }
            (present > 0).then(|| NumericColumn {
                name: name.clone(),
                values,
            })
        })
        .collect()
}

/// Median of a slice; `None` when empty. Even counts average the two middles.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Fills missing entries in place with the median of the present ones.
///
/// The median is taken before any slot is written, so filled values never
/// feed back into it; calling this again on the result changes nothing.
pub fn fill_with_median(
    column: &str,
    values: &mut [Option<f64>],
) -> Result<Imputation, PipelineError> {
    let present = values.iter().flatten().copied().collect::<Vec<_>>();
    let median = median(&present).ok_or_else(|| PipelineError::EmptyColumn {
        column: column.to_string(),
    })?;
    let mut filled = 0usize;
    for slot in values.iter_mut().filter(|v| v.is_none()) {
        *slot = Some(median);
        filled += 1;
    }
    Ok(Imputation { median, filled })
}

pub fn impute(table: CoercedTable) -> Result<ImputedTable, PipelineError> {
    let mut population = table.population();
    let imputation = fill_with_median(POPULATION_COLUMN, &mut population)?;
    let records = table
        .records
        .into_iter()
        .zip(population)
        .map(|(record, value)| ImputedRecord {
            row: record.row,
            id_municipio: record.id_municipio,
            sexo: record.sexo,
            grupo_idade: record.grupo_idade,
            alfabetizacao: record.alfabetizacao,
            populacao_indigena: value.unwrap_or(imputation.median),
            extras: record.extras,
        })
        .collect();
    info!(
        "Filled {} missing '{}' value(s) with median {}",
        imputation.filled, POPULATION_COLUMN, imputation.median
    );
    Ok(ImputedTable {
        records,
        extra_headers: table.extra_headers,
        numeric_columns: table.numeric_columns,
        imputation,
    })
}
