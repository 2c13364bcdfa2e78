use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    bucket::CensusTable,
    cli::AnalyzeArgs,
    coerce::{Imputation, POPULATION_COLUMN, median},
    config::PipelineConfig,
    error::{Diagnostics, PipelineError, Stage},
    pipeline::Pipeline,
    table::{self, format_number},
};

pub fn execute(args: &AnalyzeArgs) -> Result<()> {
    let config = PipelineConfig::resolve(&args.source)?;
    let output = Pipeline::new(config.clone())
        .run()
        .with_context(|| format!("Analysing {:?}", config.input))?;

    let report = AnalysisReport {
        rows: output.census.table.len(),
        imputation: output.census.imputation,
        recovered: RecoveredCounts::from(&output.census.diagnostics),
        statistics: output.statistics,
        correlation: output.correlation,
    };

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Serializing analysis to JSON")?;
        println!("{rendered}");
    } else {
        let headers = vec!["metric".to_string(), "value".to_string()];
        table::print_table(&headers, &report.summary_rows());
        println!();
        table::print_table(
            &report.correlation.header_row(),
            &report.correlation.render_rows(),
        );
    }
    info!(
        "Computed statistics for {} row(s) and a {}x{} correlation matrix",
        report.rows,
        report.correlation.columns.len(),
        report.correlation.columns.len()
    );
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub rows: usize,
    pub imputation: Imputation,
    pub recovered: RecoveredCounts,
    pub statistics: PopulationStatistics,
    pub correlation: CorrelationMatrix,
}

impl AnalysisReport {
    fn summary_rows(&self) -> Vec<Vec<String>> {
        let stats = &self.statistics;
        let row = |metric: &str, value: String| vec![metric.to_string(), value];
        vec![
            row("rows", self.rows.to_string()),
            row("rows_skipped", self.recovered.rows_skipped.to_string()),
            row("values_imputed", self.imputation.filled.to_string()),
            row("imputation_median", format_number(self.imputation.median)),
            row("age_band_missing", self.recovered.age_band_missing.to_string()),
            row("mean", format_number(stats.mean)),
            row("median", format_number(stats.median)),
            row("mode", format_number(stats.mode)),
            row(
                "variance",
                stats.variance.map(format_number).unwrap_or_default(),
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RecoveredCounts {
    pub rows_skipped: usize,
    pub values_coerced_to_missing: usize,
    pub age_band_missing: usize,
}

impl From<&Diagnostics> for RecoveredCounts {
    fn from(diagnostics: &Diagnostics) -> Self {
        Self {
            rows_skipped: diagnostics.count(Stage::Repair),
            values_coerced_to_missing: diagnostics.count(Stage::Coerce),
            age_band_missing: diagnostics.count(Stage::Bucket),
        }
    }
}

/// Descriptive statistics of `populacao_indigena`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Most frequent value; the smallest one wins a tie.
    pub mode: f64,
    /// Sample variance (n - 1); absent with fewer than two values.
    pub variance: Option<f64>,
}

/// Pairwise Pearson correlations, indexed by column name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, left: &str, right: &str) -> Option<f64> {
        let row = self.columns.iter().position(|c| c == left)?;
        let col = self.columns.iter().position(|c| c == right)?;
        self.values[row][col]
    }

    pub fn shape(&self) -> (usize, usize) {
        (
            self.values.len(),
            self.values.first().map(|v| v.len()).unwrap_or(0),
        )
    }

    fn header_row(&self) -> Vec<String> {
        std::iter::once(String::new())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    fn render_rows(&self) -> Vec<Vec<String>> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(name, row)| {
                std::iter::once(name.clone())
                    .chain(row.iter().map(|v| match v {
                        Some(r) => format!("{r:.2}"),
                        None => "n/a".to_string(),
                    }))
                    .collect()
            })
            .collect()
    }
}

/// Read-only statistics over a repaired census table.
pub struct StatisticsEngine<'a> {
    table: &'a CensusTable,
}

impl<'a> StatisticsEngine<'a> {
    pub fn new(table: &'a CensusTable) -> Self {
        Self { table }
    }

    pub fn calculate_statistics(&self) -> Result<PopulationStatistics, PipelineError> {
        if self.table.is_empty() {
            return Err(PipelineError::NoRecords);
        }
        let values = self.table.population();
        let median = median(&values).ok_or(PipelineError::NoRecords)?;
        let mode = mode(&values).ok_or(PipelineError::NoRecords)?;
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        Ok(PopulationStatistics {
            count,
            mean,
            median,
            mode,
            variance: sample_variance(&values, mean),
        })
    }

    /// Correlation over `populacao_indigena` followed by every numeric extra
    /// column in source order.
    pub fn calculate_correlation(&self) -> CorrelationMatrix {
        let mut columns = vec![POPULATION_COLUMN.to_string()];
        let mut series = vec![
            self.table
                .population()
                .into_iter()
                .map(Some)
                .collect::<Vec<_>>(),
        ];
        for numeric in &self.table.numeric_columns {
            columns.push(numeric.name.clone());
            series.push(numeric.values.clone());
        }

        let size = columns.len();
        let mut values = vec![vec![None; size]; size];
        for i in 0..size {
            values[i][i] = Some(1.0);
            for j in (i + 1)..size {
                let r = pearson(&series[i], &series[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        CorrelationMatrix { columns, values }
    }
}

/// Smallest of the most frequent values.
pub fn mode(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .map(|v| v + 0.0)
        .sorted_by(|a, b| a.total_cmp(b))
        .dedup_by_with_count(|a, b| a.total_cmp(b).is_eq())
        .fold(None, |best: Option<(usize, f64)>, (count, value)| match best {
            Some((best_count, _)) if best_count >= count => best,
            _ => Some((count, value)),
        })
        .map(|(_, value)| value)
}

fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum_squares = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some(sum_squares / (values.len() as f64 - 1.0))
}

/// Pearson's r over the rows where both sides are present.
pub fn pearson(left: &[Option<f64>], right: &[Option<f64>]) -> Option<f64> {
    let pairs = left
        .iter()
        .zip(right)
        .filter_map(|(l, r)| Some(((*l)?, (*r)?)))
        .collect::<Vec<_>>();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_l = pairs.iter().map(|(l, _)| l).sum::<f64>() / n;
    let mean_r = pairs.iter().map(|(_, r)| r).sum::<f64>() / n;
    let deviations = pairs
        .iter()
        .map(|(l, r)| (l - mean_l, r - mean_r))
        .collect::<Vec<_>>();
    // Normalised deviations keep the sums of squares finite near the f64 range.
    let scale_l = deviations.iter().fold(0.0f64, |m, (dl, _)| m.max(dl.abs()));
    let scale_r = deviations.iter().fold(0.0f64, |m, (_, dr)| m.max(dr.abs()));
    if scale_l == 0.0 || scale_r == 0.0 {
        return None;
    }
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (dl, dr) in &deviations {
        let dl = dl / scale_l;
        let dr = dr / scale_r;
        sxy += dl * dr;
        sxx += dl * dl;
        syy += dr * dr;
    }
    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
