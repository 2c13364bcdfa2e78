//! Data behind the census charts: boxplot summary, histogram bins and mean
//! population per age band and sex. Nothing here draws; the structures are
//! printed as tables or serialized to JSON for an external renderer.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    bucket::{AgeBand, CensusTable},
    cli::{DistributionArgs, ReportArgs},
    config::PipelineConfig,
    pipeline::{Census, Pipeline},
    table::{self, format_number},
};

const WHISKER_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxplotSummary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub iqr: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub faixa_etaria: AgeBand,
    pub sexo: String,
    pub count: usize,
    pub mean: f64,
}

/// Quantile with linear interpolation between closest ranks; `sorted` must be
/// ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn boxplot(values: &[f64]) -> Option<BoxplotSummary> {
    let sorted = sorted(values);
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let low_fence = q1 - WHISKER_FACTOR * iqr;
    let high_fence = q3 + WHISKER_FACTOR * iqr;
    let inside = sorted
        .iter()
        .copied()
        .filter(|v| (low_fence..=high_fence).contains(v));
    let lower_whisker = inside.clone().next().unwrap_or(q1);
    let upper_whisker = inside.last().unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| !(low_fence..=high_fence).contains(v))
        .collect();
    Some(BoxplotSummary {
        count: sorted.len(),
        min,
        q1,
        median: quantile(&sorted, 0.5),
        q3,
        max,
        iqr,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

/// Equal-width bins from min to max; the last bin is closed on both ends.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let sorted = sorted(values);
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: sorted.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in &sorted {
        let idx = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            lower: min + width * idx as f64,
            upper: if idx + 1 == bins {
                max
            } else {
                min + width * (idx + 1) as f64
            },
            count,
        })
        .collect()
}

/// Mean population per (age band, sex); rows without a band are left out.
pub fn grouped_means(table: &CensusTable) -> Vec<GroupMean> {
    let mut groups: BTreeMap<(AgeBand, &str), (f64, usize)> = BTreeMap::new();
    for record in &table.records {
        if let Some(band) = record.faixa_etaria {
            let entry = groups
                .entry((band, record.sexo.as_str()))
                .or_insert((0.0, 0));
            entry.0 += record.populacao_indigena;
            entry.1 += 1;
        }
    }
    groups
        .into_iter()
        .map(|((faixa_etaria, sexo), (sum, count))| GroupMean {
            faixa_etaria,
            sexo: sexo.to_string(),
            count,
            mean: sum / count as f64,
        })
        .collect()
}

fn load_census(config: PipelineConfig) -> Result<Census> {
    let input = config.input.clone();
    Pipeline::new(config)
        .census()
        .with_context(|| format!("Preparing {input:?}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing report to JSON")?;
    println!("{rendered}");
    Ok(())
}

fn header(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn execute_outliers(args: &ReportArgs) -> Result<()> {
    let census = load_census(PipelineConfig::resolve(&args.source)?)?;
    let summary = boxplot(&census.table.population())
        .context("No population values available for a boxplot")?;
    if args.json {
        print_json(&summary)?;
    } else {
        let rows = [
            ("count", summary.count as f64),
            ("min", summary.min),
            ("lower_whisker", summary.lower_whisker),
            ("q1", summary.q1),
            ("median", summary.median),
            ("q3", summary.q3),
            ("upper_whisker", summary.upper_whisker),
            ("max", summary.max),
            ("iqr", summary.iqr),
            ("outliers", summary.outliers.len() as f64),
        ]
        .iter()
        .map(|(metric, value)| vec![metric.to_string(), format_number(*value)])
        .collect::<Vec<_>>();
        table::print_table(&header(&["metric", "value"]), &rows);
    }
    info!(
        "Found {} outlier(s) among {} value(s)",
        summary.outliers.len(),
        summary.count
    );
    Ok(())
}

pub fn execute_distribution(args: &DistributionArgs) -> Result<()> {
    let census = load_census(PipelineConfig::resolve(&args.source)?)?;
    let bins = histogram(&census.table.population(), usize::from(args.bins));
    if args.json {
        print_json(&bins)?;
    } else {
        let rows = bins
            .iter()
            .map(|bin| {
                vec![
                    format_number(bin.lower),
                    format_number(bin.upper),
                    bin.count.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&header(&["lower", "upper", "count"]), &rows);
    }
    info!("Binned {} value(s) into {} bin(s)", census.table.len(), bins.len());
    Ok(())
}

pub fn execute_groups(args: &ReportArgs) -> Result<()> {
    let census = load_census(PipelineConfig::resolve(&args.source)?)?;
    let groups = grouped_means(&census.table);
    if args.json {
        print_json(&groups)?;
    } else {
        let rows = groups
            .iter()
            .map(|g| {
                vec![
                    g.faixa_etaria.to_string(),
                    g.sexo.clone(),
                    g.count.to_string(),
                    format_number(g.mean),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&header(&["faixa_etaria", "sexo", "count", "mean"]), &rows);
    }
    info!("Computed {} age band and sex group(s)", groups.len());
    Ok(())
}
