//! Column-by-column overview of the repaired table before imputation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::ExploreArgs,
    coerce::{CoercedTable, POPULATION_COLUMN},
    config::PipelineConfig,
    pipeline::Pipeline,
    repair::FIELD_NAMES,
    table::{self, format_number},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Numeric,
}

impl ColumnKind {
    fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Numeric => "numeric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub present: usize,
    pub missing: usize,
    pub distinct: usize,
    pub top: Option<String>,
    pub top_count: usize,
}

pub fn execute(args: &ExploreArgs) -> Result<()> {
    let config = PipelineConfig::resolve(&args.source)?;
    let exploration = Pipeline::new(config.clone())
        .explore()
        .with_context(|| format!("Exploring {:?}", config.input))?;
    let summaries = summarize(&exploration.table);

    let headers = ["column", "kind", "present", "missing", "distinct", "top", "top_count"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.kind.as_str().to_string(),
                s.present.to_string(),
                s.missing.to_string(),
                s.distinct.to_string(),
                s.top.clone().unwrap_or_default(),
                s.top_count.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!(
        "Summarised {} column(s) across {} row(s)",
        summaries.len(),
        exploration.table.records.len()
    );
    Ok(())
}

/// One summary per column: the five repaired fields, then extras.
pub fn summarize(table: &CoercedTable) -> Vec<ColumnSummary> {
    let mut summaries = Vec::with_capacity(FIELD_NAMES.len() + table.extra_headers.len());
    for name in FIELD_NAMES {
        let values = table
            .records
            .iter()
            .map(|r| match name {
                "id_municipio" => Some(r.id_municipio.clone()),
                "sexo" => Some(r.sexo.clone()),
                "grupo_idade" => Some(r.grupo_idade.clone()),
                "alfabetizacao" => Some(r.alfabetizacao.clone()),
                _ => r.populacao_indigena.map(format_number),
            })
            .collect::<Vec<_>>();
        let kind = if name == POPULATION_COLUMN {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        };
        summaries.push(summarize_column(name, kind, values));
    }
    for (idx, name) in table.extra_headers.iter().enumerate() {
        let summary = match table.numeric_columns.iter().find(|c| &c.name == name) {
            Some(numeric) => summarize_column(
                name,
                ColumnKind::Numeric,
                numeric.values.iter().map(|v| v.map(format_number)).collect(),
            ),
            None => summarize_column(
                name,
                ColumnKind::Text,
                table
                    .records
                    .iter()
                    .map(|r| r.extras.get(idx).cloned())
                    .collect(),
            ),
        };
        summaries.push(summary);
    }
    summaries
}

fn summarize_column(name: &str, kind: ColumnKind, values: Vec<Option<String>>) -> ColumnSummary {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut missing = 0usize;
    for value in values {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => *counts.entry(v).or_insert(0) += 1,
            None => missing += 1,
        }
    }
    let present: usize = counts.values().sum();
    // BTreeMap iterates in key order, so the first maximum is the smallest key.
    let top = counts
        .iter()
        .fold(None, |best: Option<(&String, usize)>, (value, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((value, *count)),
        });
    ColumnSummary {
        name: name.to_string(),
        kind,
        present,
        missing,
        distinct: counts.len(),
        top: top.map(|(value, _)| value.clone()),
        top_count: top.map(|(_, count)| count).unwrap_or(0),
    }
}
