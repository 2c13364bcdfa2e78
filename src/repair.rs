//! Splits the comma-packed census column into its five named fields.

use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Diagnostics, PipelineError, Recovery},
    loader::RawTable,
};

pub const FIELD_NAMES: [&str; 5] = [
    "id_municipio",
    "sexo",
    "grupo_idade",
    "alfabetizacao",
    "populacao_indigena",
];

pub fn packed_column_name() -> String {
    FIELD_NAMES.join(",")
}

/// What to do with a packed value that does not split into exactly five parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum FieldMismatchPolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairedRecord {
    pub row: usize,
    pub id_municipio: String,
    pub sexo: String,
    pub grupo_idade: String,
    pub alfabetizacao: String,
    pub populacao_indigena: String,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairedTable {
    pub records: Vec<RepairedRecord>,
    /// Source columns other than the packed one, in source order.
    pub extra_headers: Vec<String>,
}

impl RepairedTable {
    /// Column names after repair: the five split fields followed by extras.
    pub fn headers(&self) -> Vec<String> {
        FIELD_NAMES
            .iter()
            .map(|name| name.to_string())
            .chain(self.extra_headers.iter().cloned())
            .collect()
    }
}

pub fn repair(
    raw: RawTable,
    policy: FieldMismatchPolicy,
    diagnostics: &mut Diagnostics,
) -> Result<RepairedTable, PipelineError> {
    let expected = packed_column_name();
    let packed_idx = raw
        .column_index(&expected)
        .ok_or_else(|| PipelineError::SchemaMismatch {
            expected: expected.clone(),
            found: raw.headers.clone(),
        })?;

    let extra_headers = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != packed_idx)
        .map(|(_, h)| h.clone())
        .collect::<Vec<_>>();

    let mut records = Vec::with_capacity(raw.rows.len());
    let mut skipped = 0usize;
    for (row_idx, mut fields) in raw.rows.into_iter().enumerate() {
        let row = row_idx + 2;
        let packed = fields.remove(packed_idx);
        let parts = packed.split(',').collect::<Vec<_>>();
        let [id_municipio, sexo, grupo_idade, alfabetizacao, populacao_indigena] =
            parts.as_slice()
        else {
            match policy {
                FieldMismatchPolicy::Fail => {
                    return Err(PipelineError::FieldCountMismatch {
                        row,
                        found: parts.len(),
                        expected: FIELD_NAMES.len(),
                    });
                }
                FieldMismatchPolicy::Skip => {
                    diagnostics.record(Recovery::RowSkipped {
                        row,
                        found: parts.len(),
                    });
                    skipped += 1;
                    continue;
                }
            }
        };
        records.push(RepairedRecord {
            row,
            id_municipio: id_municipio.to_string(),
            sexo: sexo.to_string(),
            grupo_idade: grupo_idade.to_string(),
            alfabetizacao: alfabetizacao.to_string(),
            populacao_indigena: populacao_indigena.to_string(),
            extras: fields,
        });
    }

    if skipped > 0 {
        warn!(
            "Skipped {} row(s) whose packed value did not split into {} fields",
            skipped,
            FIELD_NAMES.len()
        );
    }
    info!(
        "Repaired packed column into {} field(s) for {} row(s)",
        FIELD_NAMES.len(),
        records.len()
    );
    Ok(RepairedTable {
        records,
        extra_headers,
    })
}
