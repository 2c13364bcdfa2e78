//! Age-band derivation from the free-text `grupo_idade` label.

use std::{fmt, sync::OnceLock};

use log::info;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::{
    coerce::{ImputedTable, NumericColumn},
    error::{Diagnostics, Recovery},
};

/// Upper bound (inclusive) of the oldest band.
pub const MAX_AGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBand {
    Under18,
    From18To29,
    From30To44,
    From45To59,
    From60,
}

impl AgeBand {
    pub const ALL: [AgeBand; 5] = [
        AgeBand::Under18,
        AgeBand::From18To29,
        AgeBand::From30To44,
        AgeBand::From45To59,
        AgeBand::From60,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBand::Under18 => "0-17",
            AgeBand::From18To29 => "18-29",
            AgeBand::From30To44 => "30-44",
            AgeBand::From45To59 => "45-59",
            AgeBand::From60 => "60+",
        }
    }

    /// Bands are closed below and open above, except `60+` which is `[60, 100]`.
    pub fn from_age(age: u32) -> Option<Self> {
        match age {
            0..18 => Some(AgeBand::Under18),
            18..30 => Some(AgeBand::From18To29),
            30..45 => Some(AgeBand::From30To44),
            45..60 => Some(AgeBand::From45To59),
            60..=MAX_AGE => Some(AgeBand::From60),
            _ => None,
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AgeBand {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+").expect("digit pattern compiles"))
}

/// First run of ASCII digits in `label`, if any and if it fits in a `u32`.
pub fn extract_leading_age(label: &str) -> Option<u32> {
    digits_pattern()
        .find(label)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

pub fn age_band(label: &str) -> Option<AgeBand> {
    extract_leading_age(label).and_then(AgeBand::from_age)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub row: usize,
    pub id_municipio: String,
    pub sexo: String,
    pub grupo_idade: String,
    pub alfabetizacao: String,
    pub populacao_indigena: f64,
    pub faixa_etaria: Option<AgeBand>,
    #[serde(skip)]
    pub extras: Vec<String>,
}

/// The fully repaired, imputed and bucketed census table.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusTable {
    pub records: Vec<Record>,
    pub extra_headers: Vec<String>,
    pub numeric_columns: Vec<NumericColumn>,
}

impl CensusTable {
    pub fn population(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.populacao_indigena).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn bucket(table: ImputedTable, diagnostics: &mut Diagnostics) -> CensusTable {
    let records = table
        .records
        .into_iter()
        .map(|record| {
            let faixa_etaria = age_band(&record.grupo_idade);
            if faixa_etaria.is_none() {
                diagnostics.record(Recovery::AgeExtractionFailed {
                    row: record.row,
                    label: record.grupo_idade.clone(),
                });
            }
            Record {
                row: record.row,
                id_municipio: record.id_municipio,
                sexo: record.sexo,
                grupo_idade: record.grupo_idade,
                alfabetizacao: record.alfabetizacao,
                populacao_indigena: record.populacao_indigena,
                faixa_etaria,
                extras: record.extras,
            }
        })
        .collect::<Vec<_>>();
    let banded = records.iter().filter(|r| r.faixa_etaria.is_some()).count();
    info!(
        "Assigned an age band to {} of {} row(s)",
        banded,
        records.len()
    );
    CensusTable {
        records,
        extra_headers: table.extra_headers,
        numeric_columns: table.numeric_columns,
    }
}
