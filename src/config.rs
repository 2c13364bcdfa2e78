//! Pipeline configuration: defaults, an optional YAML file, then CLI flags.
//!
//! ```yaml
//! input: br_ibge_censo_2022_indigenas_populacao_alfabetizada_grupo_idade_municipio.csv
//! delimiter: ";"
//! encoding: utf-8
//! field_mismatch: skip
//! ```

use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::Deserialize;

use crate::{
    cli::{InputArgs, parse_delimiter},
    io_utils::{DEFAULT_DELIMITER, DEFAULT_ENCODING},
    repair::FieldMismatchPolicy,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub delimiter: u8,
    pub encoding: String,
    pub field_mismatch: FieldMismatchPolicy,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            delimiter: DEFAULT_DELIMITER,
            encoding: DEFAULT_ENCODING.to_string(),
            field_mismatch: FieldMismatchPolicy::default(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_field_mismatch(mut self, policy: FieldMismatchPolicy) -> Self {
        self.field_mismatch = policy;
        self
    }

    /// Merges the optional `--config` file with command-line overrides.
    pub fn resolve(args: &InputArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => ConfigFile::load(path)
                .with_context(|| format!("Loading configuration from {path:?}"))?,
            None => ConfigFile::default(),
        };
        let input = args
            .input
            .clone()
            .or(file.input)
            .ok_or_else(|| anyhow!("No input file given. Pass --input or set `input` in --config"))?;

        let mut config = PipelineConfig::new(input);
        if let Some(delimiter) = args.delimiter {
            config = config.with_delimiter(delimiter);
        } else if let Some(raw) = &file.delimiter {
            let delimiter =
                parse_delimiter(raw).map_err(|e| anyhow!("Invalid delimiter '{raw}': {e}"))?;
            config = config.with_delimiter(delimiter);
        }
        if let Some(encoding) = args.input_encoding.clone().or(file.encoding) {
            config = config.with_encoding(encoding);
        }
        if let Some(policy) = args.on_field_mismatch.or(file.field_mismatch) {
            config = config.with_field_mismatch(policy);
        }
        debug!("Resolved pipeline configuration: {config:?}");
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    input: Option<PathBuf>,
    delimiter: Option<String>,
    encoding: Option<String>,
    field_mismatch: Option<FieldMismatchPolicy>,
}

impl ConfigFile {
    fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing config YAML")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn args() -> InputArgs {
        InputArgs {
            input: None,
            config: None,
            delimiter: None,
            input_encoding: None,
            on_field_mismatch: None,
        }
    }

    #[test]
    fn resolve_applies_defaults() {
        let mut args = args();
        args.input = Some(PathBuf::from("censo.csv"));
        let config = PipelineConfig::resolve(&args).unwrap();
        assert_eq!(config, PipelineConfig::new("censo.csv"));
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.encoding, "utf-8");
        assert_eq!(config.field_mismatch, FieldMismatchPolicy::Fail);
    }

    #[test]
    fn resolve_reads_yaml_and_lets_flags_win() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("censo.yml");
        fs::write(
            &path,
            "input: from_file.csv\ndelimiter: tab\nencoding: latin1\nfield_mismatch: skip\n",
        )
        .expect("write config");

        let mut args = args();
        args.config = Some(path);
        let config = PipelineConfig::resolve(&args).unwrap();
        assert_eq!(config.input, PathBuf::from("from_file.csv"));
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.encoding, "latin1");
        assert_eq!(config.field_mismatch, FieldMismatchPolicy::Skip);

        args.input = Some(PathBuf::from("from_flag.csv"));
        args.delimiter = Some(b'|');
        args.on_field_mismatch = Some(FieldMismatchPolicy::Fail);
        let config = PipelineConfig::resolve(&args).unwrap();
        assert_eq!(config.input, PathBuf::from("from_flag.csv"));
        assert_eq!(config.delimiter, b'|');
        assert_eq!(config.field_mismatch, FieldMismatchPolicy::Fail);
    }

    #[test]
    fn resolve_requires_an_input() {
        let err = PipelineConfig::resolve(&args()).unwrap_err();
        assert!(err.to_string().contains("No input file"));
    }

    #[test]
    fn resolve_rejects_unknown_keys() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.yml");
        fs::write(&path, "input: a.csv\nbogus: 1\n").expect("write config");
        let mut args = args();
        args.config = Some(path);
        assert!(PipelineConfig::resolve(&args).is_err());
    }
}
