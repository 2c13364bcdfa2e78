#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const PACKED_HEADER: &str = "id_municipio,sexo,grupo_idade,alfabetizacao,populacao_indigena";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Writes a census file in the malformed layout: a leading `ano` column and
    /// the packed column, `;`-delimited, each packed value quoted.
    pub fn write_census(&self, name: &str, packed_rows: &[&str]) -> PathBuf {
        let mut contents = format!("ano;\"{PACKED_HEADER}\"\n");
        for row in packed_rows {
            contents.push_str(&format!("2022;\"{row}\"\n"));
        }
        self.write(name, &contents)
    }
}
