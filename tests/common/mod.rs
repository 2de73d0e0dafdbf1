#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Schema used across the integration tests: a scalar, an aliased scalar with a default, an
/// optional list, a list with optional elements, and a counter pivoted over `Base`.
pub const PILEUP_SCHEMA: &str = r#"
list_delimiter: ","
enums:
  Base: [A, C, G, T]
fields:
  - { name: pos, type: integer }
  - { name: read_count, alias: count, type: integer, default: "0" }
  - { name: tags, type: list<string>, optional: true }
  - { name: quals, type: list<integer>, optional_elements: true, delimiter: ";" }
  - { name: counts, type: counter<Base> }
"#;

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

    /// Writes [`PILEUP_SCHEMA`] and returns its path.
    pub fn pileup_schema(&self) -> PathBuf {
        self.write("pileup.schema.yml", PILEUP_SCHEMA)
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).expect("read workspace file")
    }
}
