//! Integration test suite for xltemplate
//!
//! These tests drive the `xltemplate` binary end to end against fixtures in
//! temporary directories. Remote sources are exercised through `file://`
//! repositories created with the system git.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **build**: rendering, output handling, warnings and failures
//! - **build_file**: YAML build files and their merge with flags
//! - **includes**: layered variables through `:includes`
//! - **remote**: sources and patterns inside git repositories
//! - **version**: the version command

mod build;
mod build_file;
mod includes;
mod remote;
mod version;

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory with helpers to lay out templates and run the binary in it.
pub struct TestProject {
    temp: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Writes `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.temp.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.temp.path().join(rel)).unwrap()
    }

    /// The binary, run from the project directory with a clean environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("xltemplate").unwrap();
        cmd.current_dir(self.temp.path())
            .env_remove("RUST_LOG")
            .env_remove("XLTEMPLATE_SOURCE")
            .env_remove("XLTEMPLATE_VARIABLES")
            .env_remove("XLTEMPLATE_OUTPUT");
        cmd
    }
}
