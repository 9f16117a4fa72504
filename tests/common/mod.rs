use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory holding a settings file and a staging directory.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        fs::create_dir_all(temp_dir.path().join("staging"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.path().join("staging")
    }

    /// Write `config.toml`; the staging directory is always pointed into the
    /// test environment.
    pub fn write_config(&self, body: &str) -> Result<()> {
        let contents = format!(
            "temp_dir = {:?}\ncleanup_delay_ms = 0\nfilesystem_settle_ms = 0\n{}",
            self.staging_dir().display().to_string(),
            body
        );
        fs::write(self.config_path(), contents)?;
        Ok(())
    }
}
