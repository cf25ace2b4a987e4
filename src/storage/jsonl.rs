// JSON-lines record store
//
// One record per line. Appends hold an exclusive advisory lock so that
// several processes can share one log file.

use anyhow::{anyhow, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::{RecordStore, TurnRecord};

#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    /// Open (or prepare to create) a log at `path`, creating parent directories
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    anyhow!(
                        "Failed to create log directory '{}': {}",
                        parent.display(),
                        e
                    )
                })?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonlStore {
    fn append(&self, record: &TurnRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| anyhow!("Failed to serialize record: {}", e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| anyhow!("Failed to open '{}': {}", self.path.display(), e))?;

        file.lock_exclusive()
            .map_err(|e| anyhow!("Failed to lock '{}': {}", self.path.display(), e))?;
        let written = writeln!(file, "{}", line);
        let unlocked = FileExt::unlock(&file);

        written.map_err(|e| anyhow!("Failed to write record: {}", e))?;
        unlocked.map_err(|e| anyhow!("Failed to unlock '{}': {}", self.path.display(), e))?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<TurnRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| anyhow!("Failed to open '{}': {}", self.path.display(), e))?;

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| anyhow!("Failed to read record line: {}", e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TurnRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unreadable record: {}", e),
            }
        }

        Ok(records)
    }
}
