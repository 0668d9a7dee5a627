// ============================================================
// Layer 6 - Run Log
// ============================================================
// Records every stage attempt of an orchestrated run to a CSV
// file, one row per attempt, appended across runs.
//
// Example:
//   run_id,stage,attempt,status,duration_secs,detail
//   20240102T030405Z,extract,1,ok,0.412,
//   20240102T030405Z,clean,1,failed,0.051,required column 'diabetes' is missing
//   20240102T030405Z,clean,2,ok,1.873,
//
// Reading it:
//   - a stage with more than one row for a run_id was retried
//   - the last row of a run shows where it stopped

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Outcome of a single stage attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAttempt {
    pub run_id:        String,
    pub stage:         String,
    /// Starts at 1
    pub attempt:       u32,
    /// `ok` or `failed`
    pub status:        String,
    pub duration_secs: f64,
    /// Error message for failed attempts, empty otherwise
    pub detail:        String,
}

impl StageAttempt {
    pub fn succeeded(&self) -> bool {
        self.status == "ok"
    }
}

pub struct RunLog {
    csv_path: PathBuf,
}

impl RunLog {
    /// Open (or create) the log; the header is written only once
    pub fn open(csv_path: &Path) -> Result<Self> {
        if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }
        if !csv_path.exists() {
            let mut writer = csv::Writer::from_path(csv_path)
                .with_context(|| format!("Cannot create run log '{}'", csv_path.display()))?;
            writer.write_record(["run_id", "stage", "attempt", "status", "duration_secs", "detail"])?;
            writer.flush()?;
            tracing::debug!("Created run log '{}'", csv_path.display());
        }
        Ok(Self { csv_path: csv_path.to_path_buf() })
    }

    pub fn append(&self, attempt: &StageAttempt) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open run log '{}'", self.csv_path.display()))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(attempt)?;
        writer.flush()?;
        Ok(())
    }

    /// All attempts recorded so far, oldest first
    pub fn read_all(&self) -> Result<Vec<StageAttempt>> {
        let mut reader = csv::Reader::from_path(&self.csv_path)
            .with_context(|| format!("Cannot read run log '{}'", self.csv_path.display()))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<StageAttempt>, _>>()
            .context("Run log is malformed")
    }

    pub fn path(&self) -> &Path {
        &self.csv_path
    }
}
