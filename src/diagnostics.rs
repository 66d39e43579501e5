use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::TurnReport;

#[derive(Serialize)]
struct DiagnosticsRecord<'a> {
    written_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a TurnReport,
}

/// Writes every `interval`-th turn report as JSON under `<dir>/<label>/`.
pub struct DiagnosticsWriter {
    dir: PathBuf,
    interval: u32,
}

impl DiagnosticsWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u32) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn enabled(&self) -> bool {
        self.interval > 0
    }

    pub fn maybe_write(&self, report: &TurnReport) -> Result<Option<PathBuf>> {
        if !self.enabled() || report.turn % self.interval != 0 {
            return Ok(None);
        }
        let dir = self.dir.join(&report.label);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create diagnostics dir {}", dir.display()))?;
        let path = dir.join(format!("turn_{:06}.json", report.turn));
        let record = DiagnosticsRecord {
            written_at: Utc::now(),
            report,
        };
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(turn = report.turn, path = %path.display(), "wrote turn diagnostics");
        Ok(Some(path))
    }
}
