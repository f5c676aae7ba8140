//! Ranking and export of docking results.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dockyard_common::{DockyardError, NullPlacement, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::job::{JobResult, JobStatus};

/// One line of the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub ligand: PathBuf,
    pub docked_output: PathBuf,
    pub log_file: PathBuf,
    pub runtime_sec: f64,
    pub best_score: Option<f64>,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    /// Why the job failed, if it did.
    pub error: Option<String>,
}

impl From<JobResult> for ReportRow {
    fn from(r: JobResult) -> Self {
        Self {
            ligand: r.ligand,
            docked_output: r.docked_output,
            log_file: r.log_file,
            runtime_sec: r.runtime_sec,
            best_score: r.best_score,
            status: r.status,
            exit_code: r.exit_code,
            error: r.error,
        }
    }
}

/// Snapshot of a finished batch, sorted by affinity (lower binds better).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub null_placement: NullPlacement,
    rows: Vec<ReportRow>,
}

/// Build the ranked report from raw results.
pub fn aggregate(results: Vec<JobResult>, null_placement: NullPlacement) -> BatchReport {
    let mut rows: Vec<ReportRow> = results.into_iter().map(ReportRow::from).collect();
    rows.sort_by(|a, b| compare_rows(a, b, null_placement));

    BatchReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        null_placement,
        rows,
    }
}

fn compare_rows(a: &ReportRow, b: &ReportRow, nulls: NullPlacement) -> Ordering {
    let by_score = match (a.best_score, b.best_score) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match nulls {
            NullPlacement::First => Ordering::Less,
            NullPlacement::Last => Ordering::Greater,
        },
        (Some(_), None) => match nulls {
            NullPlacement::First => Ordering::Greater,
            NullPlacement::Last => Ordering::Less,
        },
    };
    by_score.then_with(|| a.ligand.cmp(&b.ligand))
}

impl BatchReport {
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn scored(&self) -> usize {
        self.rows.iter().filter(|r| r.best_score.is_some()).count()
    }

    pub fn unscored(&self) -> usize {
        self.total() - self.scored()
    }

    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Best-binding row, if anything was scored.
    pub fn best(&self) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.best_score.is_some())
    }

    /// Fixed-width text table for the terminal.
    pub fn render_table(&self) -> String {
        let ligands: Vec<String> = self.rows.iter().map(|r| r.ligand.display().to_string()).collect();
        let width = ligands.iter().map(|l| l.len()).max().unwrap_or(0).max("ligand".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$}  {:>10}  {:>11}  {:<13}  {:>4}  docked_output / log_file",
            "ligand", "best_score", "runtime_sec", "status", "exit"
        );
        for (row, ligand) in self.rows.iter().zip(&ligands) {
            let score = row.best_score.map(|s| format!("{s:.2}")).unwrap_or_else(|| "-".to_string());
            let exit = row.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<width$}  {:>10}  {:>11.2}  {:<13}  {:>4}  {} / {}",
                ligand,
                score,
                row.runtime_sec,
                row.status.as_str(),
                exit,
                row.docked_output.display(),
                row.log_file.display()
            );
        }
        let _ = writeln!(
            out,
            "{} ligands: {} scored, {} unscored, {} failed",
            self.total(),
            self.scored(),
            self.unscored(),
            self.failed()
        );
        out
    }

    /// Write the ranking as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "ligand",
            "docked_output",
            "log_file",
            "runtime_sec",
            "best_score",
            "status",
            "exit_code",
            "error",
        ])?;
        for row in &self.rows {
            writer.write_record([
                row.ligand.display().to_string(),
                row.docked_output.display().to_string(),
                row.log_file.display().to_string(),
                format!("{:.3}", row.runtime_sec),
                row.best_score.map(|s| s.to_string()).unwrap_or_default(),
                row.status.as_str().to_string(),
                row.exit_code.map(|c| c.to_string()).unwrap_or_default(),
                row.error.clone().unwrap_or_default(),
            ])?;
        }
        writer.flush().map_err(|e| DockyardError::io(path, e))?;
        info!("Wrote CSV report to {}", path.display());
        Ok(())
    }

    /// Write the whole report, metadata included, as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| DockyardError::io(path, e))?;
        info!("Wrote JSON report to {}", path.display());
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| DockyardError::io(parent, e))
        }
        _ => Ok(()),
    }
}
