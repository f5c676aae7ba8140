//! Docking jobs and their results.

use std::path::{Path, PathBuf};

use dockyard_common::config::DiscoveryConfig;
use serde::{Deserialize, Serialize};

/// One ligand to dock, with its output paths already decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockingJob {
    pub ligand: PathBuf,
    pub docked_output: PathBuf,
    pub log_file: PathBuf,
}

impl DockingJob {
    /// File name of the ligand, used as its identity in logs.
    pub fn ligand_name(&self) -> String {
        self.ligand
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.ligand.display().to_string())
    }
}

/// Derives output and log paths from ligand file names.
///
/// `ligand_conformer_07.pdbqt` docked against `brd4` becomes
/// `<out>/ligand_conformer_07_docked_out.pdbqt` and
/// `<out>/log_brd4_ligand_conformer_07.pdbqt.txt`.
#[derive(Debug, Clone)]
pub struct JobLayout {
    output_dir: PathBuf,
    receptor: String,
    ligand_suffix: String,
    output_marker: String,
}

impl JobLayout {
    pub fn new<P: AsRef<Path>>(output_dir: P, receptor: &str, discovery: &DiscoveryConfig) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            receptor: receptor.to_string(),
            ligand_suffix: discovery.ligand_suffix.clone(),
            output_marker: discovery.output_marker.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn job_for(&self, ligand: &Path) -> DockingJob {
        let file_name = ligand
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = file_name
            .strip_suffix(self.ligand_suffix.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&file_name);

        DockingJob {
            ligand: ligand.to_path_buf(),
            docked_output: self.output_dir.join(format!("{stem}{}", self.output_marker)),
            log_file: self.output_dir.join(format!("log_{}_{file_name}.txt", self.receptor)),
        }
    }

    pub fn jobs_for(&self, ligands: &[PathBuf]) -> Vec<DockingJob> {
        ligands.iter().map(|l| self.job_for(l)).collect()
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Vina exited with code 0.
    Succeeded,
    /// Vina ran but exited non-zero (or was killed by a signal).
    NonZeroExit,
    /// Killed after exceeding the per-job deadline.
    TimedOut,
    /// The process could not be started.
    LaunchFailed,
    /// Batch was cancelled before or while this job ran.
    Cancelled,
    /// The worker task panicked.
    Panicked,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::NonZeroExit => "non_zero_exit",
            JobStatus::TimedOut => "timed_out",
            JobStatus::LaunchFailed => "launch_failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Panicked => "panicked",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, JobStatus::Succeeded)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of docking one ligand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub ligand: PathBuf,
    pub docked_output: PathBuf,
    pub log_file: PathBuf,
    pub runtime_sec: f64,
    pub best_score: Option<f64>,
    pub exit_code: Option<i32>,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl JobResult {
    /// A result for a job that never produced a usable run.
    pub fn failed(job: &DockingJob, status: JobStatus, error: impl Into<String>) -> Self {
        Self {
            ligand: job.ligand.clone(),
            docked_output: job.docked_output.clone(),
            log_file: job.log_file.clone(),
            runtime_sec: 0.0,
            best_score: None,
            exit_code: None,
            status,
            error: Some(error.into()),
        }
    }
}
