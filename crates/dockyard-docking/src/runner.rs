//! Molecular docking using AutoDock Vina.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dockyard_common::BatchConfig;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::job::{DockingJob, JobResult, JobStatus};
use crate::score::ScoreExtractor;
use crate::shutdown::Shutdown;

/// Something that can dock a single ligand.
///
/// Implementations never fail: every problem is reported through
/// [`JobResult::status`].
#[async_trait]
pub trait DockingBackend: Send + Sync + 'static {
    async fn dock(&self, job: &DockingJob, shutdown: Shutdown) -> JobResult;
}

/// Wrapper for AutoDock Vina execution.
#[derive(Debug, Clone)]
pub struct VinaRunner {
    executable_path: PathBuf,
    config_file: PathBuf,
    timeout: Option<Duration>,
    kill_in_flight: bool,
    score_failed_runs: bool,
    extractor: ScoreExtractor,
}

enum Outcome {
    Exited(ExitStatus),
    WaitFailed(std::io::Error),
    TimedOut,
    Cancelled,
}

impl VinaRunner {
    /// Create a new VinaRunner pointing every run at `config_file`.
    pub fn new<P: AsRef<Path>, C: AsRef<Path>>(executable_path: P, config_file: C) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
            config_file: config_file.as_ref().to_path_buf(),
            timeout: None,
            kill_in_flight: true,
            score_failed_runs: true,
            extractor: ScoreExtractor::default(),
        }
    }

    /// Runner configured from the `[execution]` section.
    pub fn from_config(config: &BatchConfig, config_file: &Path, extractor: ScoreExtractor) -> Self {
        Self::new(&config.paths.vina_executable, config_file)
            .with_timeout(config.execution.timeout_secs.map(Duration::from_secs))
            .with_kill_in_flight(config.execution.kill_in_flight)
            .with_score_failed_runs(config.execution.score_failed_runs)
            .with_extractor(extractor)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_kill_in_flight(mut self, kill: bool) -> Self {
        self.kill_in_flight = kill;
        self
    }

    pub fn with_score_failed_runs(mut self, score: bool) -> Self {
        self.score_failed_runs = score;
        self
    }

    pub fn with_extractor(mut self, extractor: ScoreExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Arguments passed to Vina for `job`.
    pub fn args(&self, job: &DockingJob) -> Vec<PathBuf> {
        vec![
            PathBuf::from("--config"),
            self.config_file.clone(),
            PathBuf::from("--ligand"),
            job.ligand.clone(),
            PathBuf::from("--out"),
            job.docked_output.clone(),
        ]
    }

    fn command_line(&self, job: &DockingJob) -> String {
        std::iter::once(&self.executable_path)
            .chain(self.args(job).iter())
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run Vina for one ligand, writing stdout and stderr to the job's log.
    pub async fn run(&self, job: &DockingJob, mut shutdown: Shutdown) -> JobResult {
        let ligand = job.ligand_name();
        info!("Running AutoDock Vina on {}", ligand);
        debug!("Running command for {}: {}", ligand, self.command_line(job));

        for dir in [job.log_file.parent(), job.docked_output.parent()].into_iter().flatten() {
            if dir.as_os_str().is_empty() {
                continue;
            }
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                warn!(ligand = %ligand, "Cannot create output directory {}: {}", dir.display(), e);
                return JobResult::failed(job, JobStatus::LaunchFailed, format!("create {}: {e}", dir.display()));
            }
        }

        // Truncate before spawning so an old log can never be scored.
        let (stdout, stderr) = match open_log(&job.log_file) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(ligand = %ligand, "Cannot open log file {}: {}", job.log_file.display(), e);
                return JobResult::failed(job, JobStatus::LaunchFailed, format!("open log: {e}"));
            }
        };

        let started = Instant::now();
        let spawned = Command::new(&self.executable_path)
            .args(self.args(job))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(ligand = %ligand, "Failed to launch {}: {}", self.executable_path.display(), e);
                let mut res = JobResult::failed(
                    job,
                    JobStatus::LaunchFailed,
                    format!("launch {}: {e}", self.executable_path.display()),
                );
                res.runtime_sec = started.elapsed().as_secs_f64();
                return res;
            }
        };

        let deadline = async {
            match self.timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Outcome::Exited(status),
                Err(e) => Outcome::WaitFailed(e),
            },
            _ = deadline => Outcome::TimedOut,
            _ = shutdown.triggered(), if self.kill_in_flight => Outcome::Cancelled,
        };

        if matches!(outcome, Outcome::TimedOut | Outcome::Cancelled) {
            if let Err(e) = child.kill().await {
                warn!(ligand = %ligand, "Failed to kill Vina: {}", e);
            }
        }
        let runtime_sec = started.elapsed().as_secs_f64();

        let (status, exit_code, error) = match outcome {
            Outcome::Exited(status) if status.success() => (JobStatus::Succeeded, status.code(), None),
            Outcome::Exited(status) => {
                warn!(
                    "Error: Docking command for {} returned nonzero exit code {:?}",
                    ligand,
                    status.code()
                );
                (JobStatus::NonZeroExit, status.code(), Some(format!("vina exited with {status}")))
            }
            Outcome::WaitFailed(e) => {
                warn!(ligand = %ligand, "Lost track of Vina process: {}", e);
                (JobStatus::LaunchFailed, None, Some(format!("wait: {e}")))
            }
            Outcome::TimedOut => {
                let limit = self.timeout.unwrap_or_default();
                warn!(ligand = %ligand, "Vina exceeded {:?}, killed", limit);
                (JobStatus::TimedOut, None, Some(format!("timed out after {limit:?}")))
            }
            Outcome::Cancelled => {
                info!(ligand = %ligand, "Batch cancelled, killed Vina");
                (JobStatus::Cancelled, None, Some("cancelled".to_string()))
            }
        };

        let parse_log = match status {
            JobStatus::Succeeded => true,
            JobStatus::NonZeroExit => self.score_failed_runs,
            _ => false,
        };
        let best_score = if parse_log {
            self.extractor.extract_from_file(&job.log_file).await
        } else {
            None
        };

        debug!("AutoDock Vina finished for {} in {:.2}s", ligand, runtime_sec);

        JobResult {
            ligand: job.ligand.clone(),
            docked_output: job.docked_output.clone(),
            log_file: job.log_file.clone(),
            runtime_sec,
            best_score,
            exit_code,
            status,
            error,
        }
    }
}

#[async_trait]
impl DockingBackend for VinaRunner {
    async fn dock(&self, job: &DockingJob, shutdown: Shutdown) -> JobResult {
        self.run(job, shutdown).await
    }
}

fn open_log(path: &Path) -> std::io::Result<(Stdio, Stdio)> {
    let file = std::fs::File::create(path)?;
    let dup = file.try_clone()?;
    Ok((Stdio::from(file), Stdio::from(dup)))
}
