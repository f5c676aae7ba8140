//! Orchestrator for a docking batch.

use std::path::PathBuf;

use dockyard_common::{BatchConfig, DockyardError, Result};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::discovery::discover_ligands;
use crate::dispatcher::{BatchProgress, Dispatcher};
use crate::job::{DockingJob, JobLayout, JobStatus};
use crate::receptor::ConfigWriter;
use crate::report::{aggregate, BatchReport};
use crate::runner::VinaRunner;
use crate::score::ScoreExtractor;
use crate::shutdown::Shutdown;

pub struct DockingPipeline {
    config: BatchConfig,
    progress_tx: Option<broadcast::Sender<BatchProgress>>,
}

impl DockingPipeline {
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress_tx: None,
        })
    }

    pub fn with_progress(mut self, tx: broadcast::Sender<BatchProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Jobs for every ligand found in the input directory.
    pub fn plan(&self) -> Result<Vec<DockingJob>> {
        let ligands = discover_ligands(&self.config.paths.input_dir, &self.config.discovery.pattern)?;
        let layout = JobLayout::new(
            &self.config.paths.output_dir,
            &self.config.execution.receptor,
            &self.config.discovery,
        );
        Ok(layout.jobs_for(&ligands))
    }

    /// Write receptor configs, dock every ligand and rank the results.
    ///
    /// Only setup problems are returned as errors; individual ligands that
    /// fail show up as unscored rows.
    #[instrument(skip_all, fields(receptor = %self.config.execution.receptor))]
    pub async fn run(&self, shutdown: Shutdown) -> Result<BatchReport> {
        let writer = ConfigWriter::new(self.config.paths.config_dir());
        writer.materialize(&self.config.receptors)?;
        let config_file = writer.path_for(&self.config.execution.receptor);

        let extractor = ScoreExtractor::from_override(self.config.score.pattern.as_deref())?;
        let runner = VinaRunner::from_config(&self.config, &config_file, extractor);

        let mut jobs = self.plan()?;
        if jobs.is_empty() {
            warn!(
                "No ligands matching '{}' in {}",
                self.config.discovery.pattern,
                self.config.paths.input_dir.display()
            );
        }

        let mut dispatcher = Dispatcher::new(runner, self.config.max_concurrency());
        if let Some(ref tx) = self.progress_tx {
            dispatcher = dispatcher.with_progress(tx.clone());
        }

        let total = jobs.len();
        let mut results = Vec::with_capacity(total);
        if self.config.execution.preflight && !jobs.is_empty() {
            let first = jobs.remove(0);
            info!("Testing single ligand docking with: {}", first.ligand.display());
            let trial = dispatcher.run_one(first, shutdown.clone(), total).await;
            info!(
                "Test docking result: status={}, score={:?}, time={:.2}s",
                trial.status, trial.best_score, trial.runtime_sec
            );
            if trial.status == JobStatus::LaunchFailed {
                return Err(DockyardError::Preflight(
                    trial.error.unwrap_or_else(|| "vina could not be launched".to_string()),
                ));
            }
            results.push(trial);
        }

        info!(
            "Docking {} ligands against {} with {} workers",
            total,
            config_file.display(),
            dispatcher.max_concurrency()
        );
        let already_done = results.len();
        results.extend(dispatcher.run_remaining(jobs, shutdown, already_done).await);

        let report = aggregate(results, self.config.report.null_placement);
        info!(
            run_id = %report.run_id,
            "Docking finished: {} scored, {} unscored, {} failed",
            report.scored(),
            report.unscored(),
            report.failed()
        );
        Ok(report)
    }

    /// Export the report to whichever files `[report]` names.
    pub fn export(&self, report: &BatchReport) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if let Some(ref path) = self.config.report.csv_path {
            report.write_csv(path)?;
            written.push(path.clone());
        }
        if let Some(ref path) = self.config.report.json_path {
            report.write_json(path)?;
            written.push(path.clone());
        }
        Ok(written)
    }
}
