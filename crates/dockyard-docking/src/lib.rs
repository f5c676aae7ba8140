//! Dockyard Docking - batch AutoDock Vina runs and affinity ranking.
//!
//! A run goes through these stages:
//! 1. Writing receptor config files (`receptor`)
//! 2. Finding ligand conformers (`discovery`)
//! 3. Docking each ligand with Vina under a worker limit (`runner`, `dispatcher`)
//! 4. Pulling the best-pose affinity from each log (`score`)
//! 5. Ranking by affinity and exporting (`report`)
//!
//! `pipeline` wires the stages together from a [`dockyard_common::BatchConfig`].

pub mod discovery;
pub mod dispatcher;
pub mod job;
pub mod pipeline;
pub mod receptor;
pub mod report;
pub mod runner;
pub mod score;
pub mod shutdown;

pub use dispatcher::{BatchProgress, Dispatcher};
pub use job::{DockingJob, JobLayout, JobResult, JobStatus};
pub use pipeline::DockingPipeline;
pub use report::{aggregate, BatchReport, ReportRow};
pub use runner::{DockingBackend, VinaRunner};
pub use score::ScoreExtractor;
pub use shutdown::{Shutdown, ShutdownHandle};
