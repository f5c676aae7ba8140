//! Batch run configuration.
//!
//! Everything a run needs (input/output directories, the Vina executable,
//! receptor boxes, pool size) comes from a single TOML file, so no component
//! depends on the process working directory.
//!
//! ```toml
//! [paths]
//! input_dir = "ligand_conformers_top20"
//! output_dir = "docking_out"
//! vina_executable = "/opt/vina/bin/vina"
//!
//! [execution]
//! receptor = "brd4"
//! max_concurrency = 2
//!
//! [[receptors]]
//! name = "brd4"
//! receptor = "receptors/receptor_2_clean.pdbqt"
//! center_x = 1.53
//! center_y = -9.77
//! center_z = -0.70
//! size_x = 20.0
//! size_y = 20.0
//! size_z = 20.0
//! num_modes = 20
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DockyardError, Result};

/// Env var holding the config path.
pub const CONFIG_ENV_VAR: &str = "DOCKYARD_CONFIG";

/// Config file looked up in the current directory when the env var is unset.
pub const DEFAULT_CONFIG_FILE: &str = "dockyard.toml";

/// Complete configuration for one docking batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub paths: PathsConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    pub execution: ExecutionConfig,

    #[serde(default)]
    pub score: ScoreConfig,

    #[serde(default)]
    pub report: ReportConfig,

    /// Receptor boxes; every entry is written out, only
    /// `execution.receptor` is docked against.
    pub receptors: Vec<ReceptorConfig>,
}

// ── Paths ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory scanned for ligand conformers.
    pub input_dir: PathBuf,

    /// Directory receiving docked poses and per-ligand logs.
    pub output_dir: PathBuf,

    /// Where receptor config files are written. Defaults to `output_dir`.
    pub config_dir: Option<PathBuf>,

    #[serde(default = "default_vina_executable")]
    pub vina_executable: PathBuf,
}

fn default_vina_executable() -> PathBuf { PathBuf::from("vina") }

impl PathsConfig {
    pub fn config_dir(&self) -> &Path {
        self.config_dir.as_deref().unwrap_or(&self.output_dir)
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// How ligand files are found and how output names are derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Glob matched against file names inside `paths.input_dir`.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Suffix stripped from the ligand file name to form the output stem.
    #[serde(default = "default_ligand_suffix")]
    pub ligand_suffix: String,

    /// Appended to the stem to name the docked pose file.
    #[serde(default = "default_output_marker")]
    pub output_marker: String,
}

fn default_pattern() -> String { "ligand_conformer_*.pdbqt".to_string() }
fn default_ligand_suffix() -> String { ".pdbqt".to_string() }
fn default_output_marker() -> String { "_docked_out.pdbqt".to_string() }

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            ligand_suffix: default_ligand_suffix(),
            output_marker: default_output_marker(),
        }
    }
}

// ── Execution ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Name of the receptor (from `[[receptors]]`) passed to Vina.
    pub receptor: String,

    /// Upper bound on simultaneously running Vina processes.
    /// Vina is multi-threaded itself, so keep this low.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-ligand wall clock limit. `None` waits forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Kill running Vina processes when the batch is cancelled.
    #[serde(default = "default_true")]
    pub kill_in_flight: bool,

    /// Parse the log of a run that exited non-zero.
    #[serde(default = "default_true")]
    pub score_failed_runs: bool,

    /// Dock the first ligand alone before starting the pool.
    #[serde(default)]
    pub preflight: bool,
}

fn default_max_concurrency() -> usize { 2 }
fn default_true() -> bool { true }

// ── Score ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Regex overriding the built-in affinity pattern. Must capture the score
    /// in its first group.
    pub pattern: Option<String>,
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Where unscored ligands go when sorting by affinity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullPlacement {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub null_placement: NullPlacement,

    pub csv_path: Option<PathBuf>,

    pub json_path: Option<PathBuf>,
}

// ── Receptors ─────────────────────────────────────────────────────────────────

/// A receptor and its search box, as consumed by Vina's `--config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceptorConfig {
    /// Short tag used in file names (`config_<name>.txt`, `log_<name>_...`).
    pub name: String,

    /// Path to the prepared receptor `.pdbqt`.
    pub receptor: PathBuf,

    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,

    #[serde(default = "default_box_size")]
    pub size_x: f64,
    #[serde(default = "default_box_size")]
    pub size_y: f64,
    #[serde(default = "default_box_size")]
    pub size_z: f64,

    #[serde(default = "default_exhaustiveness")]
    pub exhaustiveness: u32,

    #[serde(default = "default_num_modes")]
    pub num_modes: u32,
}

fn default_box_size() -> f64 { 20.0 }
fn default_exhaustiveness() -> u32 { 8 }
fn default_num_modes() -> u32 { 9 }

// ── Loading ───────────────────────────────────────────────────────────────────

impl BatchConfig {
    /// Load configuration from `$DOCKYARD_CONFIG`, falling back to
    /// `./dockyard.toml`.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DockyardError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| DockyardError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.receptors.is_empty() {
            return Err(DockyardError::Config("at least one [[receptors]] entry is required".into()));
        }

        let mut seen = HashSet::new();
        for r in &self.receptors {
            if r.name.trim().is_empty() {
                return Err(DockyardError::Config("receptor name must not be empty".into()));
            }
            if !seen.insert(r.name.as_str()) {
                return Err(DockyardError::Config(format!("duplicate receptor name: {}", r.name)));
            }
        }

        if self.active_receptor().is_none() {
            return Err(DockyardError::Config(format!(
                "execution.receptor '{}' does not name a configured receptor",
                self.execution.receptor
            )));
        }

        if self.discovery.pattern.trim().is_empty() {
            return Err(DockyardError::Config("discovery.pattern must not be empty".into()));
        }

        Ok(())
    }

    /// The receptor Vina docks against in this run.
    pub fn active_receptor(&self) -> Option<&ReceptorConfig> {
        self.receptors.iter().find(|r| r.name == self.execution.receptor)
    }

    /// Pool size, never zero.
    pub fn max_concurrency(&self) -> usize {
        self.execution.max_concurrency.max(1)
    }
}
