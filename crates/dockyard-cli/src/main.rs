//! Dockyard — batch AutoDock Vina docking and affinity ranking.
//! Entry point for the `dockyard` binary.
//!
//! Usage: `dockyard [CONFIG]`. Without an argument the config is read
//! from `$DOCKYARD_CONFIG`, then `./dockyard.toml`.

use std::path::PathBuf;

use clap::Parser;
use dockyard_common::BatchConfig;
use dockyard_docking::{BatchProgress, DockingPipeline, Shutdown};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dockyard", version)]
#[command(about = "Dock a directory of ligands with AutoDock Vina and rank them by affinity", long_about = None)]
struct Cli {
    /// Batch configuration file (TOML)
    #[arg(value_name = "CONFIG", env = "DOCKYARD_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> dockyard_common::Result<BatchConfig> {
        match self.config {
            Some(ref path) => BatchConfig::from_file(path),
            None => BatchConfig::load(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dockyard=debug,info")),
        )
        .init();

    info!("Dockyard starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match cli.load_config() {
        Ok(c) => {
            info!(
                "Configuration loaded. Receptor: {}, workers: {}, input: {}",
                c.execution.receptor,
                c.max_concurrency(),
                c.paths.input_dir.display()
            );
            c
        }
        Err(e) => {
            warn!("Could not load configuration: {e}");
            warn!("Pass a config path or set DOCKYARD_CONFIG.");
            return Err(e.into());
        }
    };

    let (progress_tx, mut progress_rx) = broadcast::channel::<BatchProgress>(64);
    tokio::spawn(async move {
        loop {
            match progress_rx.recv().await {
                Ok(p) => info!("[{}/{}] {} ({})", p.done, p.total, p.ligand.display(), p.status),
                Err(broadcast::error::RecvError::Lagged(n)) => warn!("Progress display skipped {n} events"),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (shutdown_handle, shutdown) = Shutdown::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, cancelling remaining docking jobs");
            shutdown_handle.trigger();
        }
    });

    let pipeline = DockingPipeline::new(config)?.with_progress(progress_tx);
    let report = pipeline.run(shutdown).await?;

    println!("Docking Results:");
    print!("{}", report.render_table());

    for path in pipeline.export(&report)? {
        info!("Report written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_path_is_positional() {
        let cli = Cli::try_parse_from(["dockyard", "runs/brd4.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("runs/brd4.toml")));
    }

    #[test]
    fn test_help_is_not_a_config_path() {
        let err = Cli::try_parse_from(["dockyard", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = Cli::try_parse_from(["dockyard", "--confg", "x.toml"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
