//! End-to-end batch runs against a scripted stand-in for Vina.
//!
//! The fake binary echoes the ligand file into its log, so each ligand's
//! content decides its score; ligands containing `FAIL` exit non-zero.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use dockyard_common::{BatchConfig, DockyardError};
use dockyard_docking::{DockingPipeline, JobStatus, Shutdown};
use tempfile::{tempdir, TempDir};

const FAKE_VINA: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --config) CONFIG="$2"; shift 2 ;;
    --ligand) LIGAND="$2"; shift 2 ;;
    --out) OUT="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "Using config $CONFIG"
cat "$LIGAND"
touch "$OUT"
if grep -q FAIL "$LIGAND"; then
  echo "An error occurred" >&2
  exit 1
fi
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(ligands: &[(&str, &str)]) -> Self {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ligands");
        std::fs::create_dir_all(&input).unwrap();
        for (name, content) in ligands {
            std::fs::write(input.join(name), content).unwrap();
        }

        let vina = dir.path().join("bin/vina");
        std::fs::create_dir_all(vina.parent().unwrap()).unwrap();
        std::fs::write(&vina, FAKE_VINA).unwrap();
        std::fs::set_permissions(&vina, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn config(&self, vina: &Path, extra: &str) -> BatchConfig {
        let toml = format!(
            r#"
            [paths]
            input_dir = "{input}"
            output_dir = "{output}"
            config_dir = "{configs}"
            vina_executable = "{vina}"

            [execution]
            receptor = "brd4"
            max_concurrency = 2
            {extra}

            [report]
            csv_path = "{csv}"

            [[receptors]]
            name = "fkbp"
            receptor = "receptors/receptor_1_clean.pdbqt"
            center_x = 6.61
            center_y = -3.18
            center_z = -6.90
            num_modes = 20

            [[receptors]]
            name = "brd4"
            receptor = "receptors/receptor_2_clean.pdbqt"
            center_x = 1.53
            center_y = -9.77
            center_z = -0.70
            num_modes = 20
            "#,
            input = self.path("ligands").display(),
            output = self.path("out").display(),
            configs = self.path("configs").display(),
            vina = vina.display(),
            csv = self.path("out/results.csv").display(),
        );
        BatchConfig::from_toml_str(&toml).unwrap()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_batch_ranks_every_ligand() {
    let ws = Workspace::new(&[
        ("ligand_conformer_1.pdbqt", "   1   -5.00  kcal/mol\n   2   -4.10  kcal/mol\n"),
        ("ligand_conformer_2.pdbqt", "   1   -8.00  kcal/mol\n"),
        ("ligand_conformer_3.pdbqt", "no poses\n"),
        ("ligand_conformer_4.pdbqt", "   1   -6.50  kcal/mol\nFAIL\n"),
        ("receptor_1_clean.pdbqt", "   1   -99.0  kcal/mol\n"),
    ]);
    let pipeline = DockingPipeline::new(ws.config(&ws.path("bin/vina"), "")).unwrap();

    let report = pipeline.run(Shutdown::never()).await.unwrap();

    let names: Vec<String> = report
        .rows()
        .iter()
        .map(|r| r.ligand.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "ligand_conformer_2.pdbqt",
            "ligand_conformer_4.pdbqt",
            "ligand_conformer_1.pdbqt",
            "ligand_conformer_3.pdbqt",
        ]
    );

    let rows = report.rows();
    assert_eq!(rows[0].best_score, Some(-8.0));
    assert_eq!(rows[1].status, JobStatus::NonZeroExit);
    assert_eq!(rows[1].exit_code, Some(1));
    assert_eq!(rows[1].best_score, Some(-6.5));
    assert!(rows[1].error.as_deref().unwrap().starts_with("vina exited"));
    assert_eq!(rows[0].error, None);
    assert_eq!(rows[2].best_score, Some(-5.0));
    assert_eq!(rows[3].best_score, None);
    assert_eq!(rows[3].status, JobStatus::Succeeded);

    assert_eq!(
        rows[0].docked_output,
        ws.path("out/ligand_conformer_2_docked_out.pdbqt")
    );
    assert!(rows[0].docked_output.exists());
    assert_eq!(rows[0].log_file, ws.path("out/log_brd4_ligand_conformer_2.pdbqt.txt"));

    // Both receptors written, the active one handed to Vina.
    assert!(ws.path("configs/config_fkbp.txt").exists());
    let brd4 = std::fs::read_to_string(ws.path("configs/config_brd4.txt")).unwrap();
    assert!(brd4.starts_with("receptor = receptors/receptor_2_clean.pdbqt\n"));
    assert!(brd4.contains("num_modes = 20\n"));
    let log = std::fs::read_to_string(&rows[0].log_file).unwrap();
    assert!(log.contains("config_brd4.txt"));

    let written = pipeline.export(&report).unwrap();
    assert_eq!(written, vec![ws.path("out/results.csv")]);
    let csv = std::fs::read_to_string(ws.path("out/results.csv")).unwrap();
    assert_eq!(csv.lines().count(), 5);
}

#[tokio::test]
async fn test_missing_binary_recorded_per_ligand() {
    let ws = Workspace::new(&[
        ("ligand_conformer_1.pdbqt", "   1   -5.00  kcal/mol\n"),
        ("ligand_conformer_2.pdbqt", "   1   -6.00  kcal/mol\n"),
    ]);
    let pipeline = DockingPipeline::new(ws.config(&ws.path("bin/missing-vina"), "")).unwrap();

    let report = pipeline.run(Shutdown::never()).await.unwrap();

    assert_eq!(report.total(), 2);
    assert!(report.rows().iter().all(|r| r.status == JobStatus::LaunchFailed));
    assert_eq!(report.scored(), 0);
}

#[tokio::test]
async fn test_preflight_aborts_when_binary_unusable() {
    let ws = Workspace::new(&[("ligand_conformer_1.pdbqt", "   1   -5.00  kcal/mol\n")]);
    let config = ws.config(&ws.path("bin/missing-vina"), "preflight = true");
    let pipeline = DockingPipeline::new(config).unwrap();

    let err = pipeline.run(Shutdown::never()).await.unwrap_err();

    assert!(matches!(err, DockyardError::Preflight(_)), "got {err:?}");
}

#[tokio::test]
async fn test_preflight_result_not_double_counted() {
    let ws = Workspace::new(&[
        ("ligand_conformer_1.pdbqt", "   1   -5.00  kcal/mol\n"),
        ("ligand_conformer_2.pdbqt", "   1   -6.00  kcal/mol\n"),
        ("ligand_conformer_3.pdbqt", "   1   -7.00  kcal/mol\n"),
    ]);
    let config = ws.config(&ws.path("bin/vina"), "preflight = true");
    let pipeline = DockingPipeline::new(config).unwrap();

    let report = pipeline.run(Shutdown::never()).await.unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.scored(), 3);
    assert_eq!(report.best().unwrap().best_score, Some(-7.0));
}

#[tokio::test]
async fn test_preflight_progress_counts_toward_whole_batch() {
    let ws = Workspace::new(&[
        ("ligand_conformer_1.pdbqt", "   1   -5.00  kcal/mol\n"),
        ("ligand_conformer_2.pdbqt", "   1   -6.00  kcal/mol\n"),
        ("ligand_conformer_3.pdbqt", "   1   -7.00  kcal/mol\n"),
    ]);
    let (tx, mut rx) = tokio::sync::broadcast::channel(16);
    let config = ws.config(&ws.path("bin/vina"), "preflight = true");
    let pipeline = DockingPipeline::new(config).unwrap().with_progress(tx);

    pipeline.run(Shutdown::never()).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        seen.push((ev.done, ev.total));
    }
    assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_missing_input_dir_is_fatal() {
    let ws = Workspace::new(&[]);
    std::fs::remove_dir_all(ws.path("ligands")).unwrap();
    let pipeline = DockingPipeline::new(ws.config(&ws.path("bin/vina"), "")).unwrap();

    let err = pipeline.run(Shutdown::never()).await.unwrap_err();

    assert!(matches!(err, DockyardError::Io { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_empty_input_gives_empty_report() {
    let ws = Workspace::new(&[("notes.txt", "")]);
    let pipeline = DockingPipeline::new(ws.config(&ws.path("bin/vina"), "")).unwrap();

    let report = pipeline.run(Shutdown::never()).await.unwrap();

    assert_eq!(report.total(), 0);
    assert!(report.best().is_none());
}
