//! Receptor config files consumed by Vina's `--config` flag.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use dockyard_common::{DockyardError, ReceptorConfig, Result};
use tracing::info;

/// Render a receptor box as Vina `key = value` lines.
pub fn render(config: &ReceptorConfig) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "receptor = {}", config.receptor.display());
    let _ = writeln!(out, "center_x = {}", config.center_x);
    let _ = writeln!(out, "center_y = {}", config.center_y);
    let _ = writeln!(out, "center_z = {}", config.center_z);
    let _ = writeln!(out, "size_x = {}", config.size_x);
    let _ = writeln!(out, "size_y = {}", config.size_y);
    let _ = writeln!(out, "size_z = {}", config.size_z);
    let _ = writeln!(out, "exhaustiveness = {}", config.exhaustiveness);
    let _ = writeln!(out, "num_modes = {}", config.num_modes);
    out
}

/// File name Vina is pointed at for a given receptor.
pub fn config_file_name(receptor_name: &str) -> String {
    format!("config_{receptor_name}.txt")
}

/// Write `contents` to `path`, replacing whatever was there.
pub fn write_config_file(path: &Path, contents: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DockyardError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| DockyardError::io(path, e))?;
    info!("Created config file: {}", path.display());
    Ok(path.to_path_buf())
}

/// Writes receptor configs into a fixed directory.
pub struct ConfigWriter {
    config_dir: PathBuf,
}

impl ConfigWriter {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// Path the config for `receptor_name` is (or will be) written to.
    pub fn path_for(&self, receptor_name: &str) -> PathBuf {
        self.config_dir.join(config_file_name(receptor_name))
    }

    /// Write one config file per receptor, in order.
    pub fn materialize(&self, receptors: &[ReceptorConfig]) -> Result<Vec<PathBuf>> {
        receptors
            .iter()
            .map(|r| write_config_file(&self.path_for(&r.name), &render(r)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn fkbp() -> ReceptorConfig {
        ReceptorConfig {
            name: "fkbp".to_string(),
            receptor: PathBuf::from("receptors/receptor_1_clean.pdbqt"),
            center_x: 6.61,
            center_y: -3.18,
            center_z: -6.9,
            size_x: 20.0,
            size_y: 20.0,
            size_z: 20.0,
            exhaustiveness: 8,
            num_modes: 20,
        }
    }

    #[test]
    fn test_render_key_order() {
        let text = render(&fkbp());
        assert_eq!(
            text,
            "receptor = receptors/receptor_1_clean.pdbqt\n\
             center_x = 6.61\n\
             center_y = -3.18\n\
             center_z = -6.9\n\
             size_x = 20\n\
             size_y = 20\n\
             size_z = 20\n\
             exhaustiveness = 8\n\
             num_modes = 20\n"
        );
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config_fkbp.txt");
        let text = render(&fkbp());

        write_config_file(&path, &text).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_config_file(&path, &text).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, text.as_bytes());
    }

    #[test]
    fn test_overwrites_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.txt");
        std::fs::write(&path, "stale content that is much longer than the new one\n").unwrap();

        write_config_file(&path, "a = 1\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a = 1\n");
    }

    #[test]
    fn test_materialize_writes_every_receptor() {
        let dir = tempdir().unwrap();
        let writer = ConfigWriter::new(dir.path().join("configs"));
        let mut brd4 = fkbp();
        brd4.name = "brd4".to_string();

        let paths = writer.materialize(&[fkbp(), brd4]).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("config_fkbp.txt"));
        assert!(paths[1].ends_with("config_brd4.txt"));
        assert!(paths.iter().all(|p| p.exists()));
    }
}
