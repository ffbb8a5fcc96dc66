//! Filesystem locations: where config is read from and logs are written to.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding `config.yml` in a source checkout.
const DEFAULT_DATA_SUBDIR: &str = "data";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory containing the shipped `config.yml`.
    pub project_root: PathBuf,
    /// Writable directory for local overrides, secrets and logs.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// Resolves paths from `LEASEBOT_ROOT` / `LEASEBOT_DATA_DIR`, falling back
    /// to the crate directory and its `data/` subdirectory.
    pub fn new() -> Self {
        let project_root = env::var_os("LEASEBOT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(default_project_root);
        let data_dir = env::var_os("LEASEBOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| project_root.join(DEFAULT_DATA_SUBDIR));
        Self::from_dirs(project_root, data_dir)
    }

    /// Paths rooted in a single directory, used by tests and one-off tools.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::from_dirs(dir.to_path_buf(), dir.to_path_buf())
    }

    fn from_dirs(project_root: PathBuf, data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            // logging is not up yet; the file layer will simply fail to open
            eprintln!("could not create {}: {}", log_dir.display(), err);
        }

        Self {
            secrets_path: data_dir.join("secrets.yaml"),
            project_root,
            data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn default_project_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").is_file() {
        return manifest_dir;
    }
    env::current_dir().unwrap_or(manifest_dir)
}
