//! Application directory helpers anchored to a single `.pathprobe` folder.
//!
//! Only log files live here; reports and counters go wherever the operator
//! points `--reports-dir`. The base defaults to the OS config directory and
//! can be overridden with `PATHPROBE_CONFIG_HOME` for tests or portable
//! setups.

use std::path::PathBuf;

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".pathprobe";

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the logs directory inside the `.pathprobe` root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    let path = logs_dir_under(&base);
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn logs_dir_under(base: &std::path::Path) -> PathBuf {
    base.join(APP_DIR_NAME).join("logs")
}

fn config_base_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PATHPROBE_CONFIG_HOME") {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_dir_nests_under_app_root() {
        let path = logs_dir_under(std::path::Path::new("/base"));
        assert_eq!(path, PathBuf::from("/base/.pathprobe/logs"));
    }
}
