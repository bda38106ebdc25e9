//! Startup orchestration.
//!
//! # Responsibilities
//! - Guarantee the log and upload directories exist before anything writes
//! - Surface directory failures as the only fatal configuration error
//!
//! # Design Decisions
//! - Idempotent: existing directories are left untouched
//! - Runs before the persistence connector and before the listener binds

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::AppConfig;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} exists but is not a directory")]
    NotADirectory { path: PathBuf },
}

/// Directories the server writes to or serves from.
pub fn required_directories(config: &AppConfig) -> Vec<PathBuf> {
    vec![
        config.log_dir.clone(),
        config.pipeline.upload_dir.clone(),
        config.pipeline.documents_dir(),
    ]
}

/// Create every required directory that is missing.
///
/// Returns the directories that were created by this call; an empty list means
/// everything was already in place.
pub fn ensure_directories(config: &AppConfig) -> Result<Vec<PathBuf>, StartupError> {
    let mut created = Vec::new();
    for dir in required_directories(config) {
        if ensure_directory(&dir)? {
            created.push(dir);
        }
    }
    Ok(created)
}

fn ensure_directory(path: &Path) -> Result<bool, StartupError> {
    if path.is_dir() {
        return Ok(false);
    }
    if path.exists() {
        return Err(StartupError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    std::fs::create_dir_all(path).map_err(|source| StartupError::CreateDir {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Created directory");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_map(&HashMap::new(), dir.path());

        let created = ensure_directories(&config).unwrap();

        assert_eq!(created.len(), 3);
        assert!(dir.path().join("logs").is_dir());
        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("uploads/documents").is_dir());
    }

    #[test]
    fn test_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_map(&HashMap::new(), dir.path());

        ensure_directories(&config).unwrap();
        std::fs::write(dir.path().join("uploads/keep.txt"), b"keep").unwrap();

        let created = ensure_directories(&config).unwrap();

        assert!(created.is_empty());
        assert!(dir.path().join("uploads/keep.txt").exists());
    }

    #[test]
    fn test_file_in_the_way() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logs"), b"not a dir").unwrap();
        let config = AppConfig::from_map(&HashMap::new(), dir.path());

        let err = ensure_directories(&config).unwrap_err();
        assert!(matches!(err, StartupError::NotADirectory { .. }));
    }
}
