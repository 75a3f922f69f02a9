//! Package repository lifecycle.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::Builder;

use crate::cleanup::{self, CleanupHandle};
use crate::error::{Result, RunError};

/// A package repository location and its ownership.
///
/// Caller-supplied repositories always survive the run. Repositories the
/// run created for itself are deleted on teardown; the deletion is also
/// registered process-wide so it happens even when the run is aborted by
/// a signal.
#[derive(Debug)]
pub struct ResourceRepo {
    path: PathBuf,
    owned: bool,
    cleanup: Option<CleanupHandle>,
}

impl ResourceRepo {
    /// Resolves the repository for a run: the caller-supplied path when one
    /// was given, otherwise a fresh temporary repository.
    pub fn resolve(repo_path: Option<&Path>) -> Result<Self> {
        match repo_path {
            Some(path) => {
                debug!(
                    "using caller-supplied package repository at {}",
                    path.display()
                );
                Ok(ResourceRepo {
                    path: path.to_path_buf(),
                    owned: false,
                    cleanup: None,
                })
            }
            None => Self::create_temporary(),
        }
    }

    fn create_temporary() -> Result<Self> {
        let dir = Builder::new()
            .prefix("devtestor-repo-")
            .tempdir()
            .map_err(|e| {
                RunError::Publish(format!("failed to create temporary repository: {e}"))
            })?;
        let path = dir.keep();
        info!("created temporary package repository at {}", path.display());
        let registered = path.clone();
        let cleanup = cleanup::register("temporary package repository", move || {
            let _ = fs::remove_dir_all(&registered);
        });
        Ok(ResourceRepo {
            path,
            owned: true,
            cleanup: Some(cleanup),
        })
    }

    /// The repository's filesystem location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the repository tree if owned. Idempotent: deleting twice,
    /// or deleting a caller-supplied repository, is a no-op.
    pub fn delete(&mut self) -> Result<()> {
        if let Some(handle) = self.cleanup.take() {
            handle.disarm();
        }
        if !self.owned {
            return Ok(());
        }
        if self.path.exists() {
            info!(
                "removing temporary package repository {}",
                self.path.display()
            );
            fs::remove_dir_all(&self.path).map_err(|e| {
                RunError::Publish(format!(
                    "failed to remove temporary repository {}: {e}",
                    self.path.display()
                ))
            })?;
        }
        Ok(())
    }
}

impl Drop for ResourceRepo {
    fn drop(&mut self) {
        if let Err(e) = self.delete() {
            warn!("repository cleanup failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn caller_supplied_repositories_survive_deletion() {
        let dir = tempdir().unwrap();
        let mut repo = ResourceRepo::resolve(Some(dir.path())).unwrap();
        assert_eq!(repo.path(), dir.path());

        repo.delete().unwrap();
        assert!(dir.path().exists());
    }

    #[test]
    fn temporary_repositories_are_created_and_deleted() {
        let mut repo = ResourceRepo::resolve(None).unwrap();
        assert!(repo.path().exists());
        assert!(
            repo.path()
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap()
                .starts_with("devtestor-repo-")
        );

        let path = repo.path().to_path_buf();
        repo.delete().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn delete_is_idempotent() {
        let mut repo = ResourceRepo::resolve(None).unwrap();
        repo.delete().unwrap();
        repo.delete().unwrap();
    }

    #[test]
    fn drop_removes_owned_repositories() {
        let path = {
            let repo = ResourceRepo::resolve(None).unwrap();
            repo.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
