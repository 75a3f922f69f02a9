//! Package publication into a repository.
//!
//! A repository is a directory holding a TOML package index and archive
//! copies:
//!
//! ```text
//! <repo>/index.toml
//! <repo>/packages/<name>.pkg
//! ```
//!
//! Publishing upserts by package name, so republishing into an existing
//! repository refreshes entries without dropping anything else it holds.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunError};
use crate::repo::ResourceRepo;

const INDEX_FILE: &str = "index.toml";
const ARCHIVE_DIR: &str = "packages";

/// The package index persisted at the repository root.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PackageIndex {
    #[serde(default)]
    pub package: Vec<PackageEntry>,
}

/// One published package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageEntry {
    /// Package name (the archive's file stem).
    pub name: String,
    /// Archive location relative to the repository root.
    pub archive: PathBuf,
    /// Archive size in bytes.
    pub size: u64,
    /// Publication time.
    pub published_at: DateTime<Utc>,
}

impl PackageIndex {
    /// Loads the index of an initialized repository.
    pub fn load(repo_path: &Path) -> anyhow::Result<Self> {
        let index_path = repo_path.join(INDEX_FILE);
        let content = fs::read_to_string(&index_path)
            .with_context(|| format!("failed to read package index {}", index_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("malformed package index {}", index_path.display()))
    }

    fn store(&self, repo_path: &Path) -> anyhow::Result<()> {
        let serialized =
            toml::to_string_pretty(self).context("failed to serialize package index")?;
        fs::write(repo_path.join(INDEX_FILE), serialized)
            .context("failed to write package index")?;
        Ok(())
    }

    fn upsert(&mut self, entry: PackageEntry) {
        match self.package.iter_mut().find(|p| p.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.package.push(entry),
        }
    }

    /// Whether any package was published.
    pub fn is_empty(&self) -> bool {
        self.package.is_empty()
    }
}

/// Publishes the given archives into the repository. The index is created
/// first unless `init_index` is false, in which case the repository must
/// already be initialized.
pub fn publish_packages(
    package_paths: &[PathBuf],
    repo: &ResourceRepo,
    init_index: bool,
) -> Result<()> {
    publish_inner(package_paths, repo.path(), init_index)
        .map_err(|e| RunError::Publish(format!("{e:#}")))
}

fn publish_inner(
    package_paths: &[PathBuf],
    repo_path: &Path,
    init_index: bool,
) -> anyhow::Result<()> {
    let index_path = repo_path.join(INDEX_FILE);
    let mut index = if index_path.exists() {
        PackageIndex::load(repo_path)?
    } else if init_index {
        debug!("initializing package index in {}", repo_path.display());
        fs::create_dir_all(repo_path)
            .with_context(|| format!("failed to create repository {}", repo_path.display()))?;
        PackageIndex::default()
    } else {
        bail!(
            "repository {} is not initialized and --no-repo-init was given",
            repo_path.display()
        );
    };

    let archive_dir = repo_path.join(ARCHIVE_DIR);
    fs::create_dir_all(&archive_dir)
        .with_context(|| format!("failed to create {}", archive_dir.display()))?;

    for package_path in package_paths {
        let file_name = package_path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("package path {} has no file name", package_path.display()))?;
        let name = package_path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name)
            .to_string();
        let destination = archive_dir.join(file_name);
        let size = fs::copy(package_path, &destination).with_context(|| {
            format!(
                "failed to copy {} into the repository",
                package_path.display()
            )
        })?;
        info!("published {name} ({size} bytes)");
        index.upsert(PackageEntry {
            name,
            archive: PathBuf::from(ARCHIVE_DIR).join(file_name),
            size,
            published_at: Utc::now(),
        });
    }

    index.store(repo_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn archive(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn publishing_initializes_the_index_and_copies_archives() {
        let out = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let repo = ResourceRepo::resolve(Some(repo_dir.path())).unwrap();
        let pkg = archive(out.path(), "base_unittests.pkg", b"archive-bytes");

        publish_packages(&[pkg], &repo, true).unwrap();

        assert!(repo_dir.path().join("index.toml").exists());
        assert!(
            repo_dir
                .path()
                .join("packages")
                .join("base_unittests.pkg")
                .exists()
        );

        let index = PackageIndex::load(repo_dir.path()).unwrap();
        assert_eq!(index.package.len(), 1);
        assert_eq!(index.package[0].name, "base_unittests");
        assert_eq!(index.package[0].size, b"archive-bytes".len() as u64);
    }

    #[test]
    fn republishing_upserts_by_name() {
        let out = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let repo = ResourceRepo::resolve(Some(repo_dir.path())).unwrap();

        let pkg = archive(out.path(), "web_engine.pkg", b"v1");
        publish_packages(&[pkg], &repo, true).unwrap();
        let pkg = archive(out.path(), "web_engine.pkg", b"v2-longer");
        publish_packages(&[pkg], &repo, true).unwrap();

        let index = PackageIndex::load(repo_dir.path()).unwrap();
        assert_eq!(index.package.len(), 1);
        assert_eq!(index.package[0].size, b"v2-longer".len() as u64);
    }

    #[test]
    fn existing_entries_survive_a_new_publication() {
        let out = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let repo = ResourceRepo::resolve(Some(repo_dir.path())).unwrap();

        let first = archive(out.path(), "web_engine.pkg", b"engine");
        publish_packages(&[first], &repo, true).unwrap();
        let second = archive(out.path(), "blink_shell.pkg", b"shell");
        publish_packages(&[second], &repo, true).unwrap();

        let index = PackageIndex::load(repo_dir.path()).unwrap();
        assert_eq!(index.package.len(), 2);
    }

    #[test]
    fn skipping_init_on_an_uninitialized_repository_fails() {
        let out = tempdir().unwrap();
        let repo_dir = tempdir().unwrap();
        let repo = ResourceRepo::resolve(Some(repo_dir.path())).unwrap();
        let pkg = archive(out.path(), "base_unittests.pkg", b"bytes");

        let err = publish_packages(&[pkg], &repo, false).unwrap_err();
        assert!(matches!(err, RunError::Publish(_)));
        assert!(err.to_string().contains("not initialized"));
        assert!(!repo_dir.path().join("index.toml").exists());
    }

    #[test]
    fn missing_archives_are_publish_errors() {
        let repo_dir = tempdir().unwrap();
        let repo = ResourceRepo::resolve(Some(repo_dir.path())).unwrap();
        let missing = repo_dir.path().join("nope.pkg");

        let err = publish_packages(&[missing], &repo, true).unwrap_err();
        assert!(matches!(err, RunError::Publish(_)));
    }
}
