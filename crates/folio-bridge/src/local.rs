// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop implementations of the bridge traits.
//
// Used by the CLI and by tests. Nothing here is sandboxed: permission scopes
// are always granted and assets are plain files under a directory.

use std::path::{Component, Path, PathBuf};

use folio_core::error::{FolioError, Result};
use tracing::{debug, instrument};

use crate::traits::{AssetImage, AssetSource, FileSystem, PermissionScope};

// ---------------------------------------------------------------------------
// File system
// ---------------------------------------------------------------------------

/// `std::fs`-backed [`FileSystem`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path)
            .map_err(|err| FolioError::OpenFailure(format!("{}: {}", path.display(), err)))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        std::fs::write(path, bytes)
            .map_err(|err| FolioError::WriteFailure(format!("{}: {}", path.display(), err)))?;
        debug!(path = %path.display(), size = bytes.len(), "file written");
        Ok(())
    }

    fn ensure_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|err| {
            FolioError::WriteFailure(format!("cannot create {}: {}", dir.display(), err))
        })?;
        if !dir.is_dir() {
            return Err(FolioError::WriteFailure(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(dir.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// Permission scope
// ---------------------------------------------------------------------------

/// [`PermissionScope`] for unsandboxed hosts: every request is granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnscopedAccess;

impl PermissionScope for UnscopedAccess {
    fn acquire(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn release(&self, _path: &Path) {}
}

// ---------------------------------------------------------------------------
// Asset source
// ---------------------------------------------------------------------------

/// Serves asset ids as relative file paths under a root directory.
///
/// Files on disk are always full resolution, so nothing is marked degraded.
#[derive(Debug, Clone)]
pub struct DirectoryAssetSource {
    root: PathBuf,
}

impl DirectoryAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, id: &str) -> Result<PathBuf> {
        let relative = Path::new(id);
        let contained = !id.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !contained {
            return Err(FolioError::Bridge(format!(
                "asset id '{id}' escapes {}",
                self.root.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for DirectoryAssetSource {
    #[instrument(skip(self, ids), fields(root = %self.root.display(), count = ids.len()))]
    async fn fetch(&self, ids: &[String]) -> Result<Vec<AssetImage>> {
        let mut assets = Vec::with_capacity(ids.len());
        for id in ids {
            let path = self.resolve(id)?;
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|err| FolioError::Bridge(format!("asset '{id}': {err}")))?;
            let original_filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            assets.push(AssetImage {
                id: id.clone(),
                original_filename,
                bytes,
                degraded: false,
            });
        }
        debug!(fetched = assets.len(), "assets fetched");
        Ok(assets)
    }
}
