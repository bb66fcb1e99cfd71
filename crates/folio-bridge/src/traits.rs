// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the pipeline's collaborators.
//
// Implementations must be shareable across worker threads: the pipeline holds
// them behind `Arc` and calls into them from the blocking pool.

use std::future::Future;
use std::path::{Path, PathBuf};

use folio_core::error::Result;

/// Byte-level access to the host file system.
pub trait FileSystem: Send + Sync {
    /// Whether something already exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read the whole file.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or truncate `path` and write `bytes` to it.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Make sure `dir` exists and return the path outputs should be joined onto.
    fn ensure_dir(&self, dir: &Path) -> Result<PathBuf>;
}

/// Sandboxed hosts grant access to user-picked files only for the duration
/// of an explicit scope. See [`crate::scope::ScopedAccess`].
pub trait PermissionScope: Send + Sync {
    /// Start accessing `path`. `PermissionDenied` when the host refuses.
    fn acquire(&self, path: &Path) -> Result<()>;

    /// Stop accessing `path`. Only called after a successful `acquire`.
    fn release(&self, path: &Path);
}

/// One image delivered by an [`AssetSource`].
#[derive(Debug, Clone)]
pub struct AssetImage {
    pub id: String,
    /// Name of the asset's original file, when the library knows it.
    pub original_filename: Option<String>,
    /// Encoded image bytes (JPEG, PNG, ...).
    pub bytes: Vec<u8>,
    /// Low-resolution placeholder delivered ahead of the real image.
    pub degraded: bool,
}

/// A photo/asset library that resolves opaque ids into image data.
pub trait AssetSource: Send + Sync {
    /// Fetch the assets for `ids`, in the same order.
    ///
    /// A source may deliver degraded previews alongside (or instead of) the
    /// full-resolution image; callers filter on [`AssetImage::degraded`].
    fn fetch(&self, ids: &[String]) -> impl Future<Output = Result<Vec<AssetImage>>> + Send;
}
