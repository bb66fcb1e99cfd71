// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RAII guard around a permission scope.

use std::path::{Path, PathBuf};

use folio_core::error::Result;
use tracing::{debug, warn};

use crate::traits::{FileSystem, PermissionScope};

/// Holds access to one path; released when dropped.
pub struct ScopedAccess<'a, P: PermissionScope + ?Sized> {
    scope: &'a P,
    path: PathBuf,
}

impl<'a, P: PermissionScope + ?Sized> ScopedAccess<'a, P> {
    /// Acquire access to `path`, failing with whatever the scope reports.
    pub fn acquire(scope: &'a P, path: &Path) -> Result<Self> {
        scope.acquire(path)?;
        debug!(path = %path.display(), "scope acquired");
        Ok(Self {
            scope,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<P: PermissionScope + ?Sized> Drop for ScopedAccess<'_, P> {
    fn drop(&mut self) {
        self.scope.release(&self.path);
        debug!(path = %self.path.display(), "scope released");
    }
}

/// Read `path` through `fs` while holding access to it.
///
/// `Ok(None)` when the scope refuses access; read errors propagate. The scope
/// is released before the bytes are returned.
pub fn read_scoped(
    fs: &dyn FileSystem,
    scope: &dyn PermissionScope,
    path: &Path,
) -> Result<Option<Vec<u8>>> {
    let access = match ScopedAccess::acquire(scope, path) {
        Ok(access) => access,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Access refused, skipping input");
            return Ok(None);
        }
    };
    let bytes = fs.read(access.path())?;
    Ok(Some(bytes))
}
