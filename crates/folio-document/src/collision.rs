// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Destination collision handling: overwrite or fall back to a " (Copy)" name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_bridge::FileSystem;
use folio_core::{NamingContext, NamingPolicy};
use tracing::debug;

/// Picks the final output path for a named file in a destination directory.
#[derive(Clone)]
pub struct CollisionDetector {
    fs: Arc<dyn FileSystem>,
}

impl CollisionDetector {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Resolve the path for `base_name`/`extension` under `ctx`.
    ///
    /// The plain name is used unless it already exists and `allow_copy` is
    /// set, in which case the copy-suffixed name is returned instead. An
    /// existing file without `allow_copy` is overwritten.
    pub fn resolve(
        &self,
        destination: &Path,
        base_name: &str,
        extension: &str,
        ctx: &NamingContext,
        allow_copy: bool,
    ) -> PathBuf {
        self.resolve_unless(destination, base_name, extension, ctx, allow_copy, |_| false)
    }

    /// Resolve the path for one member of a batch, named after `source`.
    ///
    /// Paths already in `claimed` count as taken even though nothing has been
    /// written yet. The chosen path is added to `claimed`, so resolving a batch
    /// in input order gives the same names on every run.
    pub fn claim_for(
        &self,
        destination: &Path,
        source: &Path,
        ctx: &NamingContext,
        allow_copy: bool,
        claimed: &mut HashSet<PathBuf>,
    ) -> PathBuf {
        let (base_name, extension) = NamingPolicy::stem_and_extension(source);
        let path = self.resolve_unless(
            destination,
            &base_name,
            &extension,
            ctx,
            allow_copy,
            |path| claimed.contains(path),
        );
        claimed.insert(path.clone());
        path
    }

    fn resolve_unless(
        &self,
        destination: &Path,
        base_name: &str,
        extension: &str,
        ctx: &NamingContext,
        allow_copy: bool,
        claimed: impl Fn(&Path) -> bool,
    ) -> PathBuf {
        let plain = ctx.clone().as_copy(false);
        let candidate = destination.join(NamingPolicy::file_name(base_name, extension, &plain));
        if allow_copy && (claimed(&candidate) || self.fs.exists(&candidate)) {
            let copy = destination.join(NamingPolicy::file_name(
                base_name,
                extension,
                &plain.as_copy(true),
            ));
            debug!(
                taken = %candidate.display(),
                chosen = %copy.display(),
                "Destination exists, writing a copy"
            );
            return copy;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_bridge::LocalFileSystem;
    use folio_core::{OperationKind, OutputFormat};

    fn detector() -> CollisionDetector {
        CollisionDetector::new(Arc::new(LocalFileSystem))
    }

    #[test]
    fn free_name_is_used_as_is() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = detector().claim_for(
            dir.path(),
            Path::new("/in/Report.pdf"),
            &NamingContext::new(OperationKind::Compress),
            true,
            &mut HashSet::new(),
        );
        assert_eq!(path, dir.path().join("Compressed_Report.pdf"));
    }

    #[test]
    fn taken_name_gets_copy_suffix_when_allowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("Compressed_Report.pdf"), b"old").expect("seed");

        let ctx = NamingContext::new(OperationKind::Compress);
        let path = detector().resolve(dir.path(), "Report", "pdf", &ctx, true);
        assert_eq!(path, dir.path().join("Compressed_Report (Copy).pdf"));
    }

    #[test]
    fn taken_name_is_overwritten_without_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("Scan 03.jpg"), b"old").expect("seed");

        let ctx = NamingContext::new(OperationKind::Split)
            .with_page("03")
            .with_format(OutputFormat::Jpg);
        let path = detector().resolve(dir.path(), "Scan", "pdf", &ctx, false);
        assert_eq!(path, dir.path().join("Scan 03.jpg"));
    }

    #[test]
    fn claimed_names_count_as_taken_within_a_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = NamingContext::new(OperationKind::Compress);
        let detector = detector();
        let claim = |source: &str, allow_copy: bool, claimed: &mut HashSet<PathBuf>| {
            detector.claim_for(dir.path(), Path::new(source), &ctx, allow_copy, claimed)
        };

        let mut claimed = HashSet::new();
        assert_eq!(
            claim("/a/Report.pdf", true, &mut claimed),
            dir.path().join("Compressed_Report.pdf")
        );
        assert_eq!(
            claim("/b/Report.pdf", true, &mut claimed),
            dir.path().join("Compressed_Report (Copy).pdf")
        );

        // Without copies both members target the plain name.
        let mut claimed = HashSet::new();
        let first = claim("/a/Report.pdf", false, &mut claimed);
        assert_eq!(claim("/b/Report.pdf", false, &mut claimed), first);
    }
}
