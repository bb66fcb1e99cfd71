// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DocumentService: one entry point for every document operation.
//
// Each operation comes in two shapes: an async function resolving to the
// report, and a `_with` variant that runs on the current tokio runtime and
// hands the report to a completion callback exactly once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_bridge::{AssetSource, FileSystem, LocalFileSystem, PermissionScope, UnscopedAccess};
use folio_core::error::Result;
use folio_core::{CompressReport, CompressionTier, FolioConfig, OutputFormat, SplitReport};
use tokio::task::JoinHandle;

use crate::builder::DocumentBuilder;
use crate::compress::DocumentCompressor;
use crate::image::RasterImage;
use crate::split::DocumentSplitter;

/// Shared collaborators plus the three pipelines built on them.
#[derive(Clone)]
pub struct DocumentService {
    config: Arc<FolioConfig>,
    builder: DocumentBuilder,
    splitter: DocumentSplitter,
    compressor: DocumentCompressor,
}

impl DocumentService {
    pub fn new(
        config: FolioConfig,
        fs: Arc<dyn FileSystem>,
        scope: Arc<dyn PermissionScope>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            builder: DocumentBuilder::new(Arc::clone(&config), Arc::clone(&fs)),
            splitter: DocumentSplitter::new(Arc::clone(&config), Arc::clone(&fs), Arc::clone(&scope)),
            compressor: DocumentCompressor::new(Arc::clone(&config), fs, scope),
            config,
        }
    }

    /// Service over the local filesystem with no permission scoping.
    pub fn local(config: FolioConfig) -> Self {
        Self::new(config, Arc::new(LocalFileSystem), Arc::new(UnscopedAccess))
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    // -- Build ---------------------------------------------------------------

    pub fn build_document(&self, images: &[RasterImage], author: &str) -> Result<Vec<u8>> {
        self.builder.build_document(images, author)
    }

    pub fn build_document_file(
        &self,
        name: &str,
        images: &[RasterImage],
        author: &str,
        destination: &Path,
        allow_copy: bool,
    ) -> Result<PathBuf> {
        self.builder
            .build_document_file(name, images, author, destination, allow_copy)
    }

    pub async fn build_from_assets<S: AssetSource>(
        &self,
        source: &S,
        ids: &[String],
        fallback_name: &str,
        author: &str,
        destination: &Path,
        allow_copy: bool,
    ) -> Result<PathBuf> {
        self.builder
            .build_from_assets(source, ids, fallback_name, author, destination, allow_copy)
            .await
    }

    // -- Split ---------------------------------------------------------------

    pub async fn split_document(
        &self,
        source: &Path,
        destination: &Path,
        format: OutputFormat,
        allow_copy: bool,
        author: &str,
    ) -> Result<SplitReport> {
        self.splitter
            .split(source, destination, format, allow_copy, author)
            .await
    }

    /// [`split_document`](Self::split_document) on a spawned task; `completion`
    /// runs once, after the last page unit joins.
    pub fn split_document_with<F>(
        &self,
        source: PathBuf,
        destination: PathBuf,
        format: OutputFormat,
        allow_copy: bool,
        author: String,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<SplitReport>) + Send + 'static,
    {
        self.splitter
            .split_with(source, destination, format, allow_copy, author, completion)
    }

    // -- Compress ------------------------------------------------------------

    pub async fn compress_documents(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        tier: CompressionTier,
        allow_copy: bool,
        author: &str,
    ) -> Result<CompressReport> {
        self.compressor
            .compress(sources, destination, tier, allow_copy, author)
            .await
    }

    /// [`compress_documents`](Self::compress_documents) on a spawned task;
    /// `completion` runs once, after the last document unit joins.
    pub fn compress_documents_with<F>(
        &self,
        sources: Vec<PathBuf>,
        destination: PathBuf,
        tier: CompressionTier,
        allow_copy: bool,
        author: String,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<CompressReport>) + Send + 'static,
    {
        self.compressor
            .compress_with(sources, destination, tier, allow_copy, author, completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{solid_image, write_numbered_pdf};
    use folio_core::FolioError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn build_document_counts_pages() {
        let service = DocumentService::local(FolioConfig::default());
        let images = vec![solid_image(20, 30, [9, 9, 9]); 5];
        let bytes = service.build_document(&images, "").expect("build");
        let doc = crate::pdf::source::SourceDocument::from_bytes(&bytes).expect("open");
        assert_eq!(doc.page_count(), 5);
        assert!(matches!(
            service.build_document(&[], ""),
            Err(FolioError::EmptyInput(_))
        ));
    }

    #[test]
    fn blank_author_falls_back_to_configured_default() {
        let config = FolioConfig {
            default_author: "Folio".into(),
            ..FolioConfig::default()
        };
        let service = DocumentService::local(config);
        let bytes = service
            .build_document(&[solid_image(4, 4, [0, 0, 0])], "  ")
            .expect("build");
        let doc = crate::pdf::source::SourceDocument::from_bytes(&bytes).expect("open");
        assert_eq!(doc.author().as_deref(), Some("Folio"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn split_completion_receives_destination() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        let source = write_numbered_pdf(input.path(), "Scan.pdf", 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel();

        let counter = Arc::clone(&calls);
        DocumentService::local(FolioConfig::default())
            .split_document_with(
                source,
                output.path().to_path_buf(),
                OutputFormat::Jpg,
                false,
                String::new(),
                move |result| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(result);
                },
            )
            .await
            .expect("completion task");

        let report = rx.await.expect("delivered").expect("split");
        assert_eq!(report.destination, output.path());
        assert_eq!(report.written.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn compress_completion_receives_written_paths() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        let sources = vec![
            write_numbered_pdf(input.path(), "a.pdf", 1),
            write_numbered_pdf(input.path(), "b.pdf", 2),
        ];
        let (tx, rx) = tokio::sync::oneshot::channel();

        DocumentService::local(FolioConfig::default())
            .compress_documents_with(
                sources,
                output.path().to_path_buf(),
                CompressionTier::Medium,
                false,
                String::new(),
                move |result| {
                    let _ = tx.send(result);
                },
            )
            .await
            .expect("completion task");

        let report = rx.await.expect("delivered").expect("compress");
        assert_eq!(
            report.written,
            vec![
                output.path().join("Compressed_a.pdf"),
                output.path().join("Compressed_b.pdf"),
            ]
        );
    }

    #[tokio::test]
    async fn unwritable_destination_fails_the_operation() {
        let input = tempfile::tempdir().expect("tempdir");
        let source = write_numbered_pdf(input.path(), "a.pdf", 1);
        // A regular file where the destination directory should be.
        let blocked = input.path().join("blocked");
        std::fs::write(&blocked, b"file").expect("write");

        let err = DocumentService::local(FolioConfig::default())
            .compress_documents(&[source], &blocked, CompressionTier::Low, false, "")
            .await
            .expect_err("destination is a file");
        assert!(matches!(err, FolioError::WriteFailure(_)));
        assert!(err.is_terminal());
    }
}
