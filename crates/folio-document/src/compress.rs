// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recompress PDFs by rasterising every page at a compression tier.
//
// One unit per document. Output names are claimed in input order before any
// unit starts. Inside a unit pages are handled one at a time: the snapshot and
// its pixmap are dropped before the next page is opened, so only the degraded
// rasters accumulate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_bridge::{FileSystem, PermissionScope, read_scoped};
use folio_core::error::{FolioError, Result};
use folio_core::{
    CompressReport, CompressionTier, DocumentOutcome, FolioConfig, NamingContext, OperationKind,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::barrier::TaskBarrier;
use crate::collision::CollisionDetector;
use crate::pdf::assembler::{ImageAssembler, Placement, natural_rect};
use crate::pdf::source::SourceDocument;
use crate::render::PageRasterizer;

/// Rasterises and reassembles batches of PDFs.
#[derive(Clone)]
pub struct DocumentCompressor {
    config: Arc<FolioConfig>,
    fs: Arc<dyn FileSystem>,
    scope: Arc<dyn PermissionScope>,
    rasterizer: Arc<PageRasterizer>,
    assembler: Arc<ImageAssembler>,
    collisions: CollisionDetector,
}

/// Per-batch settings shared by every document unit.
struct BatchJob {
    compressor: DocumentCompressor,
    tier: CompressionTier,
    author: String,
}

/// Document units in flight, one slot per source.
struct PendingBatch {
    barrier: TaskBarrier<DocumentOutcome>,
    sources: Vec<PathBuf>,
}

impl DocumentCompressor {
    pub fn new(
        config: Arc<FolioConfig>,
        fs: Arc<dyn FileSystem>,
        scope: Arc<dyn PermissionScope>,
    ) -> Self {
        Self {
            rasterizer: Arc::new(PageRasterizer::from_config(&config)),
            assembler: Arc::new(ImageAssembler::default()),
            collisions: CollisionDetector::new(Arc::clone(&fs)),
            config,
            fs,
            scope,
        }
    }

    /// Compress every document in `sources` into `destination`.
    ///
    /// The report carries one outcome per source in input order. A document
    /// that cannot be opened, rasterised or written fails on its own; only an
    /// unusable destination fails the batch.
    pub async fn compress(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        tier: CompressionTier,
        allow_copy: bool,
        author: &str,
    ) -> Result<CompressReport> {
        let pending = self.dispatch(sources, destination, tier, allow_copy, author)?;
        let slots = pending.barrier.join().await;
        Ok(finish(&pending.sources, slots))
    }

    /// Spawn a compression batch and hand its result to `completion` once the
    /// last document unit has joined.
    pub fn compress_with<F>(
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
        let compressor = self.clone();
        tokio::spawn(async move {
            match compressor.dispatch(&sources, &destination, tier, allow_copy, &author) {
                Ok(PendingBatch { barrier, sources }) => {
                    let joined = barrier
                        .on_complete(move |slots| completion(Ok(finish(&sources, slots))))
                        .await;
                    if let Err(err) = joined {
                        error!(error = %err, "Compression completion failed");
                    }
                }
                Err(err) => completion(Err(err)),
            }
        })
    }

    /// Claim every output name in input order, then dispatch one unit per source.
    #[instrument(skip_all, fields(documents = sources.len(), %tier, allow_copy = allow_copy))]
    fn dispatch(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        tier: CompressionTier,
        allow_copy: bool,
        author: &str,
    ) -> Result<PendingBatch> {
        let destination = self.fs.ensure_dir(destination)?;
        info!(destination = %destination.display(), "Compressing documents");

        let ctx = NamingContext::new(OperationKind::Compress);
        let mut claimed = HashSet::with_capacity(sources.len());
        let job = Arc::new(BatchJob {
            compressor: self.clone(),
            tier,
            author: self.config.author_or_default(author).to_string(),
        });

        let mut barrier = TaskBarrier::with_limit("compress", self.config.max_parallel_tasks);
        for source in sources {
            let output = self
                .collisions
                .claim_for(&destination, source, &ctx, allow_copy, &mut claimed);
            let job = Arc::clone(&job);
            let source = source.clone();
            barrier.dispatch_blocking(move || job.run(&source, output));
        }

        Ok(PendingBatch {
            barrier,
            sources: sources.to_vec(),
        })
    }
}

/// Fill empty slots with failures and build the report.
fn finish(sources: &[PathBuf], slots: Vec<Option<DocumentOutcome>>) -> CompressReport {
    let outcomes: Vec<DocumentOutcome> = slots
        .into_iter()
        .zip(sources)
        .map(|(slot, source)| {
            slot.unwrap_or_else(|| DocumentOutcome::Failed {
                reason: format!("compression of {} did not complete", source.display()),
            })
        })
        .collect();

    let report = CompressReport::from_outcomes(outcomes);
    info!(
        written = report.written.len(),
        failed = report.failed_count(),
        "Compression complete"
    );
    report
}

impl BatchJob {
    fn run(&self, source: &Path, output: PathBuf) -> DocumentOutcome {
        match self.compress_one(source, output) {
            Ok((path, skipped_pages)) => DocumentOutcome::Written {
                path,
                skipped_pages,
            },
            Err(err) => {
                warn!(source = %source.display(), error = %err, "Document not compressed");
                DocumentOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn compress_one(&self, source: &Path, path: PathBuf) -> Result<(PathBuf, Vec<u32>)> {
        let compressor = &self.compressor;
        let bytes = read_scoped(&*compressor.fs, &*compressor.scope, source)?.ok_or_else(|| {
            FolioError::PermissionDenied(source.display().to_string())
        })?;
        let document = SourceDocument::from_bytes(&bytes)?;
        drop(bytes);

        let page_count = document.page_count();
        let mut images = Vec::with_capacity(page_count as usize);
        let mut skipped_pages = Vec::new();

        for number in 1..=page_count {
            let rendered = document
                .page(number)
                .and_then(|page| compressor.rasterizer.rasterize(&page, self.tier));
            match rendered {
                Ok(image) => images.push(image),
                Err(err) if compressor.config.fail_on_skipped_page => return Err(err),
                Err(err) => {
                    warn!(source = %source.display(), page = number, error = %err, "Page skipped");
                    skipped_pages.push(number);
                }
            }
        }
        drop(document);

        let first = images.first().ok_or_else(|| {
            FolioError::EmptyInput(format!(
                "no page of {} could be rasterised",
                source.display()
            ))
        })?;
        let canvas = natural_rect(first)?;
        let pdf = compressor
            .assembler
            .assemble(&images, canvas, &self.author, Placement::Natural)?;
        drop(images);

        compressor.fs.write(&path, &pdf)?;
        debug!(
            source = %source.display(),
            path = %path.display(),
            bytes = pdf.len(),
            "Compressed document written"
        );
        Ok((path, skipped_pages))
    }
}
