// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Split a PDF into one file per page.
//
// Pages are snapshotted once on the blocking pool, then every page becomes its
// own unit: rasterise at full scale, encode as JPEG or a one-page PDF, write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_bridge::{FileSystem, PermissionScope, read_scoped};
use folio_core::error::{FolioError, Result};
use folio_core::{
    CompressionTier, FolioConfig, NamingContext, NamingPolicy, OperationKind, OutputFormat,
    SplitReport,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::barrier::TaskBarrier;
use crate::collision::CollisionDetector;
use crate::pdf::assembler::ImageAssembler;
use crate::pdf::source::{SourcePage, snapshot_all};
use crate::render::PageRasterizer;

/// Writes each page of a source PDF as its own JPEG or PDF file.
#[derive(Clone)]
pub struct DocumentSplitter {
    config: Arc<FolioConfig>,
    fs: Arc<dyn FileSystem>,
    scope: Arc<dyn PermissionScope>,
    rasterizer: Arc<PageRasterizer>,
    assembler: Arc<ImageAssembler>,
    collisions: CollisionDetector,
}

/// Everything a page unit needs, shared between units.
struct PageJob {
    config: Arc<FolioConfig>,
    fs: Arc<dyn FileSystem>,
    rasterizer: Arc<PageRasterizer>,
    assembler: Arc<ImageAssembler>,
    format: OutputFormat,
    author: String,
}

/// Page units in flight plus what is already known about the split.
struct PendingSplit {
    barrier: TaskBarrier<Result<PathBuf>>,
    tally: SplitTally,
}

struct SplitTally {
    source: PathBuf,
    destination: PathBuf,
    fail_on_skipped_page: bool,
    dispatched: Vec<u32>,
    skipped_pages: Vec<u32>,
}

impl DocumentSplitter {
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

    /// Split `source` into `destination`, one file per page.
    ///
    /// Resolves once every page unit has finished. Pages that cannot be
    /// rasterised are listed in `skipped_pages`; a write failure fails the
    /// whole split. When access to `source` is refused the report is empty.
    pub async fn split(
        &self,
        source: &Path,
        destination: &Path,
        format: OutputFormat,
        allow_copy: bool,
        author: &str,
    ) -> Result<SplitReport> {
        let PendingSplit { barrier, tally } = self
            .dispatch(source, destination, format, allow_copy, author)
            .await?;
        tally.finish(barrier.join().await)
    }

    /// Spawn a split and hand its result to `completion` once the last page
    /// unit has joined.
    pub fn split_with<F>(
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
        let splitter = self.clone();
        tokio::spawn(async move {
            let pending = splitter
                .dispatch(&source, &destination, format, allow_copy, &author)
                .await;
            match pending {
                Ok(PendingSplit { barrier, tally }) => {
                    let joined = barrier
                        .on_complete(move |slots| completion(tally.finish(slots)))
                        .await;
                    if let Err(err) = joined {
                        error!(source = %source.display(), error = %err, "Split completion failed");
                    }
                }
                Err(err) => completion(Err(err)),
            }
        })
    }

    /// Read and snapshot `source`, then dispatch one unit per readable page.
    #[instrument(skip_all, fields(source = %source.display(), ?format, allow_copy = allow_copy))]
    async fn dispatch(
        &self,
        source: &Path,
        destination: &Path,
        format: OutputFormat,
        allow_copy: bool,
        author: &str,
    ) -> Result<PendingSplit> {
        let destination = self.fs.ensure_dir(destination)?;
        let mut barrier = TaskBarrier::with_limit("split", self.config.max_parallel_tasks);
        let mut tally = SplitTally {
            source: source.to_path_buf(),
            destination,
            fail_on_skipped_page: self.config.fail_on_skipped_page,
            dispatched: Vec::new(),
            skipped_pages: Vec::new(),
        };

        let Some(bytes) = self.read_source(source).await? else {
            return Ok(PendingSplit { barrier, tally });
        };

        let pages = tokio::task::spawn_blocking(move || snapshot_all(&bytes))
            .await
            .map_err(|err| FolioError::OpenFailure(format!("snapshot task failed: {}", err)))??;
        let page_count = pages.len() as u32;
        info!(pages = page_count, "Splitting document");

        let (base_name, extension) = NamingPolicy::stem_and_extension(source);
        let job = Arc::new(PageJob {
            config: Arc::clone(&self.config),
            fs: Arc::clone(&self.fs),
            rasterizer: Arc::clone(&self.rasterizer),
            assembler: Arc::clone(&self.assembler),
            format,
            author: self.config.author_or_default(author).to_string(),
        });

        for (number, snapshot) in (1..=page_count).zip(pages) {
            let page = match snapshot {
                Ok(page) => page,
                Err(err) => {
                    warn!(page = number, error = %err, "Page could not be read, skipping");
                    tally.skipped_pages.push(number);
                    continue;
                }
            };
            let ctx = NamingContext::new(OperationKind::Split)
                .with_page(NamingPolicy::page_label(number, page_count))
                .with_format(format);
            let path = self
                .collisions
                .resolve(&tally.destination, &base_name, &extension, &ctx, allow_copy);

            let job = Arc::clone(&job);
            barrier.dispatch_blocking(move || job.write_page(&page, &path).map(|()| path));
            tally.dispatched.push(number);
        }

        Ok(PendingSplit { barrier, tally })
    }

    /// Read `source` inside its permission scope. `None` when access is refused.
    async fn read_source(&self, source: &Path) -> Result<Option<Vec<u8>>> {
        let fs = Arc::clone(&self.fs);
        let scope = Arc::clone(&self.scope);
        let path = source.to_path_buf();
        tokio::task::spawn_blocking(move || read_scoped(&*fs, &*scope, &path))
            .await
            .map_err(|err| FolioError::OpenFailure(format!("read task failed: {}", err)))?
    }
}

impl SplitTally {
    /// Fold the joined page slots, in dispatch order, into the report.
    fn finish(self, slots: Vec<Option<Result<PathBuf>>>) -> Result<SplitReport> {
        let Self {
            source,
            destination,
            fail_on_skipped_page,
            dispatched,
            mut skipped_pages,
        } = self;

        let mut written = Vec::with_capacity(dispatched.len());
        let mut terminal = None;
        for (number, slot) in dispatched.into_iter().zip(slots) {
            match slot {
                Some(Ok(path)) => written.push(path),
                Some(Err(err)) if err.is_terminal() => {
                    warn!(page = number, error = %err, "Page write failed");
                    terminal.get_or_insert(err);
                }
                Some(Err(err)) => {
                    warn!(page = number, error = %err, "Page could not be rasterised, skipping");
                    skipped_pages.push(number);
                }
                None => skipped_pages.push(number),
            }
        }

        if let Some(err) = terminal {
            return Err(err);
        }
        skipped_pages.sort_unstable();
        if fail_on_skipped_page && !skipped_pages.is_empty() {
            return Err(FolioError::EncodeFailure(format!(
                "pages {:?} of {} could not be rasterised",
                skipped_pages,
                source.display()
            )));
        }

        info!(
            written = written.len(),
            skipped = skipped_pages.len(),
            "Split complete"
        );
        Ok(SplitReport {
            destination,
            written,
            skipped_pages,
        })
    }
}

impl PageJob {
    fn write_page(&self, page: &SourcePage, path: &Path) -> Result<()> {
        let raster = self.rasterizer.rasterize(page, CompressionTier::None)?;
        let bytes = match self.format {
            OutputFormat::Jpg => raster.to_jpeg_bytes(self.config.split_jpeg_quality)?,
            OutputFormat::Pdf => self.assembler.single_page(&raster, &self.author)?,
        };
        drop(raster);
        self.fs.write(path, &bytes)?;
        debug!(page = page.number(), path = %path.display(), bytes = bytes.len(), "Page written");
        Ok(())
    }
}
