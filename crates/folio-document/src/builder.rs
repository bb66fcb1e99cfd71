// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Build a PDF from images, either decoded by the caller or fetched from an
// asset library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_bridge::{AssetSource, FileSystem};
use folio_core::error::{FolioError, Result};
use folio_core::{FolioConfig, NamingContext, OperationKind};
use tracing::{debug, info, instrument, warn};

use crate::collision::CollisionDetector;
use crate::image::RasterImage;
use crate::pdf::assembler::{ImageAssembler, Placement};
use crate::pdf::geometry::PageGeometryResolver;

/// Turns an ordered list of images into a PDF, one page per image.
#[derive(Clone)]
pub struct DocumentBuilder {
    config: Arc<FolioConfig>,
    fs: Arc<dyn FileSystem>,
    geometry: PageGeometryResolver,
    assembler: Arc<ImageAssembler>,
    collisions: CollisionDetector,
}

impl DocumentBuilder {
    pub fn new(config: Arc<FolioConfig>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            geometry: PageGeometryResolver::from_config(&config),
            assembler: Arc::new(ImageAssembler::default()),
            collisions: CollisionDetector::new(Arc::clone(&fs)),
            config,
            fs,
        }
    }

    /// PDF bytes with one page per image. Every page takes the geometry of
    /// the first image fitted to the canvas.
    #[instrument(skip_all, fields(images = images.len()))]
    pub fn build_document(&self, images: &[RasterImage], author: &str) -> Result<Vec<u8>> {
        let Some(first) = images.first() else {
            return Err(FolioError::EmptyInput(
                "no images to build a document from".into(),
            ));
        };
        let page = self.geometry.resolve(Some(first));
        debug!(width = page.width(), height = page.height(), "Page geometry resolved");
        self.assembler.assemble(
            images,
            page,
            self.config.author_or_default(author),
            Placement::FitLongSide,
        )
    }

    /// Build and write `{name}.pdf` into `destination`.
    pub fn build_document_file(
        &self,
        name: &str,
        images: &[RasterImage],
        author: &str,
        destination: &Path,
        allow_copy: bool,
    ) -> Result<PathBuf> {
        let pdf = self.build_document(images, author)?;
        let destination = self.fs.ensure_dir(destination)?;
        let path = self.collisions.resolve(
            &destination,
            name,
            "pdf",
            &NamingContext::new(OperationKind::Convert),
            allow_copy,
        );
        self.fs.write(&path, &pdf)?;
        info!(path = %path.display(), pages = images.len(), "Document built");
        Ok(path)
    }

    /// Fetch `ids` from `source` and build a document from the full-resolution
    /// images, named after the first asset's original file.
    #[instrument(skip_all, fields(assets = ids.len()))]
    pub async fn build_from_assets<S: AssetSource>(
        &self,
        source: &S,
        ids: &[String],
        fallback_name: &str,
        author: &str,
        destination: &Path,
        allow_copy: bool,
    ) -> Result<PathBuf> {
        let assets = source.fetch(ids).await?;
        let assets: Vec<_> = assets.into_iter().filter(|asset| !asset.degraded).collect();

        let name = assets
            .first()
            .and_then(|asset| asset.original_filename.as_deref())
            .and_then(|file| Path::new(file).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| fallback_name.to_string());

        let builder = self.clone();
        let author = author.to_string();
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let images: Vec<RasterImage> = assets
                .iter()
                .filter_map(|asset| match RasterImage::from_bytes(&asset.bytes) {
                    Ok(image) => Some(image),
                    Err(err) => {
                        warn!(asset = %asset.id, error = %err, "Asset could not be decoded, skipping");
                        None
                    }
                })
                .collect();
            drop(assets);
            builder.build_document_file(&name, &images, &author, &destination, allow_copy)
        })
        .await
        .map_err(|err| FolioError::EncodeFailure(format!("build task failed: {}", err)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::source::SourceDocument;
    use crate::test_support::{solid_image, solid_jpeg};
    use folio_bridge::{AssetImage, DirectoryAssetSource, LocalFileSystem};

    fn builder() -> DocumentBuilder {
        DocumentBuilder::new(Arc::new(FolioConfig::default()), Arc::new(LocalFileSystem))
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.1
    }

    /// Serves fixed assets, flagging every other one as a degraded preview.
    struct PreviewingSource {
        assets: Vec<AssetImage>,
    }

    impl AssetSource for PreviewingSource {
        async fn fetch(&self, _ids: &[String]) -> Result<Vec<AssetImage>> {
            Ok(self.assets.clone())
        }
    }

    #[test]
    fn one_page_per_image_in_order() {
        let images: Vec<_> = [10, 20, 30, 40]
            .iter()
            .map(|&w| solid_image(w, 60, [0, 0, 0]))
            .collect();
        let bytes = builder().build_document(&images, "Ada").expect("build");
        let doc = SourceDocument::from_bytes(&bytes).expect("open");
        assert_eq!(doc.page_count(), 4);
        let widths: Vec<u32> = (1..=4)
            .map(|n| doc.page(n).expect("page").drawn_image_widths()[0])
            .collect();
        assert_eq!(widths, vec![10, 20, 30, 40]);
        assert_eq!(doc.author().as_deref(), Some("Ada"));
    }

    #[test]
    fn empty_image_list_is_rejected() {
        let err = builder().build_document(&[], "").expect_err("empty");
        assert!(matches!(err, FolioError::EmptyInput(_)));
    }

    #[test]
    fn portrait_images_share_the_fitted_first_image_rect() {
        let images = vec![solid_image(600, 800, [200, 10, 10]); 3];
        let bytes = builder().build_document(&images, "").expect("build");
        let doc = SourceDocument::from_bytes(&bytes).expect("open");
        assert_eq!(doc.page_count(), 3);
        for n in 1..=3 {
            let media = doc.page(n).expect("page").media_box();
            assert!(approx(media.width(), 505.2), "width {}", media.width());
            assert!(approx(media.height(), 673.6), "height {}", media.height());
        }
    }

    #[test]
    fn file_is_named_after_the_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = [solid_image(30, 40, [0, 0, 0])];
        let first = builder()
            .build_document_file("Receipts", &images, "", dir.path(), true)
            .expect("build");
        let second = builder()
            .build_document_file("Receipts", &images, "", dir.path(), true)
            .expect("build");
        assert_eq!(first, dir.path().join("Receipts.pdf"));
        assert_eq!(second, dir.path().join("Receipts (Copy).pdf"));
    }

    #[tokio::test]
    async fn degraded_assets_are_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let asset = |id: &str, degraded: bool| AssetImage {
            id: id.into(),
            original_filename: Some(format!("{id}.jpg")),
            bytes: solid_jpeg(40, 30, [0, 128, 0]),
            degraded,
        };
        let source = PreviewingSource {
            assets: vec![asset("IMG_1", true), asset("IMG_2", false), asset("IMG_3", false)],
        };
        let ids: Vec<String> = vec!["IMG_1".into(), "IMG_2".into(), "IMG_3".into()];

        let path = builder()
            .build_from_assets(&source, &ids, "Album", "", dir.path(), false)
            .await
            .expect("build");
        assert_eq!(path, dir.path().join("IMG_2.pdf"));
        let doc = SourceDocument::from_bytes(&std::fs::read(&path).expect("read")).expect("open");
        assert_eq!(doc.page_count(), 2);
    }

    #[tokio::test]
    async fn directory_assets_build_a_document() {
        let assets = tempfile::tempdir().expect("tempdir");
        let out = tempfile::tempdir().expect("tempdir");
        std::fs::write(assets.path().join("beach.jpg"), solid_jpeg(50, 40, [0, 0, 255]))
            .expect("write");
        std::fs::write(assets.path().join("notes.txt"), b"not an image").expect("write");

        let source = DirectoryAssetSource::new(assets.path());
        let ids = vec!["beach.jpg".to_string(), "notes.txt".to_string()];
        let path = builder()
            .build_from_assets(&source, &ids, "Album", "", out.path(), false)
            .await
            .expect("build");
        assert_eq!(path, out.path().join("beach.pdf"));
        let doc = SourceDocument::from_bytes(&std::fs::read(&path).expect("read")).expect("open");
        assert_eq!(doc.page_count(), 1);
    }

    #[tokio::test]
    async fn no_usable_assets_is_empty_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = PreviewingSource { assets: Vec::new() };
        let err = builder()
            .build_from_assets(&source, &[], "Album", "", dir.path(), false)
            .await
            .expect_err("empty");
        assert!(matches!(err, FolioError::EmptyInput(_)));
    }
}
