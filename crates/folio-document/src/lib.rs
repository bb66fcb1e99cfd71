// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document: the document pipelines of Folio.
//
// Builds PDFs from images, splits PDFs into per-page files, and recompresses
// PDFs by rasterising every page at a compression tier. Work fans out over
// tokio's blocking pool and is joined through a `TaskBarrier`.

pub mod barrier;
pub mod builder;
pub mod collision;
pub mod compress;
pub mod image;
pub mod pdf;
pub mod render;
pub mod service;
pub mod split;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the primary structs so callers can use `folio_document::DocumentService` etc.
pub use barrier::TaskBarrier;
pub use builder::DocumentBuilder;
pub use collision::CollisionDetector;
pub use compress::DocumentCompressor;
pub use image::RasterImage;
pub use pdf::{ImageAssembler, PageGeometryResolver, Placement, SourceDocument, SourcePage};
pub use render::PageRasterizer;
pub use service::DocumentService;
pub use split::DocumentSplitter;
