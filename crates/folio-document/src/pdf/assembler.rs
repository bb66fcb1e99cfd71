// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image assembler: one PDF page per raster image, using `printpdf` 0.8.
//
// printpdf 0.8 builds documents from `PdfPage` values holding `Vec<Op>`
// operation lists. Each image is registered once as an XObject and placed
// with a single `Op::UseXobject`.

use folio_core::PageRect;
use folio_core::error::{FolioError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::image::RasterImage;
use crate::pdf::geometry::fit_long_side;

/// At 72 DPI one image pixel covers exactly one PDF point.
const NATURAL_DPI: f32 = 72.0;

/// How an image is sized on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// One pixel per point.
    Natural,
    /// Long side scaled to the page's matching side, aspect ratio kept.
    FitLongSide,
}

/// Builds PDF byte streams from ordered raster images.
pub struct ImageAssembler {
    title: String,
}

impl Default for ImageAssembler {
    fn default() -> Self {
        Self::new("Folio Document")
    }
}

impl ImageAssembler {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Assemble `images` into a PDF, one page of size `page` per image, in order.
    ///
    /// Every image is anchored at the top-left corner of its page. Fails with
    /// `EmptyInput` before doing any work when `images` is empty.
    #[instrument(skip(self, images), fields(pages = images.len(), ?placement))]
    pub fn assemble(
        &self,
        images: &[RasterImage],
        page: PageRect,
        author: &str,
        placement: Placement,
    ) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(FolioError::EmptyInput(
                "cannot assemble a document from zero images".into(),
            ));
        }

        info!(
            width_pt = page.width(),
            height_pt = page.height(),
            "Assembling image PDF"
        );

        let mut doc = PdfDocument::new(&self.title);
        doc.metadata.info.author = author.to_string();

        let page_w = pt_to_mm(page.width());
        let page_h = pt_to_mm(page.height());
        let mut pages = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let raw = RawImage {
                pixels: RawImageData::U8(image.as_rgb().to_vec()),
                width: image.width() as usize,
                height: image.height() as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let scale = placement_scale(image, page, placement);
            let drawn_h = image.height() as f32 * scale;
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(page.height() - drawn_h)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(NATURAL_DPI),
                    rotate: None,
                },
            }];
            debug!(page = index + 1, scale, "Image placed on page");
            pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
        }
        if output.is_empty() {
            return Err(FolioError::EncodeFailure(
                "PDF serialisation produced no bytes".into(),
            ));
        }

        debug!(output_bytes = output.len(), "Assembly complete");
        Ok(output)
    }

    /// Convenience for a one-page PDF whose page is exactly the image size.
    pub fn single_page(&self, image: &RasterImage, author: &str) -> Result<Vec<u8>> {
        let page = natural_rect(image)?;
        self.assemble(std::slice::from_ref(image), page, author, Placement::Natural)
    }
}

/// The page rectangle matching `image` at one pixel per point.
pub fn natural_rect(image: &RasterImage) -> Result<PageRect> {
    PageRect::new(image.width() as f32, image.height() as f32).ok_or_else(|| {
        FolioError::EncodeFailure(format!(
            "image {}x{} has no area",
            image.width(),
            image.height()
        ))
    })
}

fn placement_scale(image: &RasterImage, page: PageRect, placement: Placement) -> f32 {
    match placement {
        Placement::Natural => 1.0,
        Placement::FitLongSide => {
            let width = image.width() as f32;
            let (fitted_w, _) = fit_long_side(width, image.height() as f32, page);
            fitted_w / width
        }
    }
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}
