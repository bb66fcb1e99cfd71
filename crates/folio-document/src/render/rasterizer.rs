// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasteriser: source page + compression tier -> JPEG-degraded raster.

use folio_core::error::{FolioError, Result};
use folio_core::{CompressionTier, FolioConfig, TierSettings, TierTable};
use tiny_skia::{Color, Pixmap, Transform};
use tracing::{debug, instrument};

use crate::image::RasterImage;
use crate::pdf::source::SourcePage;
use crate::render::painter::Painter;

/// Pages whose raster would exceed this many pixels are refused.
pub const MAX_RASTER_PIXELS: u64 = 1 << 27;

/// Renders source pages to raster images at a tier's scale and JPEG quality.
#[derive(Debug, Clone)]
pub struct PageRasterizer {
    tiers: TierTable,
}

impl Default for PageRasterizer {
    fn default() -> Self {
        Self::new(TierTable::default())
    }
}

impl PageRasterizer {
    pub fn new(tiers: TierTable) -> Self {
        Self { tiers }
    }

    pub fn from_config(config: &FolioConfig) -> Self {
        Self::new(config.tiers)
    }

    /// Pixel size of `page` rendered at `scale`: the media box scaled and
    /// rounded, at least one pixel per side.
    pub fn output_size(page: &SourcePage, scale: f32) -> (u32, u32) {
        let media = page.media_box();
        let side = |pt: f32| (pt * scale).round().max(1.0) as u32;
        (side(media.width()), side(media.height()))
    }

    /// Render `page` at `tier` and push it through a JPEG round trip at the
    /// tier's quality.
    #[instrument(skip(self, page), fields(page = page.number(), %tier))]
    pub fn rasterize(&self, page: &SourcePage, tier: CompressionTier) -> Result<RasterImage> {
        self.rasterize_with(page, self.tiers.get(tier))
    }

    pub fn rasterize_with(&self, page: &SourcePage, settings: TierSettings) -> Result<RasterImage> {
        let rendered = self.render(page, settings.scale())?;
        let degraded = rendered.jpeg_round_trip(settings.quality())?;
        debug!(
            width = degraded.width(),
            height = degraded.height(),
            quality = settings.quality(),
            "Page rasterised"
        );
        Ok(degraded)
    }

    /// Render without the JPEG step.
    pub fn render(&self, page: &SourcePage, scale: f32) -> Result<RasterImage> {
        let (width, height) = Self::output_size(page, scale);
        if u64::from(width) * u64::from(height) > MAX_RASTER_PIXELS {
            return Err(FolioError::EncodeFailure(format!(
                "page {} would rasterise to {}x{} pixels",
                page.number(),
                width,
                height
            )));
        }
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            FolioError::EncodeFailure(format!(
                "cannot allocate {}x{} pixmap for page {}",
                width,
                height,
                page.number()
            ))
        })?;
        pixmap.fill(Color::WHITE);

        // Flip y and move the media box origin to the top-left pixel.
        let media = page.media_box();
        let sx = width as f32 / media.width();
        let sy = height as f32 / media.height();
        let base = Transform::from_row(sx, 0.0, 0.0, -sy, -sx * media.left(), sy * media.top());

        Painter::new(&mut pixmap, base).run(page.operations(), page.resources());
        pixmap_to_raster(pixmap)
    }
}

fn pixmap_to_raster(pixmap: Pixmap) -> Result<RasterImage> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for px in pixmap.pixels() {
        let color = px.demultiply();
        rgb.extend_from_slice(&[color.red(), color.green(), color.blue()]);
    }
    drop(pixmap);
    RasterImage::from_rgb(width, height, rgb)
}
