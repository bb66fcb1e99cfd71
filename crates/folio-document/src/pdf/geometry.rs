// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry for documents assembled from images.

use folio_core::{FolioConfig, PageRect};

use crate::image::RasterImage;

/// Computes the page rectangle for a document built from images.
///
/// Without a reference image the page is the scaled canvas. With one, the
/// image is resized so that its long side matches the matching canvas side
/// and the page takes the resized image's bounds.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometryResolver {
    canvas: PageRect,
}

impl PageGeometryResolver {
    pub fn new(base: PageRect, scale: f32) -> Self {
        Self {
            canvas: base.scaled(scale),
        }
    }

    pub fn from_config(config: &FolioConfig) -> Self {
        Self::new(config.base_canvas, config.default_scale)
    }

    /// The page used when no reference image is available.
    pub fn canvas(&self) -> PageRect {
        self.canvas
    }

    pub fn resolve(&self, reference: Option<&RasterImage>) -> PageRect {
        match reference {
            Some(image) => self.resolve_size(image.width() as f32, image.height() as f32),
            None => self.canvas,
        }
    }

    /// Same as [`resolve`](Self::resolve) for a bare pixel size.
    pub fn resolve_size(&self, width: f32, height: f32) -> PageRect {
        let (fitted_w, fitted_h) = fit_long_side(width, height, self.canvas);
        PageRect::new(fitted_w, fitted_h).unwrap_or(self.canvas)
    }
}

/// Scale `(width, height)` so its long side equals the matching side of `target`.
///
/// Landscape sizes are fitted to the target width, everything else (portrait
/// and square) to the target height.
pub fn fit_long_side(width: f32, height: f32, target: PageRect) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (target.width(), target.height());
    }
    if width > height {
        let factor = target.width() / width;
        (target.width(), height * factor)
    } else {
        let factor = target.height() / height;
        (width * factor, target.height())
    }
}
