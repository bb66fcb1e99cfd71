// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rendering: content-stream painter and the tiered rasteriser.

pub(crate) mod painter;
pub mod rasterizer;

pub use rasterizer::{MAX_RASTER_PIXELS, PageRasterizer};
