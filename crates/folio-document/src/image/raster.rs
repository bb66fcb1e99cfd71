// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster images: decoded RGB pixel buffers with JPEG encoding.
//
// A `RasterImage` is immutable once produced. Everything the pipeline draws
// into a PDF or writes as a JPEG passes through this type.

use std::fmt;

use folio_core::error::{FolioError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

/// Decoded 8-bit RGB image.
#[derive(Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    // -- Construction ---------------------------------------------------------

    /// Decode encoded image bytes (JPEG, PNG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(data)
            .map_err(|err| FolioError::EncodeFailure(format!("failed to decode image: {}", err)))?;
        debug!(
            width = decoded.width(),
            height = decoded.height(),
            "Image decoded from bytes"
        );
        Self::from_dynamic(decoded)
    }

    /// Wrap an already-decoded image, flattening any alpha onto white.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        let pixels = if image.color().has_alpha() {
            flatten_on_white(&image)
        } else {
            image.into_rgb8()
        };
        Self::from_rgb_image(pixels)
    }

    /// Build from a packed RGB buffer of `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            FolioError::EncodeFailure(format!(
                "RGB buffer does not match {}x{} image",
                width, height
            ))
        })?;
        Self::from_rgb_image(pixels)
    }

    fn from_rgb_image(pixels: RgbImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(FolioError::EncodeFailure("image has no pixels".into()));
        }
        Ok(Self { pixels })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Packed RGB samples, row-major from the top-left.
    pub fn as_rgb(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.pixels.get_pixel_checked(x, y).map(|px| px.0)
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as JPEG. `quality` is in [0, 1] and maps onto the encoder's 1..=100.
    pub fn to_jpeg_bytes(&self, quality: f32) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
        self.pixels
            .write_with_encoder(encoder)
            .map_err(|err| FolioError::EncodeFailure(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode as JPEG at `quality` and decode the result again.
    ///
    /// The lossy round trip is what makes rasterised pages smaller.
    pub fn jpeg_round_trip(&self, quality: f32) -> Result<Self> {
        let encoded = self.to_jpeg_bytes(quality)?;
        let decoded = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)
            .map_err(|err| FolioError::EncodeFailure(format!("JPEG decoding failed: {}", err)))?;
        Self::from_rgb_image(decoded.into_rgb8())
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Map a [0, 1] quality onto the JPEG encoder's 1..=100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    let clamped = if quality.is_finite() { quality.clamp(0.0, 1.0) } else { 1.0 };
    (clamped * 100.0).round().clamp(1.0, 100.0) as u8
}

fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        dst.0 = [blend(r), blend(g), blend(b)];
    }
    out
}
