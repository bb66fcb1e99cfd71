// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Owned snapshots of XObjects and graphics-state resources.
//
// Image XObjects are decoded to straight-alpha RGBA at snapshot time, so the
// renderer never needs the lopdf document. Supported encodings: DCTDecode
// (JPEG), and 8-bit samples behind any filter lopdf can undo, in DeviceGray,
// DeviceRGB, DeviceCMYK, ICCBased (by component count) or Indexed colour.

use std::collections::HashMap;
use std::sync::Arc;

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, Stream};

/// Resources visible to a content stream, keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    xobjects: HashMap<Vec<u8>, XObject>,
    graphics_states: HashMap<Vec<u8>, GraphicsAlpha>,
}

impl Resources {
    pub fn xobject(&self, name: &[u8]) -> Option<&XObject> {
        self.xobjects.get(name)
    }

    pub fn graphics_state(&self, name: &[u8]) -> Option<GraphicsAlpha> {
        self.graphics_states.get(name).copied()
    }

    pub fn xobject_count(&self) -> usize {
        self.xobjects.len()
    }

    pub(crate) fn insert_xobject(&mut self, name: Vec<u8>, xobject: XObject) {
        self.xobjects.insert(name, xobject);
    }

    pub(crate) fn insert_graphics_state(&mut self, name: Vec<u8>, alpha: GraphicsAlpha) {
        self.graphics_states.insert(name, alpha);
    }

    /// `own` on top of `self`: entries in `own` win.
    pub fn overlaid(&self, own: &Resources) -> Resources {
        let mut merged = self.clone();
        for (name, xobject) in &own.xobjects {
            merged.xobjects.insert(name.clone(), xobject.clone());
        }
        for (name, alpha) in &own.graphics_states {
            merged.graphics_states.insert(name.clone(), *alpha);
        }
        merged
    }
}

/// Constant alpha from an ExtGState dictionary (`/ca`, `/CA`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GraphicsAlpha {
    pub fill: Option<f32>,
    pub stroke: Option<f32>,
}

impl GraphicsAlpha {
    pub(crate) fn from_dict(dict: &Dictionary) -> Self {
        let read = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(obj_to_f32)
                .map(|v| v.clamp(0.0, 1.0))
        };
        Self {
            fill: read(b"ca"),
            stroke: read(b"CA"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum XObject {
    Image(Arc<SampledImage>),
    Form(Arc<FormXObject>),
    /// Present in the resources but not drawable (unsupported encoding,
    /// self-referencing form, broken stream). Drawing it is a no-op.
    Unsupported,
}

/// A form XObject: a reusable content stream with its own resources.
#[derive(Debug, Clone)]
pub struct FormXObject {
    pub matrix: [f32; 6],
    pub bbox: Option<[f32; 4]>,
    pub operations: Vec<Operation>,
    /// The form's own resources; the painter overlays them on the caller's.
    pub resources: Resources,
}

/// Decoded image samples, straight (non-premultiplied) RGBA, top row first.
#[derive(Clone, PartialEq)]
pub struct SampledImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl std::fmt::Debug for SampledImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampledImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl SampledImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Decode an image XObject stream. `None` for encodings we cannot draw.
    pub(crate) fn decode(doc: &Document, stream: &Stream) -> Option<Self> {
        let dict = &stream.dict;
        if dict
            .get(b"ImageMask")
            .ok()
            .and_then(|o| o.as_bool().ok())
            .unwrap_or(false)
        {
            return None;
        }

        let filters = filter_names(dict);
        let mut image = if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
            if filters.len() != 1 {
                return None;
            }
            decode_jpeg(&stream.content)?
        } else if filters
            .iter()
            .any(|f| f.as_slice() == b"JPXDecode" || f.as_slice() == b"JBIG2Decode")
        {
            return None;
        } else {
            let plain = if filters.is_empty() {
                stream.content.clone()
            } else {
                stream.get_plain_content().ok()?
            };
            decode_samples(doc, dict, &plain)?
        };

        if let Some(alpha) = soft_mask(doc, dict, image.width, image.height) {
            for (px, a) in image.rgba.chunks_exact_mut(4).zip(alpha) {
                px[3] = a;
            }
        }
        Some(image)
    }
}

fn decode_jpeg(data: &[u8]) -> Option<SampledImage> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg).ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Some(SampledImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

fn decode_samples(doc: &Document, dict: &Dictionary, plain: &[u8]) -> Option<SampledImage> {
    let width = dict_u32(dict, b"Width")?;
    let height = dict_u32(dict, b"Height")?;
    let bpc = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(obj_to_f32)
        .unwrap_or(8.0);
    if (bpc - 8.0).abs() > 0.01 {
        return None;
    }

    let color_space = match dict.get(b"ColorSpace") {
        Ok(obj) => ColorSpace::parse(doc, obj)?,
        Err(_) => ColorSpace::Direct(DeviceColor::Gray),
    };

    let pixels = (width as usize).checked_mul(height as usize)?;
    let stride = color_space.bytes_per_pixel();
    if plain.len() < pixels.checked_mul(stride)? {
        return None;
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for chunk in plain.chunks_exact(stride).take(pixels) {
        let [r, g, b] = color_space.rgb(chunk)?;
        rgba.extend_from_slice(&[r, g, b, 255]);
    }
    Some(SampledImage {
        width,
        height,
        rgba,
    })
}

/// 8-bit `/SMask` samples matching the image size, used as alpha.
fn soft_mask(doc: &Document, dict: &Dictionary, width: u32, height: u32) -> Option<Vec<u8>> {
    let mask_id = dict.get(b"SMask").ok()?.as_reference().ok()?;
    let mask = doc.get_object(mask_id).ok()?.as_stream().ok()?;
    if dict_u32(&mask.dict, b"Width")? != width || dict_u32(&mask.dict, b"Height")? != height {
        return None;
    }
    let plain = if filter_names(&mask.dict).is_empty() {
        mask.content.clone()
    } else {
        mask.get_plain_content().ok()?
    };
    let pixels = (width as usize) * (height as usize);
    (plain.len() >= pixels).then(|| plain[..pixels].to_vec())
}

// -- Colour spaces ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeviceColor {
    Gray,
    Rgb,
    Cmyk,
}

impl DeviceColor {
    pub(crate) fn components(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Some(Self::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(Self::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(Self::Cmyk),
            _ => None,
        }
    }

    fn from_component_count(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::Gray),
            3 => Some(Self::Rgb),
            4 => Some(Self::Cmyk),
            _ => None,
        }
    }

    fn rgb(self, bytes: &[u8]) -> Option<[u8; 3]> {
        match self {
            Self::Gray => {
                let v = *bytes.first()?;
                Some([v, v, v])
            }
            Self::Rgb => Some([*bytes.first()?, *bytes.get(1)?, *bytes.get(2)?]),
            Self::Cmyk => {
                let unit = |i: usize| bytes.get(i).map(|&v| v as f32 / 255.0);
                let [r, g, b] = cmyk_to_rgb(unit(0)?, unit(1)?, unit(2)?, unit(3)?);
                Some([to_byte(r), to_byte(g), to_byte(b)])
            }
        }
    }
}

enum ColorSpace {
    Direct(DeviceColor),
    Indexed { base: DeviceColor, lookup: Vec<u8> },
}

impl ColorSpace {
    fn parse(doc: &Document, obj: &Object) -> Option<Self> {
        match resolve(doc, obj)? {
            Object::Name(name) => DeviceColor::from_name(name).map(Self::Direct),
            Object::Array(items) => Self::parse_array(doc, items),
            _ => None,
        }
    }

    fn parse_array(doc: &Document, items: &[Object]) -> Option<Self> {
        let head = resolve(doc, items.first()?)?.as_name().ok()?;
        if let Some(direct) = DeviceColor::from_name(head) {
            return Some(Self::Direct(direct));
        }
        match head {
            b"ICCBased" => {
                let profile = resolve(doc, items.get(1)?)?.as_stream().ok()?;
                let n = profile.dict.get(b"N").ok()?.as_i64().ok()?;
                DeviceColor::from_component_count(n).map(Self::Direct)
            }
            b"Indexed" | b"I" => {
                let base = match Self::parse(doc, items.get(1)?)? {
                    Self::Direct(base) => base,
                    Self::Indexed { .. } => return None,
                };
                let lookup = match resolve(doc, items.get(3)?)? {
                    Object::String(bytes, _) => bytes.clone(),
                    Object::Stream(stream) => stream.get_plain_content().ok()?,
                    _ => return None,
                };
                Some(Self::Indexed { base, lookup })
            }
            _ => None,
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Direct(color) => color.components(),
            Self::Indexed { .. } => 1,
        }
    }

    fn rgb(&self, bytes: &[u8]) -> Option<[u8; 3]> {
        match self {
            Self::Direct(color) => color.rgb(bytes),
            Self::Indexed { base, lookup } => {
                let channels = base.components();
                let offset = (*bytes.first()? as usize) * channels;
                base.rgb(lookup.get(offset..offset + channels)?)
            }
        }
    }
}

// -- Shared lopdf helpers -----------------------------------------------------

pub(crate) fn cmyk_to_rgb(c: f32, m: f32, y: f32, k: f32) -> [f32; 3] {
    let k = k.clamp(0.0, 1.0);
    [
        (1.0 - c.clamp(0.0, 1.0)) * (1.0 - k),
        (1.0 - m.clamp(0.0, 1.0)) * (1.0 - k),
        (1.0 - y.clamp(0.0, 1.0)) * (1.0 - k),
    ]
}

fn to_byte(unit: f32) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub(crate) fn obj_to_f32(obj: &Object) -> Option<f32> {
    if let Ok(v) = obj.as_float() {
        return Some(v);
    }
    obj.as_i64().ok().map(|v| v as f32)
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v > 0)
}

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    // Bounded so a reference cycle cannot spin forever.
    for _ in 0..32 {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub(crate) fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}
