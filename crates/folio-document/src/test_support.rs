// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test fixtures: small PDFs built with lopdf and solid-colour images.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::image::RasterImage;

pub(crate) fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> RasterImage {
    let data = rgb
        .iter()
        .copied()
        .cycle()
        .take(width as usize * height as usize * 3)
        .collect();
    RasterImage::from_rgb(width, height, data).expect("solid image")
}

pub(crate) fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    solid_image(width, height, rgb)
        .to_jpeg_bytes(0.9)
        .expect("jpeg")
}

/// One fixture page: a media box plus optional filled rects and an image.
#[derive(Debug, Clone)]
pub(crate) struct PageSpec {
    width: i64,
    height: i64,
    rects: Vec<([i64; 4], [u8; 3])>,
    image: Option<(i64, i64, [u8; 3])>,
}

impl PageSpec {
    pub(crate) fn blank(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            rects: Vec::new(),
            image: None,
        }
    }

    pub(crate) fn with_rect(mut self, x: i64, y: i64, w: i64, h: i64, rgb: [u8; 3]) -> Self {
        self.rects.push(([x, y, w, h], rgb));
        self
    }

    /// An RGB image XObject stretched over the whole page.
    pub(crate) fn with_image(mut self, width: i64, height: i64, rgb: [u8; 3]) -> Self {
        self.image = Some((width, height, rgb));
        self
    }
}

fn unit(channel: u8) -> Object {
    Object::Real((channel as f64 / 255.0) as _)
}

fn ints(values: &[i64]) -> Vec<Object> {
    values.iter().map(|&v| Object::Integer(v)).collect()
}

fn encode(operations: Vec<Operation>) -> Vec<u8> {
    Content { operations }.encode().expect("encode content")
}

/// Wire `kids` under a fresh page tree and catalog, then serialise.
fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<ObjectId>, extra: lopdf::Dictionary) -> Vec<u8> {
    let mut pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
        "Count" => kids.len() as i64,
    };
    for (key, value) in extra.iter() {
        pages.set(key.clone(), value.clone());
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

pub(crate) fn pdf_with_pages(specs: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(specs.len());

    for spec in specs {
        let mut ops = Vec::new();
        let mut resources = lopdf::Dictionary::new();

        for ([x, y, w, h], [r, g, b]) in &spec.rects {
            ops.push(Operation::new("rg", vec![unit(*r), unit(*g), unit(*b)]));
            ops.push(Operation::new("re", ints(&[*x, *y, *w, *h])));
            ops.push(Operation::new("f", vec![]));
        }

        if let Some((iw, ih, rgb)) = spec.image {
            let samples: Vec<u8> = rgb
                .iter()
                .copied()
                .cycle()
                .take((iw * ih * 3) as usize)
                .collect();
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => iw,
                    "Height" => ih,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                samples,
            ));
            resources.set("XObject", dictionary! { "Im0" => image_id });
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new("cm", ints(&[spec.width, 0, 0, spec.height, 0, 0])));
            ops.push(Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]));
            ops.push(Operation::new("Q", vec![]));
        }

        let content_id = doc.add_object(Stream::new(dictionary! {}, encode(ops)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => ints(&[0, 0, spec.width, spec.height]),
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id);
    }

    finish(doc, pages_id, kids, lopdf::Dictionary::new())
}

/// Single page without its own `/MediaBox`; the page tree node carries it.
pub(crate) fn pdf_with_inherited_media_box(width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    finish(
        doc,
        pages_id,
        vec![page_id],
        dictionary! { "MediaBox" => ints(&[0, 0, width, height]) },
    )
}

/// A page drawing a form XObject that lists itself in its own resources.
pub(crate) fn pdf_with_recursive_form() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let form_id = doc.new_object_id();
    let draw_self = encode(vec![Operation::new("Do", vec![Object::Name(b"Fm0".to_vec())])]);
    let form = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => ints(&[0, 0, 10, 10]),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Fm0" => form_id },
            },
        },
        draw_self.clone(),
    );
    doc.objects.insert(form_id, Object::Stream(form));

    let content_id = doc.add_object(Stream::new(dictionary! {}, draw_self));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => ints(&[0, 0, 10, 10]),
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Fm0" => form_id },
        },
    });
    finish(doc, pages_id, vec![page_id], lopdf::Dictionary::new())
}

/// Write a fixture PDF with `pages` blank pages of distinct widths.
pub(crate) fn write_numbered_pdf(dir: &Path, name: &str, pages: usize) -> PathBuf {
    let specs: Vec<PageSpec> = (0..pages)
        .map(|i| PageSpec::blank(20 + i as i64, 30).with_rect(0, 0, 5, 5, [0, 0, 0]))
        .collect();
    let path = dir.join(name);
    std::fs::write(&path, pdf_with_pages(&specs)).expect("write fixture");
    path
}
