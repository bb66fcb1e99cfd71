// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-document page pipeline: rasterising a
// synthetic A4 page at each compression tier, and assembling rasters back
// into a PDF.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use folio_core::{CompressionTier, PageRect};
use folio_document::{ImageAssembler, PageRasterizer, Placement, RasterImage, SourceDocument};

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

fn int(value: i64) -> Object {
    Object::Integer(value)
}

fn real(value: f32) -> Object {
    Object::Real(value as _)
}

/// One A4 page: a grid of filled squares, a stroked border, and a 64x64 RGB
/// image stretched over the top half.
fn synthetic_page_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut ops = Vec::new();
    for row in 0..20i64 {
        for col in 0..14i64 {
            let shade = ((row * 14 + col) % 10) as f32 / 10.0;
            ops.push(Operation::new("rg", vec![real(shade), real(0.2), real(1.0 - shade)]));
            ops.push(Operation::new(
                "re",
                vec![int(20 + col * 40), int(20 + row * 40), int(30), int(30)],
            ));
            ops.push(Operation::new("f", vec![]));
        }
    }
    ops.push(Operation::new("w", vec![int(4)]));
    ops.push(Operation::new("re", vec![int(10), int(10), int(575), int(822)]));
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![int(595), int(0), int(0), int(421), int(0), int(421)],
    ));
    ops.push(Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]));
    ops.push(Operation::new("Q", vec![]));

    let samples: Vec<u8> = (0..64 * 64)
        .flat_map(|i| [(i % 64 * 4) as u8, (i / 64 * 4) as u8, 128])
        .collect();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 64,
            "Height" => 64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        samples,
    ));
    let content = Content { operations: ops }.encode().expect("encode content");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![int(0), int(0), int(595), int(842)],
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_rasterize(c: &mut Criterion) {
    let bytes = synthetic_page_pdf();
    let page = SourceDocument::from_bytes(&bytes)
        .expect("open fixture")
        .page(1)
        .expect("page 1");
    let rasterizer = PageRasterizer::default();

    for tier in [CompressionTier::None, CompressionTier::High] {
        c.bench_function(&format!("rasterize A4 page (tier {tier})"), |b| {
            b.iter(|| {
                let raster = rasterizer.rasterize(black_box(&page), tier).expect("rasterize");
                black_box(raster);
            });
        });
    }
}

fn bench_assemble(c: &mut Criterion) {
    let data: Vec<u8> = (0..238 * 337 * 3).map(|i| (i % 251) as u8).collect();
    let image = RasterImage::from_rgb(238, 337, data).expect("raster");
    let images = vec![image; 4];
    let assembler = ImageAssembler::default();
    let page = PageRect::new(238.0, 337.0).expect("rect");

    c.bench_function("assemble 4 pages (238x337)", |b| {
        b.iter(|| {
            let pdf = assembler
                .assemble(black_box(&images), page, "bench", Placement::Natural)
                .expect("assemble");
            black_box(pdf);
        });
    });
}

criterion_group!(benches, bench_rasterize, bench_assemble);
criterion_main!(benches);
