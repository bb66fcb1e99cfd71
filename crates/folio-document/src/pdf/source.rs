// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source documents: open existing PDFs with `lopdf` and snapshot pages.
//
// A `SourcePage` owns everything needed to render one page (media box,
// decoded content operations, decoded XObjects, ExtGState alpha), so it can
// be moved to a worker thread while the `lopdf::Document` stays behind.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use folio_core::error::{FolioError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

use crate::pdf::xobject::{
    FormXObject, GraphicsAlpha, Resources, SampledImage, XObject, filter_names, obj_to_f32,
    resolve,
};

/// Page boundaries in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl MediaBox {
    /// US Letter, used when no page in the tree declares a box.
    pub const LETTER: MediaBox = MediaBox {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Option<Self> {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        let valid = [x0, y0, x1, y1].iter().all(|v| v.is_finite()) && x1 > x0 && y1 > y0;
        valid.then_some(Self { x0, y0, x1, y1 })
    }

    fn from_array(items: &[Object]) -> Option<Self> {
        if items.len() < 4 {
            return None;
        }
        Self::new(
            obj_to_f32(&items[0])?,
            obj_to_f32(&items[1])?,
            obj_to_f32(&items[2])?,
            obj_to_f32(&items[3])?,
        )
    }

    pub fn left(&self) -> f32 {
        self.x0
    }

    pub fn top(&self) -> f32 {
        self.y1
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// An opened source PDF.
pub struct SourceDocument {
    document: Document,
    page_ids: Vec<ObjectId>,
}

impl SourceDocument {
    // -- Construction ---------------------------------------------------------

    /// Parse PDF bytes. `OpenFailure` when unparseable, `EmptyInput` without pages.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| FolioError::OpenFailure(format!("failed to parse PDF: {}", err)))?;

        // get_pages() is keyed by 1-based page number, already in order.
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(FolioError::EmptyInput("document has no pages".into()));
        }

        debug!(pages = page_ids.len(), "PDF loaded from bytes");
        Ok(Self { document, page_ids })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    /// `/Author` from the document information dictionary.
    pub fn author(&self) -> Option<String> {
        let info = self.document.trailer.get(b"Info").ok()?;
        let info = resolve(&self.document, info)?.as_dict().ok()?;
        match info.get(b"Author").ok()? {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            _ => None,
        }
    }

    // -- Snapshots ------------------------------------------------------------

    /// Snapshot page `number` (1-based).
    ///
    /// Failures are `EncodeFailure`: the document opened fine but this page
    /// cannot be rendered.
    #[instrument(skip(self), fields(page = number))]
    pub fn page(&self, number: u32) -> Result<SourcePage> {
        let page_id = number
            .checked_sub(1)
            .and_then(|index| self.page_ids.get(index as usize))
            .copied()
            .ok_or_else(|| {
                FolioError::EncodeFailure(format!(
                    "page {} out of range (document has {} pages)",
                    number,
                    self.page_ids.len()
                ))
            })?;

        let media_box = self.media_box(page_id);
        let content = self
            .document
            .get_page_content(page_id)
            .map_err(|err| FolioError::EncodeFailure(format!("page {}: {}", number, err)))?;
        let operations = Content::decode(&content)
            .map_err(|err| {
                FolioError::EncodeFailure(format!("page {} content: {}", number, err))
            })?
            .operations;

        let mut snapshotter = Snapshotter::new(&self.document);
        let resources = match self.inherited(page_id, b"Resources") {
            Some(obj) => snapshotter.resources(obj),
            None => Resources::default(),
        };

        debug!(
            operations = operations.len(),
            xobjects = resources.xobject_count(),
            width = media_box.width(),
            height = media_box.height(),
            "Page snapshot taken"
        );

        Ok(SourcePage {
            number,
            media_box,
            operations,
            resources,
        })
    }

    fn media_box(&self, page_id: ObjectId) -> MediaBox {
        self.inherited(page_id, b"MediaBox")
            .and_then(|obj| resolve(&self.document, obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|items| MediaBox::from_array(items))
            .unwrap_or(MediaBox::LETTER)
    }

    /// Look up an inheritable page attribute, walking up through `/Parent`.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = page_id;
        let mut seen = HashSet::new();
        while seen.insert(current) {
            let dict = self.document.get_object(current).ok()?.as_dict().ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict.get(b"Parent").ok()?.as_reference().ok()?;
        }
        None
    }
}

/// Owned, thread-transferable snapshot of one source page.
#[derive(Debug, Clone)]
pub struct SourcePage {
    number: u32,
    media_box: MediaBox,
    operations: Vec<Operation>,
    resources: Resources,
}

impl SourcePage {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn media_box(&self) -> MediaBox {
        self.media_box
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Widths of the image XObjects drawn directly by the page, in order.
    #[cfg(test)]
    pub(crate) fn drawn_image_widths(&self) -> Vec<u32> {
        self.operations
            .iter()
            .filter(|op| op.operator == "Do")
            .filter_map(|op| op.operands.first()?.as_name().ok())
            .filter_map(|name| match self.resources.xobject(name)? {
                XObject::Image(image) => Some(image.width()),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Resource snapshotting
// ---------------------------------------------------------------------------

struct Snapshotter<'a> {
    doc: &'a Document,
    images: HashMap<ObjectId, Arc<SampledImage>>,
    forms: HashMap<ObjectId, Arc<FormXObject>>,
    /// Forms currently being snapshotted; re-entering one means a cycle.
    visiting: HashSet<ObjectId>,
}

impl<'a> Snapshotter<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            images: HashMap::new(),
            forms: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    fn resources(&mut self, obj: &'a Object) -> Resources {
        let doc = self.doc;
        let mut out = Resources::default();
        let Some(dict) = resolve(doc, obj).and_then(|o| o.as_dict().ok()) else {
            return out;
        };

        if let Some(xobjects) = dict
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            for (name, value) in xobjects.iter() {
                let xobject = match value.as_reference() {
                    Ok(id) => self.xobject(id),
                    Err(_) => XObject::Unsupported,
                };
                out.insert_xobject(name.clone(), xobject);
            }
        }

        if let Some(states) = dict
            .get(b"ExtGState")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            for (name, value) in states.iter() {
                if let Some(state) = resolve(doc, value).and_then(|o| o.as_dict().ok()) {
                    out.insert_graphics_state(name.clone(), GraphicsAlpha::from_dict(state));
                }
            }
        }

        out
    }

    fn xobject(&mut self, id: ObjectId) -> XObject {
        let doc = self.doc;
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            warn!(?id, "XObject reference does not resolve to a stream");
            return XObject::Unsupported;
        };
        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .unwrap_or_default();

        match subtype {
            b"Image" => {
                if let Some(cached) = self.images.get(&id) {
                    return XObject::Image(cached.clone());
                }
                match SampledImage::decode(doc, stream) {
                    Some(image) => {
                        let image = Arc::new(image);
                        self.images.insert(id, image.clone());
                        XObject::Image(image)
                    }
                    None => {
                        warn!(
                            ?id,
                            filters = ?filter_names(&stream.dict)
                                .iter()
                                .map(|f| String::from_utf8_lossy(f).into_owned())
                                .collect::<Vec<_>>(),
                            "Unsupported image encoding, skipping"
                        );
                        XObject::Unsupported
                    }
                }
            }
            b"Form" => self.form(id, stream),
            _ => XObject::Unsupported,
        }
    }

    fn form(&mut self, id: ObjectId, stream: &'a Stream) -> XObject {
        let dict = &stream.dict;
        if let Some(cached) = self.forms.get(&id) {
            return XObject::Form(cached.clone());
        }
        if !self.visiting.insert(id) {
            debug!(?id, "Self-referencing form cut off");
            return XObject::Unsupported;
        }

        let operations = stream
            .get_plain_content()
            .ok()
            .and_then(|bytes| Content::decode(&bytes).ok())
            .map(|content| content.operations);
        let result = match operations {
            Some(operations) => {
                let resources = match dict.get(b"Resources") {
                    Ok(obj) => self.resources(obj),
                    Err(_) => Resources::default(),
                };
                let form = Arc::new(FormXObject {
                    matrix: number_array(self.doc, dict.get(b"Matrix").ok())
                        .unwrap_or([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
                    bbox: number_array(self.doc, dict.get(b"BBox").ok()),
                    operations,
                    resources,
                });
                self.forms.insert(id, form.clone());
                XObject::Form(form)
            }
            None => {
                warn!(?id, "Form content could not be decoded, skipping");
                XObject::Unsupported
            }
        };

        self.visiting.remove(&id);
        result
    }
}

fn number_array<const N: usize>(doc: &Document, obj: Option<&Object>) -> Option<[f32; N]> {
    let items = resolve(doc, obj?)?.as_array().ok()?;
    if items.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = obj_to_f32(item)?;
    }
    Some(out)
}

/// PDF text strings are UTF-16BE with a BOM, or single-byte otherwise.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Open `data` and snapshot every page, logging the page count.
///
/// Pages that cannot be snapshotted are returned as errors in their slot.
pub fn snapshot_all(data: &[u8]) -> Result<Vec<Result<SourcePage>>> {
    let source = SourceDocument::from_bytes(data)?;
    info!(pages = source.page_count(), "Snapshotting source document");
    Ok((1..=source.page_count())
        .map(|number| source.page(number))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PageSpec, pdf_with_pages};

    #[test]
    fn garbage_is_an_open_failure() {
        let err = SourceDocument::from_bytes(b"%PDF-1.5 nonsense")
            .err()
            .expect("must fail");
        assert!(matches!(err, FolioError::OpenFailure(_)));
    }

    #[test]
    fn pages_are_numbered_in_order() {
        let bytes = pdf_with_pages(&[
            PageSpec::blank(100, 200),
            PageSpec::blank(300, 400),
            PageSpec::blank(500, 600),
        ]);
        let doc = SourceDocument::from_bytes(&bytes).expect("open");
        assert_eq!(doc.page_count(), 3);
        let widths: Vec<f32> = (1..=3)
            .map(|n| doc.page(n).expect("page").media_box().width())
            .collect();
        assert_eq!(widths, vec![100.0, 300.0, 500.0]);
    }

    #[test]
    fn out_of_range_page_is_an_encode_failure() {
        let bytes = pdf_with_pages(&[PageSpec::blank(10, 10)]);
        let doc = SourceDocument::from_bytes(&bytes).expect("open");
        assert!(matches!(doc.page(0), Err(FolioError::EncodeFailure(_))));
        assert!(matches!(doc.page(2), Err(FolioError::EncodeFailure(_))));
    }

    #[test]
    fn media_box_is_inherited_from_parent() {
        let bytes = crate::test_support::pdf_with_inherited_media_box(250, 350);
        let doc = SourceDocument::from_bytes(&bytes).expect("open");
        let media = doc.page(1).expect("page").media_box();
        assert_eq!((media.width(), media.height()), (250.0, 350.0));
    }

    #[test]
    fn image_xobjects_are_decoded_into_the_snapshot() {
        let bytes = pdf_with_pages(&[PageSpec::blank(50, 50).with_image(3, 2, [0, 0, 255])]);
        let doc = SourceDocument::from_bytes(&bytes).expect("open");
        let page = doc.page(1).expect("page");
        assert_eq!(page.drawn_image_widths(), vec![3]);
    }

    #[test]
    fn self_referencing_form_does_not_recurse_forever() {
        let bytes = crate::test_support::pdf_with_recursive_form();
        let doc = SourceDocument::from_bytes(&bytes).expect("open");
        let page = doc.page(1).expect("snapshot finishes");
        match page.resources().xobject(b"Fm0") {
            Some(XObject::Form(form)) => {
                assert!(matches!(form.resources.xobject(b"Fm0"), Some(XObject::Unsupported)));
            }
            other => panic!("expected a form, got {other:?}"),
        }
    }

    #[test]
    fn utf16_text_strings_decode() {
        let bytes = [0xFE, 0xFF, 0x00, 0x41, 0x00, 0x64, 0x00, 0x61];
        assert_eq!(decode_text_string(&bytes), "Ada");
        assert_eq!(decode_text_string(b"Plain"), "Plain");
    }

    #[test]
    fn snapshot_all_returns_one_slot_per_page() {
        let bytes = pdf_with_pages(&[PageSpec::blank(10, 10), PageSpec::blank(20, 20)]);
        let pages = snapshot_all(&bytes).expect("open");
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(Result::is_ok));
    }
}
