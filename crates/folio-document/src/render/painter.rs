// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream painter: replays PDF graphics operators onto a tiny-skia pixmap.
//
// Covers path construction and painting, clipping, the graphics-state stack,
// device colours, constant alpha from ExtGState, image XObjects and form
// XObjects. Text operators are consumed without drawing.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::Object;
use lopdf::content::Operation;
use tiny_skia::{
    Color, FillRule, FilterQuality, LineCap, LineJoin, Mask, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, Stroke, StrokeDash, Transform,
};
use tracing::trace;

use crate::pdf::xobject::{
    FormXObject, Resources, SampledImage, XObject, cmyk_to_rgb, obj_to_f32,
};

/// Forms nested deeper than this are not drawn.
const MAX_FORM_DEPTH: usize = 32;

#[derive(Clone)]
struct GraphicsState {
    ctm: Transform,
    fill: [f32; 3],
    stroke: [f32; 3],
    fill_alpha: f32,
    stroke_alpha: f32,
    line_width: f32,
    line_cap: LineCap,
    line_join: LineJoin,
    miter_limit: f32,
    dash: Option<(Vec<f32>, f32)>,
    clip: Option<Rc<Mask>>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Transform::identity(),
            fill: [0.0; 3],
            stroke: [0.0; 3],
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
            dash: None,
            clip: None,
        }
    }
}

/// Paints one page (and the forms it references) onto a pixmap.
pub(crate) struct Painter<'p> {
    pixmap: &'p mut Pixmap,
    /// PDF user space to device pixels.
    base: Transform,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    path: PathBuilder,
    current_point: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    pending_clip: Option<FillRule>,
    depth: usize,
    image_cache: HashMap<*const SampledImage, Rc<Pixmap>>,
}

impl<'p> Painter<'p> {
    pub(crate) fn new(pixmap: &'p mut Pixmap, base: Transform) -> Self {
        Self {
            pixmap,
            base,
            state: GraphicsState::default(),
            stack: Vec::new(),
            path: PathBuilder::new(),
            current_point: None,
            subpath_start: None,
            pending_clip: None,
            depth: 0,
            image_cache: HashMap::new(),
        }
    }

    pub(crate) fn run(&mut self, operations: &[Operation], resources: &Resources) {
        for op in operations {
            self.apply(op, resources);
        }
    }

    fn apply(&mut self, op: &Operation, resources: &Resources) {
        let operands = &op.operands;
        match op.operator.as_str() {
            // -- Graphics state ---------------------------------------------
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(previous) = self.stack.pop() {
                    self.state = previous;
                }
            }
            "cm" => {
                if let Some([a, b, c, d, e, f]) = numbers::<6>(operands) {
                    self.state.ctm = self.state.ctm.pre_concat(Transform::from_row(a, b, c, d, e, f));
                }
            }
            "w" => {
                if let Some([width]) = numbers::<1>(operands) {
                    self.state.line_width = width.max(0.0);
                }
            }
            "J" => {
                if let Some([cap]) = numbers::<1>(operands) {
                    self.state.line_cap = match cap as i64 {
                        1 => LineCap::Round,
                        2 => LineCap::Square,
                        _ => LineCap::Butt,
                    };
                }
            }
            "j" => {
                if let Some([join]) = numbers::<1>(operands) {
                    self.state.line_join = match join as i64 {
                        1 => LineJoin::Round,
                        2 => LineJoin::Bevel,
                        _ => LineJoin::Miter,
                    };
                }
            }
            "M" => {
                if let Some([limit]) = numbers::<1>(operands) {
                    self.state.miter_limit = limit.max(1.0);
                }
            }
            "d" => self.state.dash = dash_pattern(operands),
            "gs" => {
                let alpha = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| resources.graphics_state(name));
                if let Some(alpha) = alpha {
                    if let Some(fill) = alpha.fill {
                        self.state.fill_alpha = fill;
                    }
                    if let Some(stroke) = alpha.stroke {
                        self.state.stroke_alpha = stroke;
                    }
                }
            }

            // -- Path construction ------------------------------------------
            "m" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    self.path.move_to(x, y);
                    self.current_point = Some((x, y));
                    self.subpath_start = Some((x, y));
                }
            }
            "l" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    self.ensure_subpath();
                    self.path.line_to(x, y);
                    self.current_point = Some((x, y));
                }
            }
            "c" => {
                if let Some([x1, y1, x2, y2, x3, y3]) = numbers::<6>(operands) {
                    self.ensure_subpath();
                    self.path.cubic_to(x1, y1, x2, y2, x3, y3);
                    self.current_point = Some((x3, y3));
                }
            }
            "v" => {
                if let (Some([x2, y2, x3, y3]), Some((x0, y0))) =
                    (numbers::<4>(operands), self.current_point)
                {
                    self.path.cubic_to(x0, y0, x2, y2, x3, y3);
                    self.current_point = Some((x3, y3));
                }
            }
            "y" => {
                if let Some([x1, y1, x3, y3]) = numbers::<4>(operands) {
                    self.ensure_subpath();
                    self.path.cubic_to(x1, y1, x3, y3, x3, y3);
                    self.current_point = Some((x3, y3));
                }
            }
            "h" => self.close_subpath(),
            "re" => {
                if let Some([x, y, w, h]) = numbers::<4>(operands) {
                    self.path.move_to(x, y);
                    self.path.line_to(x + w, y);
                    self.path.line_to(x + w, y + h);
                    self.path.line_to(x, y + h);
                    self.path.close();
                    self.current_point = Some((x, y));
                    self.subpath_start = Some((x, y));
                }
            }

            // -- Clipping and painting --------------------------------------
            "W" => self.pending_clip = Some(FillRule::Winding),
            "W*" => self.pending_clip = Some(FillRule::EvenOdd),
            "f" | "F" => self.paint_path(Some(FillRule::Winding), false),
            "f*" => self.paint_path(Some(FillRule::EvenOdd), false),
            "S" => self.paint_path(None, true),
            "s" => {
                self.close_subpath();
                self.paint_path(None, true);
            }
            "B" => self.paint_path(Some(FillRule::Winding), true),
            "B*" => self.paint_path(Some(FillRule::EvenOdd), true),
            "b" => {
                self.close_subpath();
                self.paint_path(Some(FillRule::Winding), true);
            }
            "b*" => {
                self.close_subpath();
                self.paint_path(Some(FillRule::EvenOdd), true);
            }
            "n" => self.paint_path(None, false),

            // -- Colour -----------------------------------------------------
            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(rgb) = device_color(operands) {
                    self.state.fill = rgb;
                }
            }
            "G" | "RG" | "K" | "SC" | "SCN" => {
                if let Some(rgb) = device_color(operands) {
                    self.state.stroke = rgb;
                }
            }
            // Selecting a colour space resets the colour to its initial value.
            "cs" => self.state.fill = [0.0; 3],
            "CS" => self.state.stroke = [0.0; 3],

            // -- XObjects ---------------------------------------------------
            "Do" => {
                let xobject = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| resources.xobject(name));
                match xobject {
                    Some(XObject::Image(image)) => self.draw_image(image),
                    Some(XObject::Form(form)) => self.draw_form(form, resources),
                    Some(XObject::Unsupported) | None => {}
                }
            }

            other => trace!(operator = other, "operator not rendered"),
        }
    }

    // -- Paths ----------------------------------------------------------------

    /// Starts a subpath at the origin when a segment arrives without `m`.
    fn ensure_subpath(&mut self) {
        if self.current_point.is_none() {
            self.path.move_to(0.0, 0.0);
            self.current_point = Some((0.0, 0.0));
            self.subpath_start = Some((0.0, 0.0));
        }
    }

    fn close_subpath(&mut self) {
        if self.current_point.is_some() {
            self.path.close();
            self.current_point = self.subpath_start;
        }
    }

    fn take_path(&mut self) -> Option<Path> {
        self.current_point = None;
        self.subpath_start = None;
        std::mem::replace(&mut self.path, PathBuilder::new()).finish()
    }

    fn paint_path(&mut self, fill: Option<FillRule>, stroke: bool) {
        let clip_rule = self.pending_clip.take();
        let Some(path) = self.take_path() else {
            return;
        };
        let transform = self.device_transform();

        if let Some(rule) = fill {
            let paint = solid_paint(self.state.fill, self.state.fill_alpha);
            self.pixmap
                .fill_path(&path, &paint, rule, transform, self.state.clip.as_deref());
        }
        if stroke {
            let paint = solid_paint(self.state.stroke, self.state.stroke_alpha);
            let stroke = self.build_stroke();
            self.pixmap
                .stroke_path(&path, &paint, &stroke, transform, self.state.clip.as_deref());
        }
        // The clip takes effect after the painting operator that ends the path.
        if let Some(rule) = clip_rule {
            self.intersect_clip(&path, rule, transform);
        }
    }

    fn intersect_clip(&mut self, path: &Path, rule: FillRule, transform: Transform) {
        let mask = match self.state.clip.as_deref() {
            Some(existing) => {
                let mut mask = existing.clone();
                mask.intersect_path(path, rule, true, transform);
                mask
            }
            None => {
                let Some(mut mask) = Mask::new(self.pixmap.width(), self.pixmap.height()) else {
                    return;
                };
                mask.fill_path(path, rule, true, transform);
                mask
            }
        };
        self.state.clip = Some(Rc::new(mask));
    }

    fn build_stroke(&self) -> Stroke {
        let mut stroke = Stroke {
            width: self.state.line_width,
            miter_limit: self.state.miter_limit,
            line_cap: self.state.line_cap,
            line_join: self.state.line_join,
            ..Stroke::default()
        };
        if let Some((pattern, phase)) = &self.state.dash {
            stroke.dash = StrokeDash::new(pattern.clone(), *phase);
        }
        stroke
    }

    fn device_transform(&self) -> Transform {
        self.base.pre_concat(self.state.ctm)
    }

    // -- XObjects -------------------------------------------------------------

    fn draw_image(&mut self, image: &std::sync::Arc<SampledImage>) {
        let key = std::sync::Arc::as_ptr(image);
        let source = match self.image_cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let Some(pixmap) = image_pixmap(image) else {
                    return;
                };
                let pixmap = Rc::new(pixmap);
                self.image_cache.insert(key, pixmap.clone());
                pixmap
            }
        };

        // Image space: the unit square, first sample row at the top.
        let w = image.width() as f32;
        let h = image.height() as f32;
        let unit = Transform::from_row(1.0 / w, 0.0, 0.0, -1.0 / h, 0.0, 1.0);
        let transform = self.device_transform().pre_concat(unit);

        let paint = PixmapPaint {
            opacity: self.state.fill_alpha,
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        let source: &Pixmap = &source;
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            transform,
            self.state.clip.as_deref(),
        );
    }

    fn draw_form(&mut self, form: &std::sync::Arc<FormXObject>, parent: &Resources) {
        if self.depth >= MAX_FORM_DEPTH {
            trace!("form nesting limit reached");
            return;
        }

        let saved_state = self.state.clone();
        let saved_stack = std::mem::take(&mut self.stack);
        let [a, b, c, d, e, f] = form.matrix;
        self.state.ctm = self.state.ctm.pre_concat(Transform::from_row(a, b, c, d, e, f));

        if let Some([x0, y0, x1, y1]) = form.bbox {
            let mut bbox = PathBuilder::new();
            bbox.move_to(x0, y0);
            bbox.line_to(x1, y0);
            bbox.line_to(x1, y1);
            bbox.line_to(x0, y1);
            bbox.close();
            if let Some(path) = bbox.finish() {
                let transform = self.device_transform();
                self.intersect_clip(&path, FillRule::Winding, transform);
            }
        }

        let resources = parent.overlaid(&form.resources);
        self.depth += 1;
        self.run(&form.operations, &resources);
        self.depth -= 1;

        // Discard any path left open inside the form.
        self.take_path();
        self.pending_clip = None;
        self.stack = saved_stack;
        self.state = saved_state;
    }
}

// -- Operand helpers ----------------------------------------------------------

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = obj_to_f32(operand)?;
    }
    Some(out)
}

/// Interpret colour operands by count: 1 = gray, 3 = RGB, 4 = CMYK.
/// Pattern names (a trailing name operand) are ignored.
fn device_color(operands: &[Object]) -> Option<[f32; 3]> {
    let values: Vec<f32> = operands.iter().map_while(obj_to_f32).collect();
    let unit = |v: f32| v.clamp(0.0, 1.0);
    match values.as_slice() {
        [gray] => Some([unit(*gray); 3]),
        [r, g, b] => Some([unit(*r), unit(*g), unit(*b)]),
        [c, m, y, k] => Some(cmyk_to_rgb(*c, *m, *y, *k)),
        _ => None,
    }
}

fn dash_pattern(operands: &[Object]) -> Option<(Vec<f32>, f32)> {
    let array = operands.first()?.as_array().ok()?;
    let mut pattern: Vec<f32> = array.iter().filter_map(obj_to_f32).map(f32::abs).collect();
    if pattern.is_empty() || pattern.iter().all(|v| *v == 0.0) {
        return None;
    }
    if pattern.len() % 2 == 1 {
        pattern.extend_from_within(..);
    }
    let phase = operands.get(1).and_then(obj_to_f32).unwrap_or(0.0);
    Some((pattern, phase))
}

fn solid_paint(rgb: [f32; 3], alpha: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    let color = Color::from_rgba(rgb[0], rgb[1], rgb[2], alpha.clamp(0.0, 1.0))
        .unwrap_or(Color::BLACK);
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

fn image_pixmap(image: &SampledImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (src, dst) in image.rgba().chunks_exact(4).zip(pixmap.data_mut().chunks_exact_mut(4)) {
        let a = src[3];
        dst[0] = premul_u8(src[0], a);
        dst[1] = premul_u8(src[1], a);
        dst[2] = premul_u8(src[2], a);
        dst[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}
