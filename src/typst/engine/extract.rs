//! Frame walk: compiled Typst document → flat glyph sequence.
//!
//! Math in Typst is deeply nested frame items (groups with transforms). The walk
//! accumulates `world_from_frame` down the tree and emits one [`Glyph`] per shaped
//! glyph with an outline and one per rule (fraction bars). The item indices along the
//! way form the glyph's `group_path`, so glyph order is the depth-first frame order.
//!
//! Afterwards the expression is normalized: x starts at 0 and y = 0 is the baseline
//! of the first full-size text run.

use std::hash::{DefaultHasher, Hash, Hasher};

use typst::{
    layout::{Frame, FrameItem, PagedDocument, Transform},
    text::TextItem,
    visualize::{Geometry, Paint, Shape},
};

use crate::engine::{Glyph, ShapeKey};
use crate::font::{GlyphOutline, glyph_outline};
use crate::scene::{Aabb2, Affine2, Rgba};

#[derive(Debug, Default)]
pub struct Extracted {
    pub glyphs: Vec<Glyph>,
    /// Outline of every text glyph, keyed like the glyph.
    pub outlines: Vec<(ShapeKey, GlyphOutline)>,
}

#[derive(Debug, Default)]
struct Walk {
    out: Extracted,
    /// `(font size pt, world y of the run origin)` of each text run.
    runs: Vec<(f32, f32)>,
}

pub fn extract_glyphs(doc: &PagedDocument) -> Extracted {
    let mut walk = Walk::default();
    let mut path = Vec::new();
    for (page_idx, page) in doc.pages.iter().enumerate() {
        path.push(page_idx as u16);
        walk.frame(&page.frame, Affine2::IDENTITY, &mut path);
        path.pop();
    }
    walk.normalize();
    log::trace!("extracted {} glyph(s)", walk.out.glyphs.len());
    walk.out
}

impl Walk {
    fn frame(&mut self, frame: &Frame, world_from_frame: Affine2, path: &mut Vec<u16>) {
        for (i, (pos, item)) in frame.items().enumerate() {
            path.push(i as u16);
            let world_from_item = world_from_frame.mul(Affine2::translate(
                pos.x.to_pt() as f32,
                pos.y.to_pt() as f32,
            ));
            match item {
                FrameItem::Group(group) => {
                    let world_from_group =
                        world_from_item.mul(affine2_from_typst_transform(group.transform));
                    self.frame(&group.frame, world_from_group, path);
                }
                FrameItem::Text(text) => self.text(text, world_from_item, path),
                FrameItem::Shape(shape, _span) => self.rule(shape, world_from_item, path),
                _ => {}
            }
            path.pop();
        }
    }

    fn text(&mut self, text: &TextItem, world_from_item: Affine2, path: &[u16]) {
        let size_pt = text.size.to_pt() as f32;
        self.runs
            .push((size_pt, world_from_item.transform_point(0.0, 0.0).1));
        let color = paint_to_rgba(&text.fill).unwrap_or(Rgba::WHITE);
        let face = text.font.ttf();

        let mut pen_x_pt = 0.0f32;
        for (gi, g) in text.glyphs.iter().enumerate() {
            let adv_pt = g.x_advance.at(text.size).to_pt() as f32;
            let x_off_pt = g.x_offset.at(text.size).to_pt() as f32;
            let y_off_pt = g.y_offset.at(text.size).to_pt() as f32;

            // Glyphs without contours (spaces) are not drawn and not matched.
            if let Ok(outline) = glyph_outline(face, g.id) {
                let [x0, y0, x1, y1] = outline.bounds_pt(size_pt);
                let local = Affine2::translate(pen_x_pt + x_off_pt, -y_off_pt);
                let bbox = world_from_item
                    .mul(local)
                    .transform_aabb(Aabb2::from_min_max([x0, y0], [x1, y1]));
                let shape = text_shape_key(outline.hash, size_pt);
                let mut group_path = path.to_vec();
                group_path.push(gi as u16);
                self.out.glyphs.push(Glyph {
                    shape,
                    bbox,
                    color,
                    group_path,
                    symbol: text.text.get(g.range()).unwrap_or("?").to_string(),
                });
                self.out.outlines.push((shape, outline));
            }
            pen_x_pt += adv_pt;
        }
    }

    fn rule(&mut self, shape: &Shape, world_from_item: Affine2, path: &[u16]) {
        let (local, color) = match &shape.geometry {
            Geometry::Line(delta) => {
                let Some(stroke) = shape.stroke.as_ref() else {
                    return;
                };
                let half = 0.5 * stroke.thickness.to_pt() as f32;
                let (dx, dy) = (delta.x.to_pt() as f32, delta.y.to_pt() as f32);
                (
                    Aabb2::from_min_max(
                        [dx.min(0.0), dy.min(0.0) - half],
                        [dx.max(0.0), dy.max(0.0) + half],
                    ),
                    paint_to_rgba(&stroke.paint),
                )
            }
            Geometry::Rect(size) => {
                let Some(fill) = shape.fill.as_ref() else {
                    return;
                };
                (
                    Aabb2::from_min_max([0.0, 0.0], [size.x.to_pt() as f32, size.y.to_pt() as f32]),
                    paint_to_rgba(fill),
                )
            }
            _ => return,
        };
        let bbox = world_from_item.transform_aabb(local);
        self.out.glyphs.push(Glyph {
            shape: rule_shape_key(bbox.width(), bbox.height()),
            bbox,
            color: color.unwrap_or(Rgba::WHITE),
            group_path: path.to_vec(),
            symbol: "frac-bar".to_string(),
        });
    }

    fn normalize(&mut self) {
        let glyphs = &mut self.out.glyphs;
        if glyphs.is_empty() {
            return;
        }
        let max_size = self.runs.iter().map(|r| r.0).fold(0.0f32, f32::max);
        let baseline = self
            .runs
            .iter()
            .find(|(size, _)| (size - max_size).abs() < 0.01)
            .map(|r| r.1)
            .unwrap_or_else(|| glyphs.iter().map(|g| g.bbox.max[1]).fold(f32::MIN, f32::max));
        let min_x = glyphs.iter().map(|g| g.bbox.min[0]).fold(f32::MAX, f32::min);
        let shift = Affine2::translate(-min_x, -baseline);
        for g in glyphs.iter_mut() {
            g.bbox = shift.transform_aabb(g.bbox);
        }
    }
}

/// Outline plus rendered size; the same outline at another size is another shape.
fn text_shape_key(outline_hash: u64, size_pt: f32) -> ShapeKey {
    let mut h = DefaultHasher::new();
    "glyph".hash(&mut h);
    outline_hash.hash(&mut h);
    ((size_pt * 100.0).round() as i64).hash(&mut h);
    ShapeKey(h.finish())
}

fn rule_shape_key(width_pt: f32, height_pt: f32) -> ShapeKey {
    let mut h = DefaultHasher::new();
    "rule".hash(&mut h);
    ((width_pt * 100.0).round() as i64).hash(&mut h);
    ((height_pt * 100.0).round() as i64).hash(&mut h);
    ShapeKey(h.finish())
}

fn paint_to_rgba(paint: &Paint) -> Option<Rgba> {
    match paint {
        Paint::Solid(c) => {
            let rgba = c.to_rgb();
            Some(Rgba {
                r: rgba.red as f32,
                g: rgba.green as f32,
                b: rgba.blue as f32,
                a: rgba.alpha as f32,
            })
        }
        _ => None,
    }
}

fn affine2_from_typst_transform(t: Transform) -> Affine2 {
    let sx = t.sx.get() as f32;
    let sy = t.sy.get() as f32;
    let kx = t.kx.get() as f32;
    let ky = t.ky.get() as f32;
    let tx = t.tx.to_pt() as f32;
    let ty = t.ty.to_pt() as f32;

    Affine2 {
        m: [[sx, ky, 0.0], [kx, sy, 0.0], [tx, ty, 1.0]],
    }
}
