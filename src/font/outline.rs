//! Glyph outline extraction and outline hashing.
//!
//! `ttf-parser` reports a glyph as a stream of contour callbacks. `OutlineSink`
//! feeds them into a `lyon::path::Builder` and an [`OutlineHash`] at the same time,
//! so the path a renderer would fill and the key used for shape matching always
//! come from the same events.

use std::hash::{DefaultHasher, Hash, Hasher};

use lyon::math::point;
use lyon::path::Path;
use ttf_parser::{Face, GlyphId};

use super::FontError;

/// Coordinates are quantized to this many steps per em before hashing.
const HASH_STEPS_PER_EM: f32 = 4096.0;

/// One glyph outline in font units (y up).
#[derive(Debug, Clone)]
pub struct GlyphOutline {
    pub path: Path,
    pub units_per_em: f32,
    /// `(x_min, y_min, x_max, y_max)` in font units.
    pub bounds: [f32; 4],
    /// Size-independent outline hash; see [`OutlineHash`].
    pub hash: u64,
}

impl GlyphOutline {
    /// Scale factor from font units to pt at `size_pt`.
    #[inline]
    pub fn units_to_pt(&self, size_pt: f32) -> f32 {
        size_pt / self.units_per_em
    }

    /// Bounds in pt at `size_pt`, y down, relative to the glyph origin on the baseline.
    pub fn bounds_pt(&self, size_pt: f32) -> [f32; 4] {
        let s = self.units_to_pt(size_pt);
        let [x0, y0, x1, y1] = self.bounds;
        [x0 * s, -y1 * s, x1 * s, -y0 * s]
    }
}

/// Extract the outline for `glyph_id`.
///
/// Glyphs without contours (spaces) report [`FontError::MissingGlyph`].
pub fn glyph_outline(face: &Face<'_>, glyph_id: u16) -> Result<GlyphOutline, FontError> {
    let units_per_em = face.units_per_em() as f32;
    if units_per_em <= 0.0 {
        return Err(FontError::InvalidUnitsPerEm);
    }
    let mut sink = OutlineSink::new(units_per_em);
    let rect = face
        .outline_glyph(GlyphId(glyph_id), &mut sink)
        .ok_or(FontError::MissingGlyph { glyph_id })?;
    let (path, hash) = sink.finish();
    Ok(GlyphOutline {
        path,
        units_per_em,
        bounds: [
            rect.x_min as f32,
            rect.y_min as f32,
            rect.x_max as f32,
            rect.y_max as f32,
        ],
        hash,
    })
}

/// Hash of a contour event stream, normalized by units-per-em.
///
/// Faces with different em sizes that draw the same shape hash equally.
#[derive(Debug, Clone)]
pub struct OutlineHash {
    hasher: DefaultHasher,
    units_per_em: f32,
}

impl OutlineHash {
    pub fn new(units_per_em: f32) -> Self {
        Self {
            hasher: DefaultHasher::new(),
            units_per_em: units_per_em.max(1.0),
        }
    }

    fn event(&mut self, tag: u8, coords: &[f32]) {
        tag.hash(&mut self.hasher);
        for v in coords {
            let q = (v / self.units_per_em * HASH_STEPS_PER_EM).round() as i32;
            q.hash(&mut self.hasher);
        }
    }

    pub fn finish(&self) -> u64 {
        self.hasher.finish()
    }
}

/// `ttf-parser` callbacks into a lyon path plus an outline hash.
///
/// A glyph may contain several contours; `move_to` starts a new one.
struct OutlineSink {
    builder: lyon::path::Builder,
    contour_open: bool,
    hash: OutlineHash,
}

impl OutlineSink {
    fn new(units_per_em: f32) -> Self {
        Self {
            builder: Path::builder(),
            contour_open: false,
            hash: OutlineHash::new(units_per_em),
        }
    }

    fn close_contour(&mut self) {
        if self.contour_open {
            self.builder.close();
            self.contour_open = false;
        }
    }

    fn finish(mut self) -> (Path, u64) {
        self.close_contour();
        let hash = self.hash.finish();
        (self.builder.build(), hash)
    }
}

impl ttf_parser::OutlineBuilder for OutlineSink {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close_contour();
        self.hash.event(0, &[x, y]);
        self.builder.begin(point(x, y));
        self.contour_open = true;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.hash.event(1, &[x, y]);
        self.builder.line_to(point(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.hash.event(2, &[x1, y1, x, y]);
        self.builder.quadratic_bezier_to(point(x1, y1), point(x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.hash.event(3, &[x1, y1, x2, y2, x, y]);
        self.builder
            .cubic_bezier_to(point(x1, y1), point(x2, y2), point(x, y));
    }

    fn close(&mut self) {
        self.hash.event(4, &[]);
        self.close_contour();
    }
}
