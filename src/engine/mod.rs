//! Rendering-engine capability contracts.
//!
//! The core depends on a rendering engine only through two traits:
//! - [`Typesetter`]: LaTeX-like source → [`Expression`] (a flat glyph sequence with
//!   geometry, shape identity and mutable color).
//! - [`RenderEngine`]: scene mutation (`add`/`remove`), `play`, `wait` and the scene clock.
//!
//! Two implementations ship with the crate:
//! - [`headless::HeadlessEngine`]: deterministic, font-free; used by tests and dry runs.
//! - `typst::TypstEngine` (feature `typst`): real typesetting via an in-memory Typst world.

pub mod headless;

use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;
use thiserror::Error;

use crate::anim::{AnimTarget, Animation, AnimationKind, Timeline};
use crate::scene::{Aabb2, Affine2, Rgba};

#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine (or its fonts) cannot be used at all.
    #[error("{0}")]
    Unavailable(String),

    /// The source could not be typeset.
    #[error("cannot typeset {input:?}: {message}")]
    Typeset { input: String, message: String },

    /// An animation or scene mutation failed.
    #[error("playback failed: {0}")]
    Playback(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Shape identity of a glyph: equal keys iff the typeset outlines agree.
///
/// Color and position never contribute to the key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShapeKey(pub u64);

/// One atomic drawable unit inside an [`Expression`].
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub shape: ShapeKey,
    /// Bounds in expression space (pt, y down, baseline at y = 0).
    pub bbox: Aabb2,
    pub color: Rgba,
    /// Child indices from the root of the grouping structure down to this glyph.
    ///
    /// Glyph order in an expression is the depth-first order of these paths.
    pub group_path: Vec<u16>,
    /// Human-readable symbol for logs and debugging (`"2"`, `"−"`, `"frac-bar"`).
    pub symbol: String,
}

impl Glyph {
    /// Shape equality; color and geometry are ignored.
    #[inline]
    pub fn same_shape(&self, other: &Glyph) -> bool {
        self.shape == other.shape
    }
}

/// A half-open interval `[start, end)` over an expression's glyph sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GlyphRange {
    pub start: usize,
    pub end: usize,
}

impl GlyphRange {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &GlyphRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest range covering both.
    #[inline]
    pub fn cover(&self, other: &GlyphRange) -> GlyphRange {
        GlyphRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    #[inline]
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// An already-typeset expression: an immutable glyph sequence with mutable color.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    glyphs: Vec<Glyph>,
}

impl Expression {
    pub fn new(source: impl Into<String>, glyphs: Vec<Glyph>) -> Self {
        Self {
            source: source.into(),
            glyphs,
        }
    }

    /// The source notation this expression was typeset from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Full glyph range of the expression.
    #[inline]
    pub fn full_range(&self) -> GlyphRange {
        GlyphRange::new(0, self.glyphs.len())
    }

    pub fn bbox(&self) -> Aabb2 {
        self.range_bbox(self.full_range())
    }

    /// Bounds of the glyphs in `range`; empty if the range is empty or out of bounds.
    pub fn range_bbox(&self, range: GlyphRange) -> Aabb2 {
        let end = range.end.min(self.glyphs.len());
        let start = range.start.min(end);
        self.glyphs[start..end]
            .iter()
            .fold(Aabb2::empty(), |acc, g| acc.union(g.bbox))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.bbox().width()
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bbox().height()
    }

    pub fn set_color(&mut self, index: usize, color: Rgba) {
        if let Some(g) = self.glyphs.get_mut(index) {
            g.color = color;
        }
    }

    /// Recolor every glyph in `range` (clamped to the expression).
    pub fn set_range_color(&mut self, range: GlyphRange, color: Rgba) {
        let end = range.end.min(self.glyphs.len());
        for g in self.glyphs.iter_mut().take(end).skip(range.start) {
            g.color = color;
        }
    }

    pub fn colors(&self) -> Vec<Rgba> {
        self.glyphs.iter().map(|g| g.color).collect()
    }

    /// Symbols of the glyphs in `range`, concatenated. Handy in logs and tests.
    pub fn symbols(&self, range: GlyphRange) -> String {
        let end = range.end.min(self.glyphs.len());
        self.glyphs[range.start.min(end)..end]
            .iter()
            .map(|g| g.symbol.as_str())
            .collect()
    }
}

/// `typeset(source) → Expression`.
pub trait Typesetter {
    fn typeset(&mut self, source: &str) -> Result<Expression, EngineError>;
}

/// Scene mutation, playback and the scene clock.
///
/// Every `play` is a suspension point: it returns once the animation has completed.
pub trait RenderEngine: Typesetter {
    /// Put a fragment (its expressions, already placed) into the scene graph.
    fn add(
        &mut self,
        fragment: usize,
        parts: &[Expression],
        world_from_fragment: Affine2,
    ) -> Result<(), EngineError>;

    fn remove(&mut self, fragment: usize) -> Result<(), EngineError>;

    /// Play `animations` in parallel for `duration_s` seconds.
    fn play(&mut self, animations: &[Animation], duration_s: f32) -> Result<(), EngineError>;

    fn wait(&mut self, duration_s: f32) -> Result<(), EngineError>;

    /// Everything played so far on the scene clock.
    fn timeline(&self) -> &Timeline;
}

/// Fragment placements currently in a scene, shared by the shipped engines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGraph {
    placements: BTreeMap<usize, Affine2>,
}

impl SceneGraph {
    pub fn insert(&mut self, fragment: usize, world_from_fragment: Affine2) {
        self.placements.insert(fragment, world_from_fragment);
    }

    pub fn remove(&mut self, fragment: usize) -> Option<Affine2> {
        self.placements.remove(&fragment)
    }

    pub fn contains(&self, fragment: usize) -> bool {
        self.placements.contains_key(&fragment)
    }

    pub fn placement(&self, fragment: usize) -> Option<Affine2> {
        self.placements.get(&fragment).copied()
    }

    pub fn placements(&self) -> &BTreeMap<usize, Affine2> {
        &self.placements
    }

    /// Check that every animation targets a fragment in the scene, then apply the
    /// end state of whole-fragment shifts to the placements.
    pub fn apply(&mut self, animations: &[Animation]) -> Result<(), EngineError> {
        if let Some(missing) = animations
            .iter()
            .map(|a| a.target.fragment_index())
            .find(|f| !self.contains(*f))
        {
            return Err(EngineError::Playback(format!(
                "animation targets fragment {missing}, which is not in the scene"
            )));
        }
        for anim in animations {
            if let (AnimTarget::Fragment(f), AnimationKind::Shift { dy }) = (&anim.target, &anim.kind) {
                if let Some(xf) = self.placements.get_mut(f) {
                    *xf = Affine2::translate(0.0, *dy).mul(*xf);
                }
            }
        }
        Ok(())
    }
}

impl<T: Typesetter + ?Sized> Typesetter for &mut T {
    fn typeset(&mut self, source: &str) -> Result<Expression, EngineError> {
        (**self).typeset(source)
    }
}

impl<T: RenderEngine + ?Sized> RenderEngine for &mut T {
    fn add(
        &mut self,
        fragment: usize,
        parts: &[Expression],
        world_from_fragment: Affine2,
    ) -> Result<(), EngineError> {
        (**self).add(fragment, parts, world_from_fragment)
    }

    fn remove(&mut self, fragment: usize) -> Result<(), EngineError> {
        (**self).remove(fragment)
    }

    fn play(&mut self, animations: &[Animation], duration_s: f32) -> Result<(), EngineError> {
        (**self).play(animations, duration_s)
    }

    fn wait(&mut self, duration_s: f32) -> Result<(), EngineError> {
        (**self).wait(duration_s)
    }

    fn timeline(&self) -> &Timeline {
        (**self).timeline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_range_basics() {
        let a = GlyphRange::new(2, 5);
        let b = GlyphRange::new(4, 7);
        assert_eq!(a.len(), 3);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&GlyphRange::new(5, 6)), "half-open");
        assert_eq!(a.cover(&b), GlyphRange::new(2, 7));
        assert!(GlyphRange::new(3, 1).is_empty(), "end clamps to start");
    }
}
