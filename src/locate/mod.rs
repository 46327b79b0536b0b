//! Fragment locator: find the glyph ranges of a sub-expression inside an expression.
//!
//! A pattern is given in the same source notation as the expression. It is typeset
//! through the engine and its glyph sequence is searched for as a contiguous run in
//! the target, comparing glyphs by **shape** (never by codepoint, never by color).
//!
//! Behavior notes:
//! - Matches are reported left to right in glyph-sequence order, which is the
//!   grouping structure's depth-first order; strictly increasing `start`.
//! - Matches do not overlap: after a hit the scan resumes at its end.
//! - The locator does not reinterpret structure. A pattern that crosses a fraction bar
//!   or a script boundary matches only if the engine emits its glyphs contiguously.
//! - Misses are `None`/empty. Only an invalid pattern or an unusable engine is an error.

use std::collections::HashMap;

use crate::engine::{EngineError, Expression, GlyphRange, ShapeKey, Typesetter};
use crate::error::{Error, Result};

/// Pattern search over typeset expressions, with a per-pattern typesetting cache.
pub struct Locator<T> {
    typesetter: T,
    cache: HashMap<String, Vec<ShapeKey>>,
}

impl<T: Typesetter> Locator<T> {
    pub fn new(typesetter: T) -> Self {
        Self {
            typesetter,
            cache: HashMap::new(),
        }
    }

    pub fn typesetter_mut(&mut self) -> &mut T {
        &mut self.typesetter
    }

    pub fn into_inner(self) -> T {
        self.typesetter
    }

    /// Typeset `pattern` and return its glyph shapes (cached).
    pub fn pattern_shapes(&mut self, pattern: &str) -> Result<Vec<ShapeKey>> {
        if let Some(shapes) = self.cache.get(pattern) {
            return Ok(shapes.clone());
        }
        if pattern.trim().is_empty() {
            return Err(invalid(pattern, "empty pattern"));
        }
        let typeset = self.typesetter.typeset(pattern).map_err(|err| match err {
            EngineError::Typeset { message, .. } => invalid(pattern, message),
            other => Error::from(other),
        })?;
        if typeset.is_empty() {
            return Err(invalid(pattern, "pattern typesets to no glyphs"));
        }
        let shapes: Vec<ShapeKey> = typeset.glyphs().iter().map(|g| g.shape).collect();
        self.cache.insert(pattern.to_string(), shapes.clone());
        Ok(shapes)
    }

    /// All matches of `pattern` in `expression`, in document order.
    pub fn find_all(&mut self, expression: &Expression, pattern: &str) -> Result<Vec<GlyphRange>> {
        let shapes = self.pattern_shapes(pattern)?;
        let found = match_shapes(expression, &shapes);
        log::debug!(
            "locate {pattern:?} in {:?}: {} match(es)",
            expression.source(),
            found.len()
        );
        Ok(found)
    }

    /// The `nth` match; negative `nth` counts from the end (`-1` is the last).
    pub fn find(
        &mut self,
        expression: &Expression,
        pattern: &str,
        nth: isize,
    ) -> Result<Option<GlyphRange>> {
        let all = self.find_all(expression, pattern)?;
        Ok(select_nth(&all, nth))
    }

    /// First occurrence of `pattern_a` immediately followed by `pattern_b`.
    ///
    /// Returns the range covering both. Used to attach a sign glyph to its numeral.
    pub fn find_adjacent(
        &mut self,
        expression: &Expression,
        pattern_a: &str,
        pattern_b: &str,
    ) -> Result<Option<GlyphRange>> {
        let a = self.pattern_shapes(pattern_a)?;
        let b = self.pattern_shapes(pattern_b)?;
        let glyphs = expression.glyphs();
        let total = a.len() + b.len();
        if total > glyphs.len() {
            return Ok(None);
        }
        for start in 0..=glyphs.len() - total {
            let run = &glyphs[start..start + total];
            let hit = run
                .iter()
                .zip(a.iter().chain(b.iter()))
                .all(|(g, s)| g.shape == *s);
            if hit {
                return Ok(Some(GlyphRange::new(start, start + total)));
            }
        }
        Ok(None)
    }
}

/// Non-overlapping occurrences of `shapes` in `expression`, left to right.
///
/// The scan runs in glyph (depth-first) order; the result is then ordered by the
/// left edge of each match, to 1/100 pt, with glyph order breaking ties. Inside a
/// fraction the denominator can start left of the numerator.
pub fn match_shapes(expression: &Expression, shapes: &[ShapeKey]) -> Vec<GlyphRange> {
    let glyphs = expression.glyphs();
    let mut out = Vec::new();
    if shapes.is_empty() || shapes.len() > glyphs.len() {
        return out;
    }
    let mut start = 0usize;
    while start + shapes.len() <= glyphs.len() {
        let hit = glyphs[start..start + shapes.len()]
            .iter()
            .zip(shapes)
            .all(|(g, s)| g.shape == *s);
        if hit {
            out.push(GlyphRange::new(start, start + shapes.len()));
            start += shapes.len();
        } else {
            start += 1;
        }
    }
    out.sort_by_key(|range| (expression.range_bbox(*range).min[0] * 100.0).round() as i64);
    out
}

/// Python-style ordinal selection; out of range is a soft miss.
pub fn select_nth(matches: &[GlyphRange], nth: isize) -> Option<GlyphRange> {
    let len = matches.len() as isize;
    let idx = if nth < 0 { len + nth } else { nth };
    if (0..len).contains(&idx) {
        Some(matches[idx as usize])
    } else {
        None
    }
}

fn invalid(pattern: &str, reason: impl Into<String>) -> Error {
    Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::headless::HeadlessEngine;

    #[test]
    fn finds_every_two_in_order() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset("4n - 26 = -2").unwrap();
        let mut locator = Locator::new(&mut engine);
        let twos = locator.find_all(&expr, "2").unwrap();
        assert_eq!(twos, vec![GlyphRange::new(3, 4), GlyphRange::new(7, 8)]);
    }

    #[test]
    fn signed_numeral_is_one_range() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset("4n - 26 = -2").unwrap();
        let mut locator = Locator::new(&mut engine);
        let hit = locator.find(&expr, "-26", 0).unwrap().unwrap();
        assert_eq!(hit, GlyphRange::new(2, 5));
        assert_eq!(expr.symbols(hit), "−26");
        assert_eq!(locator.find_all(&expr, "-26").unwrap().len(), 1);
    }

    #[test]
    fn nth_selector_is_soft() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset("2 + 2 = 4").unwrap();
        let mut locator = Locator::new(&mut engine);
        assert_eq!(locator.find(&expr, "2", -1).unwrap(), Some(GlyphRange::new(2, 3)));
        assert_eq!(locator.find(&expr, "2", 2).unwrap(), None);
        assert_eq!(locator.find(&expr, "2", -3).unwrap(), None);
        assert_eq!(locator.find(&expr, "7", 0).unwrap(), None);
    }

    #[test]
    fn empty_pattern_is_invalid() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset("x = 1").unwrap();
        let mut locator = Locator::new(&mut engine);
        assert!(matches!(
            locator.find_all(&expr, "  "),
            Err(Error::InvalidPattern { .. })
        ));
        assert!(matches!(
            locator.find_all(&expr, r"\frac{1}{"),
            Err(Error::InvalidPattern { .. })
        ));
        assert!(matches!(
            locator.find_all(&expr, r"\,"),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn engine_unavailable_is_reported() {
        let mut ok = HeadlessEngine::default();
        let expr = ok.typeset("x = 1").unwrap();
        let mut locator = Locator::new(HeadlessEngine::unavailable());
        assert!(matches!(
            locator.find_all(&expr, "x"),
            Err(Error::RenderingEngineUnavailable(_))
        ));
    }

    #[test]
    fn subscript_requires_both_glyphs() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset("x_1 + x = 1").unwrap();
        let mut locator = Locator::new(&mut engine);
        assert_eq!(locator.find_all(&expr, "x_1").unwrap(), vec![GlyphRange::new(0, 2)]);
        // The scripted `1` is a different shape from the baseline `1`.
        assert_eq!(locator.find_all(&expr, "1").unwrap(), vec![GlyphRange::new(5, 6)]);
    }

    #[test]
    fn adjacent_sign_and_numeral() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset("3 - x = -12").unwrap();
        let mut locator = Locator::new(&mut engine);
        assert_eq!(
            locator.find_adjacent(&expr, "-", "12").unwrap(),
            Some(GlyphRange::new(4, 7))
        );
        assert_eq!(locator.find_adjacent(&expr, "-", "3").unwrap(), None);
    }

    #[test]
    fn matches_are_ordered_by_position_not_glyph_order() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset(r"\frac{2}{222}").unwrap();
        let mut locator = Locator::new(&mut engine);
        let twos = locator.find_all(&expr, "2").unwrap();
        // Glyph order is numerator, bar, denominator; the numerator `2` is centered
        // over the middle denominator digit and comes first among equals.
        assert_eq!(
            twos,
            vec![
                GlyphRange::new(2, 3),
                GlyphRange::new(0, 1),
                GlyphRange::new(3, 4),
                GlyphRange::new(4, 5),
            ]
        );
        let xs: Vec<f32> = twos.iter().map(|r| expr.range_bbox(*r).min[0]).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1] + 0.01), "{xs:?}");
        assert_eq!(locator.find(&expr, "2", 0).unwrap(), Some(GlyphRange::new(2, 3)));
        assert_eq!(locator.find(&expr, "2", -1).unwrap(), Some(GlyphRange::new(4, 5)));
    }

    #[test]
    fn matches_do_not_overlap() {
        let mut engine = HeadlessEngine::default();
        let expr = engine.typeset("222").unwrap();
        let mut locator = Locator::new(&mut engine);
        assert_eq!(locator.find_all(&expr, "22").unwrap(), vec![GlyphRange::new(0, 2)]);
    }
}
