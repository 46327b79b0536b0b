//! Pattern → color application on typeset expressions.
//!
//! A [`ColorMap`] is applied key by key in declaration order, so on overlapping
//! matches the later pattern wins. Coloring only ever writes the glyphs of the current
//! matches; nothing is reset to a default color.

use serde::{Deserialize, Serialize};

use crate::engine::{Expression, GlyphRange, Typesetter};
use crate::error::Result;
use crate::locate::Locator;
use crate::scene::Rgba;

/// Ordered `pattern → color` mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    entries: Vec<(String, Rgba)>,
}

impl ColorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ColorMap::insert`].
    pub fn with(mut self, pattern: impl Into<String>, color: Rgba) -> Self {
        self.insert(pattern, color);
        self
    }

    /// Set the color for `pattern`. An existing key keeps its declaration position.
    pub fn insert(&mut self, pattern: impl Into<String>, color: Rgba) {
        let pattern = pattern.into();
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == pattern) {
            entry.1 = color;
        } else {
            self.entries.push((pattern, color));
        }
    }

    pub fn get(&self, pattern: &str) -> Option<Rgba> {
        self.entries
            .iter()
            .find(|(p, _)| p == pattern)
            .map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgba)> {
        self.entries.iter().map(|(p, c)| (p.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>> FromIterator<(P, Rgba)> for ColorMap {
    fn from_iter<I: IntoIterator<Item = (P, Rgba)>>(iter: I) -> Self {
        let mut map = ColorMap::new();
        for (p, c) in iter {
            map.insert(p, c);
        }
        map
    }
}

/// Applies color maps through a [`Locator`].
pub struct Colorizer<T> {
    locator: Locator<T>,
}

impl<T: Typesetter> Colorizer<T> {
    pub fn new(typesetter: T) -> Self {
        Self {
            locator: Locator::new(typesetter),
        }
    }

    pub fn from_locator(locator: Locator<T>) -> Self {
        Self { locator }
    }

    pub fn locator_mut(&mut self) -> &mut Locator<T> {
        &mut self.locator
    }

    pub fn into_locator(self) -> Locator<T> {
        self.locator
    }

    /// Apply `map` once. Returns the number of glyph writes.
    pub fn colorize_static(&mut self, expression: &mut Expression, map: &ColorMap) -> Result<usize> {
        let mut writes = 0;
        for (pattern, color) in map.iter() {
            for range in self.locator.find_all(expression, pattern)? {
                expression.set_range_color(range, color);
                writes += range.len();
            }
        }
        Ok(writes)
    }

    /// Apply the same map to every expression.
    pub fn colorize_bulk(&mut self, expressions: &mut [Expression], map: &ColorMap) -> Result<usize> {
        let mut writes = 0;
        for expression in expressions.iter_mut() {
            writes += self.colorize_static(expression, map)?;
        }
        Ok(writes)
    }

    /// Recolor the `nth` match of `pattern` only. Returns the recolored range, if any.
    pub fn colorize_component(
        &mut self,
        expression: &mut Expression,
        pattern: &str,
        color: Rgba,
        nth: isize,
    ) -> Result<Option<GlyphRange>> {
        let hit = self.locator.find(expression, pattern, nth)?;
        if let Some(range) = hit {
            expression.set_range_color(range, color);
        }
        Ok(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::headless::HeadlessEngine;

    fn typeset(source: &str) -> Expression {
        HeadlessEngine::default().typeset(source).unwrap()
    }

    #[test]
    fn later_pattern_wins_on_overlap() {
        let mut expr = typeset("4n - 26 = -2");
        let map = ColorMap::new()
            .with("-26", Rgba::RED)
            .with("2", Rgba::BLUE);
        let mut colorizer = Colorizer::new(HeadlessEngine::default());
        colorizer.colorize_static(&mut expr, &map).unwrap();
        let colors = expr.colors();
        assert_eq!(colors[2], Rgba::RED, "minus of -26");
        assert_eq!(colors[3], Rgba::BLUE, "2 of -26 overwritten");
        assert_eq!(colors[4], Rgba::RED, "6 of -26");
        assert_eq!(colors[7], Rgba::BLUE);
        assert_eq!(colors[0], Rgba::WHITE);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let map = ColorMap::new()
            .with("n", Rgba::YELLOW)
            .with("-2", Rgba::GREEN);
        let mut colorizer = Colorizer::new(HeadlessEngine::default());
        let mut once = typeset("4n - 2 = -2 + n");
        colorizer.colorize_static(&mut once, &map).unwrap();
        let mut twice = once.clone();
        colorizer.colorize_static(&mut twice, &map).unwrap();
        assert_eq!(once.colors(), twice.colors());
    }

    #[test]
    fn disjoint_patterns_commute() {
        let mut colorizer = Colorizer::new(HeadlessEngine::default());
        let ab = ColorMap::new().with("n", Rgba::YELLOW).with("26", Rgba::RED);
        let ba = ColorMap::new().with("26", Rgba::RED).with("n", Rgba::YELLOW);
        let mut x = typeset("4n - 26 = -2");
        let mut y = x.clone();
        colorizer.colorize_static(&mut x, &ab).unwrap();
        colorizer.colorize_static(&mut y, &ba).unwrap();
        assert_eq!(x.colors(), y.colors());
    }

    #[test]
    fn recoloring_preserves_glyphs_outside_new_matches() {
        let mut colorizer = Colorizer::new(HeadlessEngine::default());
        let mut expr = typeset("x + 1 = 3");
        colorizer
            .colorize_static(&mut expr, &ColorMap::new().with("x", Rgba::YELLOW))
            .unwrap();
        colorizer
            .colorize_static(&mut expr, &ColorMap::new().with("3", Rgba::GREEN))
            .unwrap();
        assert_eq!(expr.colors()[0], Rgba::YELLOW);
        assert_eq!(expr.colors()[4], Rgba::GREEN);
    }

    #[test]
    fn component_and_bulk() {
        let mut colorizer = Colorizer::new(HeadlessEngine::default());
        let mut expr = typeset("2 + 2 = 4");
        let hit = colorizer
            .colorize_component(&mut expr, "2", Rgba::ORANGE, -1)
            .unwrap();
        assert_eq!(hit, Some(GlyphRange::new(2, 3)));
        assert_eq!(expr.colors()[0], Rgba::WHITE);
        assert_eq!(expr.colors()[2], Rgba::ORANGE);

        let mut many = vec![typeset("x = 1"), typeset("2x = 2")];
        let writes = colorizer
            .colorize_bulk(&mut many, &ColorMap::new().with("x", Rgba::BLUE))
            .unwrap();
        assert_eq!(writes, 2);
        assert_eq!(many[1].colors()[1], Rgba::BLUE);
    }

    #[test]
    fn insert_keeps_declaration_position() {
        let mut map = ColorMap::new().with("a", Rgba::RED).with("b", Rgba::BLUE);
        map.insert("a", Rgba::GREEN);
        let keys: Vec<_> = map.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(map.get("a"), Some(Rgba::GREEN));
    }
}
