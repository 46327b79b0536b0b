//! Locator and colorizer behavior through the public API.

use stepcast::Error;
use stepcast::colorize::{ColorMap, Colorizer};
use stepcast::engine::headless::HeadlessEngine;
use stepcast::engine::{GlyphRange, Typesetter};
use stepcast::locate::Locator;
use stepcast::scene::Rgba;

fn locator() -> Locator<HeadlessEngine> {
    Locator::new(HeadlessEngine::default())
}

#[test]
fn signed_constant_is_found_by_shape() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset("4n - 26 = -2").unwrap();
    assert_eq!(loc.find_all(&expr, "-26").unwrap(), [GlyphRange::new(2, 5)]);
    assert_eq!(loc.find_all(&expr, "-2").unwrap().len(), 2, "binary and unary minus look alike");
}

#[test]
fn ordinal_selection_and_soft_misses() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset("2 + x = 2").unwrap();
    assert_eq!(
        loc.find_all(&expr, "2").unwrap(),
        [GlyphRange::new(0, 1), GlyphRange::new(4, 5)]
    );
    assert_eq!(loc.find(&expr, "2", -1).unwrap(), Some(GlyphRange::new(4, 5)));
    assert_eq!(loc.find(&expr, "2", 2).unwrap(), None);
    assert_eq!(loc.find(&expr, "y", 0).unwrap(), None);
}

#[test]
fn matches_do_not_overlap() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset("222").unwrap();
    assert_eq!(loc.find_all(&expr, "22").unwrap(), [GlyphRange::new(0, 2)]);
}

#[test]
fn script_level_changes_the_shape() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset("a_{x}").unwrap();
    assert!(loc.find_all(&expr, "x").unwrap().is_empty());
    assert_eq!(loc.find_all(&expr, "a").unwrap().len(), 1);
}

#[test]
fn fraction_coefficient_is_contiguous() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset(r"\frac{4}{5}x - 9 = -1").unwrap();
    assert_eq!(loc.find(&expr, r"\frac{4}{5}", 0).unwrap(), Some(GlyphRange::new(0, 3)));
    assert_eq!(
        loc.find_adjacent(&expr, "-", "9").unwrap(),
        Some(GlyphRange::new(4, 6))
    );
}

#[test]
fn bad_patterns_are_errors() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset("x = 1").unwrap();
    assert!(matches!(loc.find_all(&expr, "  "), Err(Error::InvalidPattern { .. })));
    assert!(matches!(
        loc.find_all(&expr, r"\frac{1}{2"),
        Err(Error::InvalidPattern { .. })
    ));
}

#[test]
fn unavailable_engine_is_not_a_pattern_error() {
    let mut loc = Locator::new(HeadlessEngine::unavailable());
    let expr = HeadlessEngine::default().typeset("x").unwrap();
    assert!(matches!(
        loc.find_all(&expr, "x"),
        Err(Error::RenderingEngineUnavailable(_))
    ));
}

#[test]
fn colorizer_paints_every_match_and_nothing_else() {
    let mut colorizer = Colorizer::new(HeadlessEngine::default());
    let mut expr = colorizer
        .locator_mut()
        .typesetter_mut()
        .typeset("x + x = 2")
        .unwrap();
    let before = expr.colors();
    let map: ColorMap = [("x", Rgba::RED)].into_iter().collect();
    assert_eq!(colorizer.colorize_static(&mut expr, &map).unwrap(), 2);

    let after = expr.colors();
    assert_eq!(after[0], Rgba::RED);
    assert_eq!(after[2], Rgba::RED);
    for i in [1, 3, 4] {
        assert_eq!(after[i], before[i], "glyph {i} untouched");
    }
}

#[test]
fn component_colorizing_picks_one_occurrence() {
    let mut colorizer = Colorizer::new(HeadlessEngine::default());
    let mut expr = colorizer
        .locator_mut()
        .typesetter_mut()
        .typeset("2 + x = 2")
        .unwrap();
    let hit = colorizer
        .colorize_component(&mut expr, "2", Rgba::GREEN, 1)
        .unwrap();
    assert_eq!(hit, Some(GlyphRange::new(4, 5)));
    assert_ne!(expr.colors()[0], Rgba::GREEN);
    assert_eq!(expr.colors()[4], Rgba::GREEN);
}

#[test]
fn fraction_matches_read_left_to_right() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset(r"\frac{2}{222}").unwrap();
    let twos = loc.find_all(&expr, "2").unwrap();
    assert_eq!(twos.len(), 4);
    let xs: Vec<f32> = twos.iter().map(|r| expr.range_bbox(*r).min[0]).collect();
    assert!(xs.windows(2).all(|w| w[0] <= w[1] + 0.01), "{xs:?}");
    // The leftmost digit sits in the denominator.
    assert_eq!(twos[0], GlyphRange::new(2, 3));
    assert_eq!(loc.find(&expr, "2", 1).unwrap(), Some(GlyphRange::new(0, 1)));
}

#[test]
fn scripted_base_is_located_with_its_scripts() {
    let mut loc = locator();
    let expr = loc.typesetter_mut().typeset("x^{2}_{1} + 2 = 5").unwrap();
    assert_eq!(loc.find_all(&expr, "x^{2}_{1}").unwrap(), [GlyphRange::new(0, 3)]);
    // A raised `2` is a different shape from the one on the baseline.
    assert_eq!(loc.find_all(&expr, "2").unwrap(), [GlyphRange::new(4, 5)]);
    assert!(matches!(
        loc.find_all(&expr, "x^{2}^{3}"),
        Err(Error::InvalidPattern { .. })
    ));
}
