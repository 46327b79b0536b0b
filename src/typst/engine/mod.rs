//! Typst-backed rendering engine.
//!
//! [`TypstEngine`] typesets the tutorial notation by translating it to Typst math,
//! compiling it in a [`world::TypstWorld`] and walking the frames into glyphs
//! ([`extract`]). Expressions are cached by source, so repeatedly typesetting a search
//! pattern is cheap. The scene side records placements and the timeline like the
//! headless engine; an external renderer can look up any glyph's outline by shape.

pub mod extract;
pub mod latex;
pub mod world;

use std::collections::HashMap;

use anyhow::Context;

use crate::anim::{Animation, Timeline};
use crate::engine::{EngineError, Expression, RenderEngine, SceneGraph, ShapeKey, Typesetter};
use crate::font::GlyphOutline;
use crate::scene::{Affine2, Rgba};
use crate::style::TutorialStyle;

pub use world::FontOptions;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypstOptions {
    pub font_size_pt: f32,
    /// Initial color of every glyph.
    pub text_color: Rgba,
    pub fonts: FontOptions,
}

impl Default for TypstOptions {
    fn default() -> Self {
        Self {
            font_size_pt: 24.0,
            text_color: Rgba::WHITE,
            fonts: FontOptions::default(),
        }
    }
}

impl From<&TutorialStyle> for TypstOptions {
    fn from(style: &TutorialStyle) -> Self {
        Self {
            font_size_pt: style.font_size_pt,
            text_color: style.palette.text,
            ..Self::default()
        }
    }
}

pub struct TypstEngine {
    options: TypstOptions,
    world: world::TypstWorld,
    expressions: HashMap<String, Expression>,
    outlines: HashMap<ShapeKey, GlyphOutline>,
    scene: SceneGraph,
    timeline: Timeline,
}

impl TypstEngine {
    /// Build the Typst world. Fails with [`EngineError::Unavailable`] when no font loads.
    pub fn new(options: TypstOptions) -> Result<Self, EngineError> {
        let world = world::TypstWorld::new(options.fonts)
            .map_err(|e| EngineError::Unavailable(format!("{e:#}")))?;
        Ok(Self {
            options,
            world,
            expressions: HashMap::new(),
            outlines: HashMap::new(),
            scene: SceneGraph::default(),
            timeline: Timeline::new(),
        })
    }

    pub fn options(&self) -> &TypstOptions {
        &self.options
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Outline (font units) of a glyph typeset by this engine.
    pub fn outline(&self, shape: ShapeKey) -> Option<&GlyphOutline> {
        self.outlines.get(&shape)
    }

    /// The complete Typst document compiled for `source`.
    pub fn document_source(&self, source: &str) -> anyhow::Result<String> {
        let math = latex::latex_to_typst(source)?;
        Ok(format!(
            "#set page(width: auto, height: auto, margin: 0pt, fill: none)\n\
             #set text(size: {size}pt, fill: rgb(\"{color}\"))\n\
             ${math}$\n",
            size = self.options.font_size_pt,
            color = self.options.text_color.to_hex(),
        ))
    }

    fn compile_expression(&mut self, source: &str) -> anyhow::Result<Expression> {
        let document = self.document_source(source)?;
        self.world.set_main_source(document);
        let paged = self
            .world
            .compile()
            .with_context(|| format!("compiling {source:?}"))?;
        let extracted = extract::extract_glyphs(&paged);
        self.outlines.extend(extracted.outlines);
        log::debug!("typeset {source:?}: {} glyph(s)", extracted.glyphs.len());
        Ok(Expression::new(source, extracted.glyphs))
    }
}

impl Typesetter for TypstEngine {
    fn typeset(&mut self, source: &str) -> Result<Expression, EngineError> {
        if let Some(expr) = self.expressions.get(source) {
            return Ok(expr.clone());
        }
        let expr = self
            .compile_expression(source)
            .map_err(|e| EngineError::Typeset {
                input: source.to_string(),
                message: format!("{e:#}"),
            })?;
        self.expressions.insert(source.to_string(), expr.clone());
        Ok(expr)
    }
}

impl RenderEngine for TypstEngine {
    fn add(
        &mut self,
        fragment: usize,
        parts: &[Expression],
        world_from_fragment: Affine2,
    ) -> Result<(), EngineError> {
        log::trace!(
            "add fragment {fragment} ({} glyph(s))",
            parts.iter().map(Expression::len).sum::<usize>()
        );
        self.scene.insert(fragment, world_from_fragment);
        Ok(())
    }

    fn remove(&mut self, fragment: usize) -> Result<(), EngineError> {
        self.scene.remove(fragment);
        Ok(())
    }

    fn play(&mut self, animations: &[Animation], duration_s: f32) -> Result<(), EngineError> {
        if animations.is_empty() {
            return Ok(());
        }
        self.scene.apply(animations)?;
        self.timeline.push(animations.to_vec(), duration_s);
        Ok(())
    }

    fn wait(&mut self, duration_s: f32) -> Result<(), EngineError> {
        self.timeline.wait(duration_s);
        Ok(())
    }

    fn timeline(&self) -> &Timeline {
        &self.timeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::Locator;

    fn engine() -> TypstEngine {
        TypstEngine::new(TypstOptions::default()).expect("embedded fonts load")
    }

    #[test]
    fn digits_and_letters_become_glyphs() {
        let mut e = engine();
        let expr = e.typeset("4n - 26 = -2").unwrap();
        // 4 n − 2 6 = − 2
        assert_eq!(expr.len(), 8, "symbols: {}", expr.symbols(expr.full_range()));
        assert!(expr.glyphs()[0].bbox.min[0].abs() < 1e-3, "normalized to x = 0");
        assert!(expr.glyphs()[0].bbox.min[1] < 0.0, "digits sit above the baseline");
        assert!(e.outline(expr.glyphs()[0].shape).is_some());
    }

    #[test]
    fn equal_symbols_share_shapes() {
        let mut e = engine();
        let expr = e.typeset("2 + x = 2").unwrap();
        let g = expr.glyphs();
        assert_eq!(g.len(), 5);
        assert!(g[0].same_shape(&g[4]));
        assert!(!g[0].same_shape(&g[2]));
    }

    #[test]
    fn fraction_bar_is_a_glyph() {
        let mut e = engine();
        let expr = e.typeset(r"\frac{4}{5}x").unwrap();
        assert!(expr.glyphs().iter().any(|g| g.symbol == "frac-bar"));
        assert_eq!(expr.len(), 4);
    }

    #[test]
    fn locator_finds_terms_in_typst_output() {
        let mut locator = Locator::new(engine());
        let expr = locator.typesetter_mut().typeset("4n - 26 = -2").unwrap();
        let hits = locator.find_all(&expr, "-26").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 3);
    }

    #[test]
    fn bad_source_is_a_typeset_error() {
        let mut e = engine();
        assert!(matches!(
            e.typeset(r"\frac{1}{2"),
            Err(EngineError::Typeset { .. })
        ));
    }

    #[test]
    fn play_needs_fragments_in_scene() {
        let mut e = engine();
        let expr = e.typeset("x").unwrap();
        let anim = Animation::write(crate::anim::AnimTarget::Fragment(0));
        assert!(e.play(&[anim.clone()], 1.0).is_err());
        e.add(0, &[expr], Affine2::IDENTITY).unwrap();
        e.play(&[anim], 1.0).unwrap();
        assert_eq!(e.timeline().clock_s(), 1.0);
    }
}
