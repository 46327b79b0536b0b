//! Headless engine: deterministic typesetting without fonts plus a recording scene.
//!
//! The typesetter understands the LaTeX-ish notation tutorials use:
//! - atoms: digits, letters, `+ − = ( ) [ ] . , / * < > | !`
//! - `\frac{a}{b}` (also `\dfrac`, `\tfrac`), `^{..}`, `_{..}`, `{..}` grouping
//! - `\cdot`, `\times`, `\div`, `\pm`, `\left`/`\right` (dropped), `\text{..}`/`\mathrm{..}`
//! - spacing commands `\,` `\;` `\:` `\!` `\quad` `\qquad` and `\ `
//!
//! Every visible atom becomes one glyph. A glyph's shape key hashes the symbol and the
//! script level, so `x` and a subscripted `x` are different shapes while two `2`s on the
//! same level are equal. Fraction bars are glyphs too; their shape depends on width.
//!
//! Layout is monospace-ish and only needs to be plausible: glyphs advance left to right
//! and fraction parts stack around the math axis. Glyph order is depth-first over the
//! grouping structure (numerator, bar, denominator).

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::iter::Peekable;
use std::str::CharIndices;

use crate::anim::{Animation, Timeline};
use crate::engine::{EngineError, Expression, Glyph, RenderEngine, SceneGraph, ShapeKey, Typesetter};
use crate::scene::{Aabb2, Affine2, Rgba};

/// What the headless scene saw, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Add { fragment: usize, glyphs: usize },
    Remove { fragment: usize },
    Play { animations: usize, duration_s: f32 },
    Wait { duration_s: f32 },
}

/// Font-free engine that records every scene call.
#[derive(Debug)]
pub struct HeadlessEngine {
    font_size_pt: f32,
    available: bool,
    timeline: Timeline,
    scene: SceneGraph,
    events: Vec<EngineEvent>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_SIZE_PT)
    }
}

pub const DEFAULT_FONT_SIZE_PT: f32 = 24.0;

impl HeadlessEngine {
    pub fn new(font_size_pt: f32) -> Self {
        Self {
            font_size_pt: font_size_pt.max(1.0),
            available: true,
            timeline: Timeline::new(),
            scene: SceneGraph::default(),
            events: Vec::new(),
        }
    }

    /// An engine whose every call fails with `EngineError::Unavailable`.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Fragments currently in the scene graph, with their placement.
    pub fn scene(&self) -> &BTreeMap<usize, Affine2> {
        self.scene.placements()
    }

    pub fn font_size_pt(&self) -> f32 {
        self.font_size_pt
    }

    fn ensure_available(&self) -> Result<(), EngineError> {
        if self.available {
            Ok(())
        } else {
            Err(EngineError::Unavailable(
                "headless engine was constructed as unavailable".to_string(),
            ))
        }
    }
}

impl Typesetter for HeadlessEngine {
    fn typeset(&mut self, source: &str) -> Result<Expression, EngineError> {
        self.ensure_available()?;
        typeset_headless(source, self.font_size_pt)
    }
}

impl RenderEngine for HeadlessEngine {
    fn add(
        &mut self,
        fragment: usize,
        parts: &[Expression],
        world_from_fragment: Affine2,
    ) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.scene.insert(fragment, world_from_fragment);
        self.events.push(EngineEvent::Add {
            fragment,
            glyphs: parts.iter().map(Expression::len).sum(),
        });
        Ok(())
    }

    fn remove(&mut self, fragment: usize) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.scene.remove(fragment);
        self.events.push(EngineEvent::Remove { fragment });
        Ok(())
    }

    fn play(&mut self, animations: &[Animation], duration_s: f32) -> Result<(), EngineError> {
        self.ensure_available()?;
        if animations.is_empty() {
            return Ok(());
        }
        self.scene.apply(animations)?;
        self.timeline.push(animations.to_vec(), duration_s);
        self.events.push(EngineEvent::Play {
            animations: animations.len(),
            duration_s,
        });
        Ok(())
    }

    fn wait(&mut self, duration_s: f32) -> Result<(), EngineError> {
        self.ensure_available()?;
        self.timeline.wait(duration_s);
        self.events.push(EngineEvent::Wait { duration_s });
        Ok(())
    }

    fn timeline(&self) -> &Timeline {
        &self.timeline
    }
}

/// Typeset `source` with the headless layout rules.
pub fn typeset_headless(source: &str, font_size_pt: f32) -> Result<Expression, EngineError> {
    let nodes = Parser::new(source).parse()?;
    let mut out = Vec::new();
    let mut cx = LayoutCtx {
        em: font_size_pt,
        glyphs: &mut out,
    };
    cx.layout_list(&nodes, 0, 0.0, 0.0, &[]);
    Ok(Expression::new(source, out))
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Atom(String),
    Space(f32),
    Group(Vec<Node>),
    Frac(Vec<Node>, Vec<Node>),
    Script {
        base: Box<Node>,
        sup: Option<Vec<Node>>,
        sub: Option<Vec<Node>>,
    },
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::Typeset {
            input: self.input.to_string(),
            message: message.into(),
        }
    }

    fn parse(mut self) -> Result<Vec<Node>, EngineError> {
        self.parse_list(false)
    }

    fn parse_list(&mut self, in_group: bool) -> Result<Vec<Node>, EngineError> {
        let mut nodes = Vec::new();
        loop {
            let Some(&(_, c)) = self.chars.peek() else {
                if in_group {
                    return Err(self.error("unbalanced `{`"));
                }
                return Ok(nodes);
            };
            match c {
                '}' => {
                    if !in_group {
                        return Err(self.error("unexpected `}`"));
                    }
                    self.chars.next();
                    return Ok(nodes);
                }
                '^' | '_' => {
                    self.chars.next();
                    let arg = self.parse_arg()?;
                    let base = nodes.pop().unwrap_or(Node::Group(Vec::new()));
                    let node = attach_script(base, c == '^', arg)
                        .ok_or_else(|| self.error("double superscript or subscript"))?;
                    nodes.push(node);
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                _ => {
                    if let Some(node) = self.parse_token()? {
                        nodes.push(node);
                    }
                }
            }
        }
    }

    /// One token: a braced group, a command or a single character.
    fn parse_token(&mut self) -> Result<Option<Node>, EngineError> {
        let Some((_, c)) = self.chars.next() else {
            return Err(self.error("unexpected end of input"));
        };
        let node = match c {
            '{' => Node::Group(self.parse_list(true)?),
            '\\' => return self.parse_command(),
            '-' => Node::Atom("−".to_string()),
            c => Node::Atom(c.to_string()),
        };
        Ok(Some(node))
    }

    /// Argument of `^`, `_` or `\frac`: a braced group or a single token.
    fn parse_arg(&mut self) -> Result<Vec<Node>, EngineError> {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
        match self.chars.peek() {
            None => Err(self.error("missing argument")),
            Some(&(_, '{')) => {
                self.chars.next();
                self.parse_list(true)
            }
            Some(&(_, '}')) => Err(self.error("missing argument before `}`")),
            Some(_) => Ok(self.parse_token()?.into_iter().collect()),
        }
    }

    fn parse_command(&mut self) -> Result<Option<Node>, EngineError> {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        if name.is_empty() {
            // Control symbol: `\,`, `\{`, `\ ` ...
            let Some((_, c)) = self.chars.next() else {
                return Err(self.error("dangling `\\`"));
            };
            return Ok(Some(match c {
                ',' | ':' | '>' => Node::Space(0.17),
                ';' => Node::Space(0.28),
                ' ' => Node::Space(0.33),
                '!' => Node::Space(0.0),
                c => Node::Atom(c.to_string()),
            }));
        }

        let node = match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.parse_arg()?;
                let den = self.parse_arg()?;
                Node::Frac(num, den)
            }
            "text" | "mathrm" | "textbf" | "mathbf" => Node::Group(self.parse_text()?),
            "left" | "right" | "displaystyle" => return Ok(None),
            "quad" => Node::Space(1.0),
            "qquad" => Node::Space(2.0),
            "cdot" => Node::Atom("·".to_string()),
            "times" => Node::Atom("×".to_string()),
            "div" => Node::Atom("÷".to_string()),
            "pm" => Node::Atom("±".to_string()),
            "to" | "rightarrow" => Node::Atom("→".to_string()),
            other => Node::Atom(format!("\\{other}")),
        };
        Ok(Some(node))
    }

    /// Raw text inside `\text{...}`; spaces are kept as spacing.
    fn parse_text(&mut self) -> Result<Vec<Node>, EngineError> {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
        if !matches!(self.chars.next(), Some((_, '{'))) {
            return Err(self.error("`\\text` expects a braced argument"));
        }
        let mut nodes = Vec::new();
        let mut depth = 0usize;
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(self.error("unbalanced `{` in text"));
            };
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => return Ok(nodes),
                '}' => depth -= 1,
                c if c.is_whitespace() => nodes.push(Node::Space(0.33)),
                c => nodes.push(Node::Atom(c.to_string())),
            }
        }
    }
}

/// `None` when `base` already carries a script of the same kind.
fn attach_script(base: Node, is_sup: bool, arg: Vec<Node>) -> Option<Node> {
    Some(match base {
        Node::Script { base, sup, sub } => {
            if (is_sup && sup.is_some()) || (!is_sup && sub.is_some()) {
                return None;
            }
            let (sup, sub) = if is_sup { (Some(arg), sub) } else { (sup, Some(arg)) };
            Node::Script { base, sup, sub }
        }
        base => {
            let (sup, sub) = if is_sup {
                (Some(arg), None)
            } else {
                (None, Some(arg))
            };
            Node::Script {
                base: Box::new(base),
                sup,
                sub,
            }
        }
    })
}

// Metrics in em.
const ASCENT: f32 = 0.72;
const DESCENT: f32 = 0.22;
const ATOM_ADVANCE: f32 = 0.55;
const OPERATOR_ADVANCE: f32 = 0.95;
const NARROW_ADVANCE: f32 = 0.33;
const MATH_AXIS: f32 = 0.25;
const BAR_THICKNESS: f32 = 0.05;

struct LayoutCtx<'a> {
    em: f32,
    glyphs: &'a mut Vec<Glyph>,
}

impl LayoutCtx<'_> {
    /// Lay out `nodes` starting at pen `(x, baseline)`; returns the advance.
    fn layout_list(&mut self, nodes: &[Node], level: u8, x: f32, baseline: f32, path: &[u16]) -> f32 {
        let mut pen = x;
        for (i, node) in nodes.iter().enumerate() {
            let mut child_path = path.to_vec();
            child_path.push(i as u16);
            pen += self.layout_node(node, level, pen, baseline, &child_path);
        }
        pen - x
    }

    fn layout_node(&mut self, node: &Node, level: u8, x: f32, baseline: f32, path: &[u16]) -> f32 {
        let s = self.em * script_scale(level);
        match node {
            Node::Atom(symbol) => {
                let advance = advance_of(symbol) * s;
                let pad = 0.06 * s + (advance - ATOM_ADVANCE * s).max(0.0) * 0.5;
                let bbox = Aabb2::from_min_max(
                    [x + pad, baseline - ASCENT * s],
                    [x + advance - pad, baseline + DESCENT * s],
                );
                self.glyphs.push(Glyph {
                    shape: shape_key(symbol, level, 0),
                    bbox,
                    color: Rgba::WHITE,
                    group_path: path.to_vec(),
                    symbol: symbol.clone(),
                });
                advance
            }
            Node::Space(w) => w * s,
            Node::Group(children) => self.layout_list(children, level, x, baseline, path),
            Node::Frac(num, den) => {
                // Measure both parts first so they can be centered over the bar.
                let num_w = measure(num, level, self.em);
                let den_w = measure(den, level, self.em);
                let inner = num_w.max(den_w);
                let pad = 0.1 * s;
                let width = inner + 2.0 * pad;

                let axis = baseline - MATH_AXIS * s;
                let num_baseline = axis - (0.18 + DESCENT) * s;
                let den_baseline = axis + (0.18 + ASCENT) * s;

                let mut num_path = path.to_vec();
                num_path.push(0);
                self.layout_list(num, level, x + pad + (inner - num_w) * 0.5, num_baseline, &num_path);

                let mut bar_path = path.to_vec();
                bar_path.push(1);
                let half = 0.5 * BAR_THICKNESS * s;
                self.glyphs.push(Glyph {
                    shape: shape_key("frac-bar", level, (width * 100.0).round() as i64),
                    bbox: Aabb2::from_min_max([x, axis - half], [x + width, axis + half]),
                    color: Rgba::WHITE,
                    group_path: bar_path,
                    symbol: "frac-bar".to_string(),
                });

                let mut den_path = path.to_vec();
                den_path.push(2);
                self.layout_list(den, level, x + pad + (inner - den_w) * 0.5, den_baseline, &den_path);

                width
            }
            Node::Script { base, sup, sub } => {
                let mut base_path = path.to_vec();
                base_path.push(0);
                let base_w = self.layout_node(base, level, x, baseline, &base_path);
                let script_level = level.saturating_add(1);
                let mut script_w = 0.0f32;
                if let Some(sup) = sup {
                    let mut p = path.to_vec();
                    p.push(1);
                    script_w = script_w.max(self.layout_list(
                        sup,
                        script_level,
                        x + base_w,
                        baseline - 0.45 * s,
                        &p,
                    ));
                }
                if let Some(sub) = sub {
                    let mut p = path.to_vec();
                    p.push(2);
                    script_w = script_w.max(self.layout_list(
                        sub,
                        script_level,
                        x + base_w,
                        baseline + 0.25 * s,
                        &p,
                    ));
                }
                base_w + script_w
            }
        }
    }
}

fn measure(nodes: &[Node], level: u8, em: f32) -> f32 {
    let mut scratch = Vec::new();
    let mut cx = LayoutCtx {
        em,
        glyphs: &mut scratch,
    };
    cx.layout_list(nodes, level, 0.0, 0.0, &[])
}

fn script_scale(level: u8) -> f32 {
    match level {
        0 => 1.0,
        1 => 0.7,
        _ => 0.5,
    }
}

fn advance_of(symbol: &str) -> f32 {
    match symbol {
        "+" | "−" | "=" | "×" | "÷" | "·" | "±" | "<" | ">" | "→" => OPERATOR_ADVANCE,
        "(" | ")" | "[" | "]" | "." | "," | "|" | "!" | ":" | ";" => NARROW_ADVANCE,
        _ => ATOM_ADVANCE,
    }
}

fn shape_key(symbol: &str, level: u8, extra: i64) -> ShapeKey {
    let mut h = DefaultHasher::new();
    symbol.hash(&mut h);
    level.min(2).hash(&mut h);
    extra.hash(&mut h);
    ShapeKey(h.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(source: &str) -> Vec<String> {
        typeset_headless(source, 10.0)
            .unwrap()
            .glyphs()
            .iter()
            .map(|g| g.symbol.clone())
            .collect()
    }

    #[test]
    fn whitespace_is_not_a_glyph() {
        assert_eq!(
            symbols("4n - 26 = -2"),
            ["4", "n", "−", "2", "6", "=", "−", "2"]
        );
    }

    #[test]
    fn fraction_orders_numerator_bar_denominator() {
        assert_eq!(symbols(r"\frac{4}{5}x"), ["4", "frac-bar", "5", "x"]);
        let expr = typeset_headless(r"\frac{4}{5}x", 10.0).unwrap();
        let paths: Vec<_> = expr.glyphs().iter().map(|g| g.group_path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted, "glyph order is depth-first");
        // Numerator sits above the bar, denominator below.
        let g = expr.glyphs();
        assert!(g[0].bbox.max[1] < g[1].bbox.min[1]);
        assert!(g[2].bbox.min[1] > g[1].bbox.max[1]);
    }

    #[test]
    fn scripts_change_shape() {
        let expr = typeset_headless("x_x", 10.0).unwrap();
        assert_eq!(expr.len(), 2);
        assert!(!expr.glyphs()[0].same_shape(&expr.glyphs()[1]));

        let plain = typeset_headless("xx", 10.0).unwrap();
        assert!(plain.glyphs()[0].same_shape(&plain.glyphs()[1]));
    }

    #[test]
    fn superscript_and_subscript_share_a_base() {
        assert_eq!(symbols("x^{2}_{1}"), ["x", "2", "1"]);
        let expr = typeset_headless("x^{2}_{1}", 10.0).unwrap();
        let g = expr.glyphs();
        assert!(g[1].bbox.max[1] < g[2].bbox.max[1], "superscript sits higher");
        assert!((g[1].bbox.min[0] - g[2].bbox.min[0]).abs() < 1e-4, "scripts stack");
        assert!(!g[1].same_shape(&typeset_headless("2", 10.0).unwrap().glyphs()[0]));

        assert!(matches!(
            typeset_headless("x^{2}^{3}", 10.0),
            Err(EngineError::Typeset { .. })
        ));
        assert!(typeset_headless("x_1_2", 10.0).is_err());
    }

    #[test]
    fn commands_and_text() {
        assert_eq!(symbols(r"\div 4"), ["÷", "4"]);
        assert_eq!(symbols(r"\text{Step 1:}"), ["S", "t", "e", "p", "1", ":"]);
        assert_eq!(symbols(r"\left( x \right)"), ["(", "x", ")"]);
    }

    #[test]
    fn unbalanced_braces_fail() {
        assert!(matches!(
            typeset_headless(r"\frac{1}{2", 10.0),
            Err(EngineError::Typeset { .. })
        ));
        assert!(typeset_headless("x}", 10.0).is_err());
        assert!(typeset_headless("x^", 10.0).is_err());
    }

    #[test]
    fn glyphs_advance_left_to_right() {
        let expr = typeset_headless("12 + 3", 10.0).unwrap();
        let xs: Vec<f32> = expr.glyphs().iter().map(|g| g.bbox.min[0]).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "{xs:?}");
    }

    #[test]
    fn play_requires_fragment_in_scene() {
        let mut engine = HeadlessEngine::default();
        let err = engine
            .play(&[Animation::write(crate::anim::AnimTarget::fragment(0))], 1.0)
            .unwrap_err();
        assert!(matches!(err, EngineError::Playback(_)));

        engine.add(0, &[], Affine2::IDENTITY).unwrap();
        engine
            .play(&[Animation::write(crate::anim::AnimTarget::fragment(0))], 1.0)
            .unwrap();
        assert_eq!(engine.timeline().clock_s(), 1.0);
    }

    #[test]
    fn unavailable_engine_refuses_everything() {
        let mut engine = HeadlessEngine::unavailable();
        assert!(matches!(engine.typeset("x"), Err(EngineError::Unavailable(_))));
        assert!(engine.wait(1.0).is_err());
    }
}
