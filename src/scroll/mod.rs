//! Scroll manager: an ordered sequence of display fragments revealed one at a time.
//!
//! The manager owns a cursor into the [`FragmentSequence`]. Everything before the
//! cursor is revealed; a contiguous window of revealed fragments is visible. Reveals
//! only ever happen at the cursor, and scrolling shifts older fragments up and out of
//! the viewport without destroying them, so a scrolled-off fragment can still be the
//! source of a copy-transform.
//!
//! All operations run in the order they are called and each `play` on the engine
//! completes before the next operation starts.

mod fragment;

pub use fragment::{DisplayFragment, FragmentLayout, FragmentSequence};

use std::collections::BTreeSet;
use std::ops::Range;

use crate::anim::{AnimTarget, Animation, AnimationKind};
use crate::engine::{Expression, RenderEngine};
use crate::error::{Error, Result};
use crate::scene::{Aabb2, Affine2, Rgba};
use crate::style::{Reveal, TutorialStyle};

/// Addresses a fragment by index or by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentRef {
    Index(usize),
    Label(String),
}

impl From<usize> for FragmentRef {
    fn from(index: usize) -> Self {
        FragmentRef::Index(index)
    }
}

impl From<&str> for FragmentRef {
    fn from(label: &str) -> Self {
        FragmentRef::Label(label.to_string())
    }
}

impl From<String> for FragmentRef {
    fn from(label: String) -> Self {
        FragmentRef::Label(label)
    }
}

pub struct ScrollManager<E> {
    engine: E,
    style: TutorialStyle,
    sequence: FragmentSequence,
    cursor: usize,
    window_start: usize,
    dismissed: BTreeSet<usize>,
}

impl<E: RenderEngine> ScrollManager<E> {
    pub fn new(engine: E, style: TutorialStyle) -> Self {
        let sequence = FragmentSequence::new(style.viewport_top_pt, style.fragment_gap_pt);
        Self {
            engine,
            style,
            sequence,
            cursor: 0,
            window_start: 0,
            dismissed: BTreeSet::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn style(&self) -> &TutorialStyle {
        &self.style
    }

    pub fn sequence(&self) -> &FragmentSequence {
        &self.sequence
    }

    pub fn fragment(&self, index: usize) -> Option<&DisplayFragment> {
        self.sequence.get(index)
    }

    /// Number of revealed fragments; the index of the next one to reveal.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_revealed(&self, index: usize) -> bool {
        index < self.cursor
    }

    /// Indices of the fragments currently inside the viewport.
    pub fn visible(&self) -> Range<usize> {
        self.window_start..self.cursor
    }

    pub fn is_dismissed(&self, index: usize) -> bool {
        self.dismissed.contains(&index)
    }

    /// Amount the content has been scrolled up, in pt.
    pub fn scroll_offset_pt(&self) -> f32 {
        self.sequence.top_of(self.window_start) - self.style.viewport_top_pt
    }

    /// Placement of fragment `index` in scene coordinates (current scroll applied).
    pub fn world_from_fragment(&self, index: usize) -> Affine2 {
        let top = self.sequence.top_of(index);
        let x = self
            .sequence
            .get(index)
            .map(|f| f.anchor()[0])
            .unwrap_or(0.0);
        Affine2::translate(x, top - self.scroll_offset_pt())
    }

    /// Scene-space bounds of fragment `index`.
    pub fn world_bbox(&self, index: usize) -> Aabb2 {
        match self.sequence.get(index) {
            Some(f) => self.world_from_fragment(index).transform_aabb(f.bbox()),
            None => Aabb2::empty(),
        }
    }

    /// Scene-space bounds of a fragment, one of its parts, or a glyph range.
    pub fn target_bbox(&self, target: &AnimTarget) -> Aabb2 {
        let index = target.fragment_index();
        let Some(fragment) = self.sequence.get(index) else {
            return Aabb2::empty();
        };
        let world = self.world_from_fragment(index);
        let (part, range) = match target {
            AnimTarget::Fragment(_) => return world.transform_aabb(fragment.bbox()),
            AnimTarget::Part { part, .. } => (*part, None),
            AnimTarget::Glyphs { part, range, .. } => (*part, Some(*range)),
        };
        let Some(expr) = fragment.part(part) else {
            return Aabb2::empty();
        };
        let local = match range {
            Some(range) => expr.range_bbox(range),
            None => expr.bbox(),
        };
        world
            .mul(fragment.fragment_from_part(part))
            .transform_aabb(local)
    }

    pub fn resolve(&self, target: impl Into<FragmentRef>) -> Result<usize> {
        match target.into() {
            FragmentRef::Label(label) => self.sequence.index_of(&label),
            FragmentRef::Index(index) if index < self.sequence.len() => Ok(index),
            FragmentRef::Index(index) => Err(Error::UnknownFragmentLabel(format!("#{index}"))),
        }
    }

    /// Append an already-built fragment. Declaring never reveals.
    pub fn declare(&mut self, fragment: DisplayFragment) -> usize {
        let index = self.sequence.push(fragment);
        log::debug!("declared fragment {index} ({:?})", self.sequence.get(index).and_then(|f| f.label()));
        index
    }

    /// Bundle `parts` left to right into one fragment.
    pub fn create_step(&mut self, parts: Vec<Expression>, label: Option<&str>) -> usize {
        let mut fragment = DisplayFragment::row(parts, self.style.part_gap_pt);
        if let Some(label) = label {
            fragment = fragment.with_label(label);
        }
        self.declare(fragment)
    }

    /// Bundle `parts` top to bottom (an equation over its annotation row).
    pub fn construct_step(&mut self, parts: Vec<Expression>, label: Option<&str>) -> usize {
        let mut fragment = DisplayFragment::stack(parts, self.style.fragment_gap_pt * 0.5);
        if let Some(label) = label {
            fragment = fragment.with_label(label);
        }
        self.declare(fragment)
    }

    /// Bundle `parts` on one baseline, part `i` centered on `centers_pt[i]`.
    pub fn align_step(&mut self, parts: Vec<Expression>, centers_pt: &[f32], label: Option<&str>) -> usize {
        let mut fragment = DisplayFragment::aligned(parts, centers_pt);
        if let Some(label) = label {
            fragment = fragment.with_label(label);
        }
        self.declare(fragment)
    }

    /// Reveal the next `steps` fragments, or every fragment up to and including
    /// `target`. Returns how many were revealed; past the end is a silent no-op.
    pub fn prepare_next(&mut self, target: Option<FragmentRef>, steps: usize) -> Result<usize> {
        let end = match target {
            Some(target) => (self.resolve(target)? + 1).max(self.cursor),
            None => self.cursor.saturating_add(steps).min(self.sequence.len()),
        };
        let mut revealed = 0;
        while self.cursor < end {
            let index = self.cursor;
            let animation = match self.style.reveal {
                Reveal::Write => Animation::write(AnimTarget::Fragment(index)),
                Reveal::FadeIn => Animation::fade_in(AnimTarget::Fragment(index), None),
            };
            let duration = match self.style.reveal {
                Reveal::Write => self.style.timings.write_s,
                Reveal::FadeIn => self.style.timings.fade_s,
            };
            self.reveal_with(index, vec![animation], duration)?;
            revealed += 1;
        }
        Ok(revealed)
    }

    /// Reveal the fragment at the cursor with caller-supplied animations.
    ///
    /// Every animation must target the revealed fragment or an already revealed one,
    /// and every transform source must already be revealed.
    pub fn reveal_with(
        &mut self,
        target: impl Into<FragmentRef>,
        animations: Vec<Animation>,
        duration_s: f32,
    ) -> Result<()> {
        let index = self.resolve(target)?;
        if index != self.cursor {
            return Err(Error::OutOfOrder {
                expected: self.cursor,
                got: index,
            });
        }
        for anim in &animations {
            let f = anim.target.fragment_index();
            if f != index {
                self.ensure_revealed(f)?;
            }
            if let Some(source) = transform_source(&anim.kind) {
                self.ensure_revealed(source.fragment_index())?;
            }
        }

        if self.style.auto_scroll {
            self.fit_window(index)?;
        }

        let parts = self
            .sequence
            .get(index)
            .map(|f| f.parts().to_vec())
            .unwrap_or_default();
        let placement = self.world_from_fragment(index);
        self.engine.add(index, &parts, placement)?;
        self.engine.play(&animations, duration_s)?;
        self.cursor += 1;
        log::debug!("revealed fragment {index}; visible {:?}", self.visible());
        Ok(())
    }

    /// Reveal `target` as a morphing copy of the already revealed `source`.
    pub fn transform_from_copy(
        &mut self,
        source: impl Into<FragmentRef>,
        target: impl Into<FragmentRef>,
    ) -> Result<()> {
        let source = self.resolve(source)?;
        let target = self.resolve(target)?;
        self.ensure_revealed(source)?;
        let animation =
            Animation::transform_from_copy(AnimTarget::Fragment(source), AnimTarget::Fragment(target));
        self.reveal_with(target, vec![animation], self.style.timings.transform_s)
    }

    /// Reveal `target` fading in from where `source` sits on screen.
    pub fn fade_in_from_target(
        &mut self,
        source: impl Into<FragmentRef>,
        target: impl Into<FragmentRef>,
    ) -> Result<()> {
        let source = self.resolve(source)?;
        let target = self.resolve(target)?;
        self.ensure_revealed(source)?;
        let from = self.world_bbox(source).center();
        let animation = Animation::fade_in(AnimTarget::Fragment(target), Some(from));
        self.reveal_with(target, vec![animation], self.style.timings.fade_s)
    }

    /// Scroll the visible window down by `steps` fragments. Returns how many scrolled.
    pub fn scroll_down(&mut self, steps: usize) -> Result<usize> {
        let new_start = self.window_start.saturating_add(steps).min(self.cursor);
        self.scroll_window_to(new_start)
    }

    /// Scroll until `target` is the top visible fragment.
    pub fn scroll_down_to(&mut self, target: impl Into<FragmentRef>) -> Result<usize> {
        let index = self.resolve(target)?;
        self.scroll_window_to(index.min(self.cursor))
    }

    /// Highlight revealed targets without revealing anything.
    pub fn indicate(&mut self, targets: &[AnimTarget], color: Rgba) -> Result<()> {
        for t in targets {
            self.ensure_revealed(t.fragment_index())?;
        }
        let animations: Vec<Animation> = targets
            .iter()
            .cloned()
            .map(|t| Animation::indicate(t, color))
            .collect();
        self.engine.play(&animations, self.style.timings.indicate_s)?;
        Ok(())
    }

    /// Play arbitrary animations on revealed fragments.
    pub fn play(&mut self, animations: Vec<Animation>, duration_s: f32) -> Result<()> {
        for anim in &animations {
            self.ensure_revealed(anim.target.fragment_index())?;
            if let Some(source) = transform_source(&anim.kind) {
                self.ensure_revealed(source.fragment_index())?;
            }
        }
        self.engine.play(&animations, duration_s)?;
        Ok(())
    }

    /// Fade a revealed fragment out and drop it from the scene. Its slot stays.
    pub fn fade_out(&mut self, target: impl Into<FragmentRef>) -> Result<()> {
        let index = self.resolve(target)?;
        self.ensure_revealed(index)?;
        if !self.dismissed.insert(index) {
            return Ok(());
        }
        self.engine.play(
            &[Animation::new(AnimTarget::Fragment(index), AnimationKind::FadeOut)],
            self.style.timings.fade_s,
        )?;
        self.engine.remove(index)?;
        Ok(())
    }

    /// Advance the scene clock.
    pub fn wait(&mut self, duration_s: f32) -> Result<()> {
        self.engine.wait(duration_s)?;
        Ok(())
    }

    fn ensure_revealed(&self, index: usize) -> Result<()> {
        if self.is_revealed(index) && !self.dismissed.contains(&index) {
            Ok(())
        } else {
            Err(Error::SourceNotVisible {
                fragment: index,
                cursor: self.cursor,
            })
        }
    }

    /// Scroll so that `target` will fit the viewport once revealed (auto-scroll only).
    ///
    /// Reveals do this themselves; call it first when animation geometry (like a
    /// fade-in origin) must be computed in the post-scroll layout.
    pub fn make_room(&mut self, target: impl Into<FragmentRef>) -> Result<usize> {
        let index = self.resolve(target)?;
        if !self.style.auto_scroll || index != self.cursor {
            return Ok(0);
        }
        self.fit_window(index)
    }

    /// Drop fragments off the top until `window_start..=index` fits the viewport.
    fn fit_window(&mut self, index: usize) -> Result<usize> {
        let mut start = self.window_start;
        while start < index && self.sequence.extent(start, index + 1) > self.style.viewport_height_pt {
            start += 1;
        }
        self.scroll_window_to(start)
    }

    fn scroll_window_to(&mut self, new_start: usize) -> Result<usize> {
        if new_start <= self.window_start {
            return Ok(0);
        }
        let dy = self.sequence.top_of(new_start) - self.sequence.top_of(self.window_start);
        // Scrolled-off fragments stay in the scene, so they move too.
        let shifted: Vec<Animation> = (0..self.cursor)
            .filter(|i| !self.dismissed.contains(i))
            .map(|i| Animation::shift(AnimTarget::Fragment(i), -dy))
            .collect();
        let scrolled = new_start - self.window_start;
        log::debug!(
            "scroll {} fragment(s): window {}..{} -> {}..{} ({dy:.1}pt)",
            scrolled,
            self.window_start,
            self.cursor,
            new_start,
            self.cursor
        );
        self.engine.play(&shifted, self.style.timings.scroll_s)?;
        self.window_start = new_start;
        Ok(scrolled)
    }
}

fn transform_source(kind: &AnimationKind) -> Option<&AnimTarget> {
    match kind {
        AnimationKind::TransformFromCopy { source } | AnimationKind::ReplacementTransform { source } => {
            Some(source)
        }
        _ => None,
    }
}
