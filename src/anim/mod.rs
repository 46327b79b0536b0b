//! Animation vocabulary and the played-animation timeline.
//!
//! The core never draws. It describes animations (write, fade, transform, indicate,
//! grow-arrow, shift, recolor) and hands them to the rendering engine's `play`.
//! Every `play` call is a suspension point: it blocks until the engine reports the
//! animation complete, and the engine appends one [`PlayedAnimation`] to its
//! [`Timeline`] on the scene clock.
//!
//! Animations passed to one `play` call run in parallel; calls run one after
//! another. A target is a whole fragment, one of its parts, or a glyph range, so a
//! tutorial can move one term and leave the rest of its equation alone.
//!
//! ```ignore
//! use stepcast::anim::{Animation, AnimTarget};
//! engine.play(&[Animation::write(AnimTarget::fragment(3))], 1.0)?;
//! ```

use serde::Serialize;

use crate::engine::GlyphRange;
use crate::scene::Rgba;

/// Easing curve applied to an animation's progress in `[0, 1]`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    #[default]
    InOutCubic,
}

impl Ease {
    #[inline]
    pub fn sample(self, x: f32) -> f32 {
        let t = x.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InQuad => t * t,
            Ease::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            Ease::InCubic => t * t * t,
            Ease::OutCubic => 1.0 - (1.0 - t).powi(3),
            Ease::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
        }
    }
}

/// Identifies what in the scene an animation applies to.
///
/// Fragments are addressed by their index in the fragment sequence; a fragment bundles
/// one or more expressions ("parts").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AnimTarget {
    /// A whole fragment, every part.
    Fragment(usize),
    /// One expression inside a fragment.
    Part { fragment: usize, part: usize },
    /// A glyph range inside one expression of a fragment.
    Glyphs {
        fragment: usize,
        part: usize,
        range: GlyphRange,
    },
}

impl AnimTarget {
    #[inline]
    pub fn fragment(index: usize) -> Self {
        AnimTarget::Fragment(index)
    }

    #[inline]
    pub fn glyphs(fragment: usize, part: usize, range: GlyphRange) -> Self {
        AnimTarget::Glyphs {
            fragment,
            part,
            range,
        }
    }

    /// Fragment index this target lives in.
    pub fn fragment_index(&self) -> usize {
        match self {
            AnimTarget::Fragment(f)
            | AnimTarget::Part { fragment: f, .. }
            | AnimTarget::Glyphs { fragment: f, .. } => *f,
        }
    }
}

/// The animation primitive requested from the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AnimationKind {
    /// Stroke-then-fill reveal.
    Write,
    /// Fade in at the target's anchor. `from` is the point the copy originates from.
    FadeIn { from: Option<[f32; 2]> },
    FadeOut,
    /// Morph a copy of `source` into the target; the source stays in place.
    TransformFromCopy { source: AnimTarget },
    /// Morph `source` into the target; the source is consumed.
    ReplacementTransform { source: AnimTarget },
    /// Briefly scale and tint the target.
    Indicate { color: Rgba },
    /// Move the target vertically by `dy` pt.
    Shift { dy: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Animation {
    pub target: AnimTarget,
    pub kind: AnimationKind,
    pub ease: Ease,
}

impl Animation {
    #[inline]
    pub fn new(target: AnimTarget, kind: AnimationKind) -> Self {
        Self {
            target,
            kind,
            ease: Ease::default(),
        }
    }

    #[inline]
    pub fn write(target: AnimTarget) -> Self {
        Self::new(target, AnimationKind::Write)
    }

    #[inline]
    pub fn fade_in(target: AnimTarget, from: Option<[f32; 2]>) -> Self {
        Self::new(target, AnimationKind::FadeIn { from })
    }

    #[inline]
    pub fn transform_from_copy(source: AnimTarget, target: AnimTarget) -> Self {
        Self::new(target, AnimationKind::TransformFromCopy { source })
    }

    #[inline]
    pub fn replacement_transform(source: AnimTarget, target: AnimTarget) -> Self {
        Self::new(target, AnimationKind::ReplacementTransform { source })
    }

    #[inline]
    pub fn indicate(target: AnimTarget, color: Rgba) -> Self {
        Self::new(target, AnimationKind::Indicate { color })
    }

    #[inline]
    pub fn shift(target: AnimTarget, dy: f32) -> Self {
        Self::new(target, AnimationKind::Shift { dy })
    }

    #[inline]
    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }
}

/// One completed `play` call on the scene clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayedAnimation {
    pub start_s: f32,
    pub duration_s: f32,
    /// Animations that ran in parallel during this call.
    pub animations: Vec<Animation>,
}

/// Sequential record of played animations and waits.
///
/// The scene clock only moves forward: `play` and `wait` both append.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Timeline {
    pub played: Vec<PlayedAnimation>,
    clock_s: f32,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scene time in seconds.
    #[inline]
    pub fn clock_s(&self) -> f32 {
        self.clock_s
    }

    /// Append one `play` call; all animations share the same start and duration.
    pub fn push(&mut self, animations: Vec<Animation>, duration_s: f32) -> &PlayedAnimation {
        let duration_s = duration_s.max(0.0);
        let idx = self.played.len();
        self.played.push(PlayedAnimation {
            start_s: self.clock_s,
            duration_s,
            animations,
        });
        self.clock_s += duration_s;
        &self.played[idx]
    }

    /// Advance the clock without animating.
    pub fn wait(&mut self, duration_s: f32) {
        self.clock_s += duration_s.max(0.0);
    }
}
