//! Tutorial driver: executes annotated plans against a [`ScrollManager`], paced by
//! narration.
//!
//! The driver is the only orchestrator. For every step it starts a voiceover, then
//! runs the step's cues in order; a bookmark cue blocks (advances the scene clock)
//! until the narration reaches it, so reveals and narration form one total order.

use serde::Serialize;

use crate::anim::{AnimTarget, Animation};
use crate::annotate::{Cue, Effect, FragmentTarget, StepAnnotator, StepPlan, TutorialPlan};
use crate::engine::RenderEngine;
use crate::error::{Error, Result};
use crate::linear::{Outcome, solve_with_precision};
use crate::scroll::{FragmentLayout, ScrollManager};

/// Handle on one running voiceover.
pub trait Tracker {
    /// Seconds from the start of the voiceover at which bookmark `name` is spoken.
    fn wait_for_bookmark(&mut self, name: &str) -> Result<f32>;

    /// Spoken length of the whole voiceover.
    fn duration_s(&self) -> f32;
}

/// Speech collaborator. The core never speaks; it only consumes bookmark timings.
pub trait Narrator {
    type Tracker<'a>: Tracker
    where
        Self: 'a;

    /// Start speaking `text` (with `<bookmark mark="..."/>` markers) at scene time `clock_s`.
    fn voiceover(&mut self, text: &str, clock_s: f32) -> Result<Self::Tracker<'_>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NarrationEvent {
    Voiceover {
        text: String,
        start_s: f32,
        duration_s: f32,
    },
    Bookmark {
        name: String,
        at_s: f32,
    },
    Finished {
        at_s: f32,
    },
}

/// Deterministic narrator: speech time is proportional to the word count.
#[derive(Debug, Clone)]
pub struct ScriptedNarrator {
    words_per_minute: f32,
    events: Vec<NarrationEvent>,
}

impl Default for ScriptedNarrator {
    fn default() -> Self {
        Self::new(150.0)
    }
}

impl ScriptedNarrator {
    pub fn new(words_per_minute: f32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1.0),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[NarrationEvent] {
        &self.events
    }

    fn seconds_for(&self, words: usize) -> f32 {
        words as f32 * 60.0 / self.words_per_minute
    }
}

pub struct ScriptedTracker<'a> {
    narrator: &'a mut ScriptedNarrator,
    start_s: f32,
    duration_s: f32,
    marks: Vec<(String, f32)>,
}

impl Narrator for ScriptedNarrator {
    type Tracker<'a> = ScriptedTracker<'a>;

    fn voiceover(&mut self, text: &str, clock_s: f32) -> Result<ScriptedTracker<'_>> {
        let script = parse_bookmarks(text);
        let duration_s = self.seconds_for(script.words);
        let marks = script
            .marks
            .into_iter()
            .map(|(name, words)| (name, self.seconds_for(words)))
            .collect();
        log::debug!("voiceover at {clock_s:.2}s ({duration_s:.2}s): {}", script.plain);
        self.events.push(NarrationEvent::Voiceover {
            text: script.plain,
            start_s: clock_s,
            duration_s,
        });
        Ok(ScriptedTracker {
            narrator: self,
            start_s: clock_s,
            duration_s,
            marks,
        })
    }
}

impl Tracker for ScriptedTracker<'_> {
    fn wait_for_bookmark(&mut self, name: &str) -> Result<f32> {
        let Some(&(_, offset)) = self.marks.iter().find(|(n, _)| n == name) else {
            return Err(Error::UnknownBookmark(name.to_string()));
        };
        self.narrator.events.push(NarrationEvent::Bookmark {
            name: name.to_string(),
            at_s: self.start_s + offset,
        });
        Ok(offset)
    }

    fn duration_s(&self) -> f32 {
        self.duration_s
    }
}

impl Drop for ScriptedTracker<'_> {
    fn drop(&mut self) {
        self.narrator.events.push(NarrationEvent::Finished {
            at_s: self.start_s + self.duration_s,
        });
    }
}

/// Narration text with bookmark markers removed, plus the word offset of each marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub plain: String,
    pub words: usize,
    pub marks: Vec<(String, usize)>,
}

pub fn parse_bookmarks(text: &str) -> Script {
    const OPEN: &str = "<bookmark mark=";
    let mut plain = String::new();
    let mut marks = Vec::new();
    let mut rest = text;
    while let Some(at) = rest.find(OPEN) {
        plain.push_str(&rest[..at]);
        let after = &rest[at + OPEN.len()..];
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'');
        let parsed = quote.and_then(|q| {
            let body = &after[1..];
            let end = body.find(q)?;
            let close = body[end + 1..].find("/>")?;
            Some((body[..end].to_string(), end + 1 + close + 2 + 1))
        });
        match parsed {
            Some((name, consumed)) => {
                marks.push((name, plain.split_whitespace().count()));
                rest = &after[consumed..];
            }
            None => {
                // Not a marker after all; keep it as text.
                plain.push_str(OPEN);
                rest = after;
            }
        }
    }
    plain.push_str(rest);
    let plain = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    let words = plain.split_whitespace().count();
    Script { plain, words, marks }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub revealed: usize,
    pub clock_s: f32,
    pub outcome: Outcome,
}

pub struct TutorialDriver<E, N> {
    scroll: ScrollManager<E>,
    narrator: N,
}

impl<E: RenderEngine, N: Narrator> TutorialDriver<E, N> {
    pub fn new(scroll: ScrollManager<E>, narrator: N) -> Self {
        Self { scroll, narrator }
    }

    pub fn scroll(&self) -> &ScrollManager<E> {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollManager<E> {
        &mut self.scroll
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    pub fn into_parts(self) -> (ScrollManager<E>, N) {
        (self.scroll, self.narrator)
    }

    /// Solve `input`, annotate it with this driver's engine and run the plan.
    pub fn solve_and_run(&mut self, input: &str) -> Result<RunReport> {
        let style = self.scroll.style().clone();
        let solution = solve_with_precision(input, style.solution_precision)?;
        let plan = StepAnnotator::new(style).annotate(self.scroll.engine_mut(), &solution)?;
        self.run(&plan)
    }

    /// Declare every fragment of `plan`, then run its steps in order.
    pub fn run(&mut self, plan: &TutorialPlan) -> Result<RunReport> {
        for fragment in &plan.fragments {
            let parts = fragment.parts.clone();
            match fragment.layout {
                FragmentLayout::Row => self.scroll.create_step(parts, Some(&fragment.label)),
                FragmentLayout::Stack => self.scroll.construct_step(parts, Some(&fragment.label)),
                FragmentLayout::Aligned => {
                    self.scroll
                        .align_step(parts, &fragment.centers_pt, Some(&fragment.label))
                }
            };
        }
        log::info!(
            "running tutorial for {:?}: {} step(s)",
            plan.equation,
            plan.steps.len()
        );
        for step in &plan.steps {
            self.run_step(step)?;
        }
        Ok(RunReport {
            revealed: self.scroll.cursor(),
            clock_s: self.scroll.engine().timeline().clock_s(),
            outcome: plan.outcome.clone(),
        })
    }

    fn run_step(&mut self, step: &StepPlan) -> Result<()> {
        let Self { scroll, narrator } = self;
        let start_s = scroll.engine().timeline().clock_s();
        let mut tracker = narrator.voiceover(&step.narration, start_s)?;
        for cue in &step.cues {
            run_cue(scroll, &mut tracker, start_s, cue)?;
        }
        // Let the voiceover finish before the next step starts.
        wait_until(scroll, start_s + tracker.duration_s())?;
        log::debug!("step {} done at {:.2}s", step.number, scroll.engine().timeline().clock_s());
        Ok(())
    }
}

fn run_cue<E: RenderEngine, T: Tracker>(
    scroll: &mut ScrollManager<E>,
    tracker: &mut T,
    start_s: f32,
    cue: &Cue,
) -> Result<()> {
    match cue {
        Cue::Bookmark(name) => {
            let offset = tracker.wait_for_bookmark(name)?;
            wait_until(scroll, start_s + offset)
        }
        Cue::Highlight { targets, color } => {
            let targets = targets
                .iter()
                .map(|t| resolve_target(scroll, t))
                .collect::<Result<Vec<_>>>()?;
            if targets.is_empty() {
                return Ok(());
            }
            scroll.indicate(&targets, *color)
        }
        Cue::Reveal {
            fragment,
            effects,
            duration_s,
        } => {
            // Scroll first so fade-in origins use the final layout.
            scroll.make_room(fragment.as_str())?;
            let animations = effects
                .iter()
                .map(|e| effect_animation(scroll, e))
                .collect::<Result<Vec<_>>>()?;
            scroll.reveal_with(fragment.as_str(), animations, *duration_s)
        }
        Cue::Pause(seconds) => scroll.wait(*seconds),
    }
}

fn wait_until<E: RenderEngine>(scroll: &mut ScrollManager<E>, at_s: f32) -> Result<()> {
    let now = scroll.engine().timeline().clock_s();
    if at_s > now {
        scroll.wait(at_s - now)?;
    }
    Ok(())
}

fn resolve_target<E: RenderEngine>(scroll: &ScrollManager<E>, target: &FragmentTarget) -> Result<AnimTarget> {
    let fragment = scroll.resolve(target.fragment.as_str())?;
    Ok(match target.range {
        Some(range) => AnimTarget::glyphs(fragment, target.part, range),
        None => AnimTarget::Fragment(fragment),
    })
}

fn effect_animation<E: RenderEngine>(scroll: &ScrollManager<E>, effect: &Effect) -> Result<Animation> {
    Ok(match effect {
        Effect::Write(target) => Animation::write(resolve_target(scroll, target)?),
        Effect::FadeIn { target, from } => {
            let from = match from {
                Some(source) => Some(scroll.target_bbox(&resolve_target(scroll, source)?).center()),
                None => None,
            };
            Animation::fade_in(resolve_target(scroll, target)?, from)
        }
        Effect::TransformFromCopy { source, target } => {
            Animation::transform_from_copy(resolve_target(scroll, source)?, resolve_target(scroll, target)?)
        }
        Effect::ReplacementTransform { source, target } => {
            Animation::replacement_transform(resolve_target(scroll, source)?, resolve_target(scroll, target)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookmarks_are_stripped_and_counted() {
        let s = parse_bookmarks(r#"Step 1: <bookmark mark="a"/>Add 26 to both sides. <bookmark mark='b'/>Done."#);
        assert_eq!(s.plain, "Step 1: Add 26 to both sides. Done.");
        assert_eq!(s.marks, vec![("a".to_string(), 2), ("b".to_string(), 7)]);
        assert_eq!(s.words, 8);
    }

    #[test]
    fn malformed_marker_stays_text() {
        let s = parse_bookmarks("say <bookmark mark=oops and more");
        assert!(s.marks.is_empty());
        assert_eq!(s.plain, "say <bookmark mark=oops and more");
    }

    #[test]
    fn tracker_reports_offsets_and_finishes_on_drop() {
        let mut narrator = ScriptedNarrator::new(60.0);
        {
            let mut t = narrator
                .voiceover(r#"one two <bookmark mark="x"/>three"#, 10.0)
                .unwrap();
            assert_eq!(t.wait_for_bookmark("x").unwrap(), 2.0);
            assert_eq!(t.duration_s(), 3.0);
            assert!(matches!(t.wait_for_bookmark("nope"), Err(Error::UnknownBookmark(_))));
        }
        assert_eq!(
            narrator.events()[1..],
            [
                NarrationEvent::Bookmark {
                    name: "x".to_string(),
                    at_s: 12.0
                },
                NarrationEvent::Finished { at_s: 13.0 },
            ]
        );
    }
}
