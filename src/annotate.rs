//! Step annotator: turns a [`Solution`] into a declarative tutorial plan.
//!
//! The plan lists every fragment to declare (in vertical order) and, per step, the
//! narration text plus a sequence of cues. Cues address fragments by label, so a plan
//! can be built, inspected or serialized before any scene exists. Nothing here plays
//! an animation; [`crate::driver::TutorialDriver`] executes plans.
//!
//! Per step the cues are: highlight the terms being acted on, show the operation under
//! both sides, show the "Step n" label, then reveal the new equation with variable
//! terms morphing out of the previous equation and new constants fading in.

use std::ops::Range;

use serde::Serialize;

use crate::colorize::Colorizer;
use crate::engine::{Expression, GlyphRange, Typesetter};
use crate::error::Result;
use crate::linear::{LinearEquation, Outcome, Side, Solution, Step, StepKind, SubstringSlices, TermSlice};
use crate::scene::Rgba;
use crate::scroll::FragmentLayout;
use crate::style::{Reveal, TutorialStyle};

/// Where a cue applies: a whole fragment, or a glyph range inside one of its parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentTarget {
    pub fragment: String,
    pub part: usize,
    pub range: Option<GlyphRange>,
}

impl FragmentTarget {
    pub fn whole(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            part: 0,
            range: None,
        }
    }

    pub fn glyphs(fragment: impl Into<String>, part: usize, range: GlyphRange) -> Self {
        Self {
            fragment: fragment.into(),
            part,
            range: Some(range),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Effect {
    Write(FragmentTarget),
    FadeIn {
        target: FragmentTarget,
        from: Option<FragmentTarget>,
    },
    TransformFromCopy {
        source: FragmentTarget,
        target: FragmentTarget,
    },
    /// Morph `source` into `target`; `source` does not stay behind.
    ReplacementTransform {
        source: FragmentTarget,
        target: FragmentTarget,
    },
}

/// Where a new equation's constant terms come from.
#[derive(Debug, Clone, Copy)]
enum Constants<'a> {
    /// Fade in, from the annotation row when there is one.
    FadeFrom(Option<&'a FragmentTarget>),
    /// The previous equation's constant turns into the new one.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cue {
    /// Block until the narration reaches this bookmark.
    Bookmark(String),
    Highlight {
        targets: Vec<FragmentTarget>,
        color: Rgba,
    },
    /// Reveal the named fragment; it must be the next one in sequence order.
    Reveal {
        fragment: String,
        effects: Vec<Effect>,
        duration_s: f32,
    },
    Pause(f32),
}

/// A fragment to declare before the plan runs.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFragment {
    pub label: String,
    pub layout: FragmentLayout,
    /// Typesetting source of each part.
    pub sources: Vec<String>,
    /// Horizontal center of each part, for [`FragmentLayout::Aligned`] only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub centers_pt: Vec<f32>,
    #[serde(skip)]
    pub parts: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepPlan {
    /// 0 for the introduction, then 1-based step numbers.
    pub number: usize,
    pub kind: Option<StepKind>,
    /// Narration with `<bookmark mark="..."/>` markers.
    pub narration: String,
    pub cues: Vec<Cue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TutorialPlan {
    pub equation: String,
    pub fragments: Vec<PlannedFragment>,
    pub steps: Vec<StepPlan>,
    pub outcome: Outcome,
}

impl TutorialPlan {
    pub fn fragment(&self, label: &str) -> Option<&PlannedFragment> {
        self.fragments.iter().find(|f| f.label == label)
    }
}

/// A term of a shown equation and where its glyphs are, if found.
#[derive(Debug, Clone)]
struct Located {
    slice: TermSlice,
    range: Option<GlyphRange>,
}

/// The last equation on screen.
struct Shown {
    label: String,
    equation: String,
    terms: Vec<Located>,
}

pub struct StepAnnotator {
    style: TutorialStyle,
}

impl StepAnnotator {
    pub fn new(style: TutorialStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &TutorialStyle {
        &self.style
    }

    pub fn annotate<T: Typesetter>(&self, typesetter: T, solution: &Solution) -> Result<TutorialPlan> {
        let mut colorizer = Colorizer::new(typesetter);
        let mut fragments = Vec::new();
        let mut steps = Vec::new();
        let timings = &self.style.timings;

        let (expr, terms) = self.equation_expression(&mut colorizer, &solution.input, &solution.input_latex)?;
        fragments.push(planned("equation", solution.input_latex.clone(), expr));
        steps.push(StepPlan {
            number: 0,
            kind: None,
            narration: format!(
                "Let's solve {} for {}. {}",
                solution.input,
                solution.variable,
                bookmark("equation")
            ),
            cues: vec![
                Cue::Bookmark("equation".to_string()),
                Cue::Reveal {
                    fragment: "equation".to_string(),
                    effects: vec![self.reveal_effect(FragmentTarget::whole("equation"))],
                    duration_s: timings.write_s,
                },
            ],
        });
        let mut shown = Shown {
            label: "equation".to_string(),
            equation: solution.input.clone(),
            terms,
        };

        for (i, step) in solution.steps.iter().enumerate() {
            let number = i + 1;
            let plan = if step.kind == StepKind::Solution {
                self.solution_plan(&mut colorizer, &mut fragments, &mut shown, step, number)?
            } else {
                self.step_plan(&mut colorizer, &mut fragments, &mut shown, step, number)?
            };
            steps.push(plan);
        }

        if !matches!(solution.outcome, Outcome::Unique(_)) {
            let text = match solution.outcome {
                Outcome::NoSolution => "The variable terms cancel and the constants disagree, so there is no solution.",
                _ => "Both sides are always equal, so every value is a solution.",
            };
            steps.push(StepPlan {
                number: solution.steps.len() + 1,
                kind: None,
                narration: text.to_string(),
                cues: vec![Cue::Highlight {
                    targets: vec![FragmentTarget::whole(shown.label.clone())],
                    color: self.style.palette.highlight,
                }],
            });
        }

        log::info!(
            "annotated {:?}: {} fragment(s), {} step plan(s)",
            solution.input,
            fragments.len(),
            steps.len()
        );
        Ok(TutorialPlan {
            equation: solution.input.clone(),
            fragments,
            steps,
            outcome: solution.outcome.clone(),
        })
    }

    fn step_plan<T: Typesetter>(
        &self,
        colorizer: &mut Colorizer<T>,
        fragments: &mut Vec<PlannedFragment>,
        shown: &mut Shown,
        step: &Step,
        number: usize,
    ) -> Result<StepPlan> {
        let palette = &self.style.palette;
        let timings = &self.style.timings;
        let mut cues = Vec::new();

        let acted = acted_on(step);
        let targets: Vec<FragmentTarget> = shown
            .terms
            .iter()
            .filter(|t| acted.iter().any(|span| *span == t.slice.span))
            .filter_map(|t| t.range.map(|r| FragmentTarget::glyphs(shown.label.clone(), 0, r)))
            .collect();
        if !targets.is_empty() {
            cues.push(Cue::Highlight {
                targets,
                color: palette.highlight,
            });
        }

        let note_label = format!("step-{number}-note");
        let note = match step.operation.annotation_latex() {
            Some(annotation) => {
                let note = self.note_fragment(colorizer, fragments, shown, &note_label, &annotation)?;
                fragments.push(note);
                cues.push(Cue::Bookmark(note_label.clone()));
                cues.push(Cue::Reveal {
                    fragment: note_label.clone(),
                    effects: vec![self.reveal_effect(FragmentTarget::whole(note_label.clone()))],
                    duration_s: timings.write_s,
                });
                Some(FragmentTarget::whole(note_label.clone()))
            }
            None => None,
        };

        let description = step.description().unwrap_or_default();
        let label = format!("step-{number}-label");
        let label_source = format!(r"\text{{Step {number}: {description}}}", description = escape_text(&description));
        let mut label_expr = colorizer.locator_mut().typesetter_mut().typeset(&label_source)?;
        let full = label_expr.full_range();
        label_expr.set_range_color(full, palette.text);
        fragments.push(planned(&label, label_source, label_expr));
        cues.push(Cue::Reveal {
            fragment: label.clone(),
            effects: vec![Effect::Write(FragmentTarget::whole(label.clone()))],
            duration_s: timings.write_s,
        });

        let eq_label = format!("step-{number}");
        let (expr, terms) = self.equation_expression(colorizer, &step.equation, &step.latex)?;
        let effects = self.morph_effects(shown, &eq_label, &expr, &terms, Constants::FadeFrom(note.as_ref()));
        fragments.push(planned(&eq_label, step.latex.clone(), expr));
        cues.push(Cue::Bookmark(eq_label.clone()));
        cues.push(Cue::Reveal {
            fragment: eq_label.clone(),
            effects,
            duration_s: timings.transform_s,
        });
        cues.push(Cue::Pause(timings.pause_s));

        let narration = match note {
            Some(_) => format!(
                "Step {number}: {}{description}. {}This gives {}.",
                bookmark(&note_label),
                bookmark(&eq_label),
                step.equation
            ),
            None => format!(
                "Step {number}: {description}. {}This gives {}.",
                bookmark(&eq_label),
                step.equation
            ),
        };

        *shown = Shown {
            label: eq_label,
            equation: step.equation.clone(),
            terms,
        };
        Ok(StepPlan {
            number,
            kind: Some(step.kind),
            narration,
            cues,
        })
    }

    fn solution_plan<T: Typesetter>(
        &self,
        colorizer: &mut Colorizer<T>,
        fragments: &mut Vec<PlannedFragment>,
        shown: &mut Shown,
        step: &Step,
        number: usize,
    ) -> Result<StepPlan> {
        let mut cues = Vec::new();
        if step.equation != shown.equation {
            let label = "solution".to_string();
            let (mut expr, mut terms) = self.equation_expression(colorizer, &step.equation, &step.latex)?;
            // The shown value may be a rounded decimal; locate it as written.
            if let Some(value) = step.result_map.solution.as_ref() {
                for t in terms.iter_mut().filter(|t| !t.slice.is_variable()) {
                    t.range =
                        colorizer.colorize_component(&mut expr, &value.latex, self.style.palette.solution, -1)?;
                }
            }
            // The exact value becomes its rounded form.
            let effects = self.morph_effects(shown, &label, &expr, &terms, Constants::Replace);
            fragments.push(planned(&label, step.latex.clone(), expr));
            cues.push(Cue::Bookmark(label.clone()));
            cues.push(Cue::Reveal {
                fragment: label.clone(),
                effects,
                duration_s: self.style.timings.transform_s,
            });
            *shown = Shown {
                label,
                equation: step.equation.clone(),
                terms,
            };
        }
        let targets: Vec<FragmentTarget> = shown
            .terms
            .iter()
            .filter_map(|t| t.range.map(|r| FragmentTarget::glyphs(shown.label.clone(), 0, r)))
            .collect();
        cues.push(Cue::Highlight {
            targets,
            color: self.style.palette.solution,
        });
        let narration = if cues.iter().any(|c| matches!(c, Cue::Bookmark(_))) {
            format!("{}So the solution is {}.", bookmark("solution"), step.equation)
        } else {
            format!("So the solution is {}.", step.equation)
        };
        Ok(StepPlan {
            number,
            kind: Some(step.kind),
            narration,
            cues,
        })
    }

    /// Typeset `latex`, color its terms and record where each term landed.
    fn equation_expression<T: Typesetter>(
        &self,
        colorizer: &mut Colorizer<T>,
        equation: &str,
        latex: &str,
    ) -> Result<(Expression, Vec<Located>)> {
        let mut expr = colorizer.locator_mut().typesetter_mut().typeset(latex)?;
        let full = expr.full_range();
        expr.set_range_color(full, self.style.palette.text);

        let parsed = LinearEquation::parse(equation)?;
        let slices = SubstringSlices::from_equation(&parsed);
        let haystack = strip_whitespace(latex);
        let mut cursor = 0usize;
        let mut located = Vec::with_capacity(slices.len());
        for slice in slices.iter() {
            let pattern = strip_whitespace(&slice.latex);
            let range = match haystack[cursor..].find(&pattern) {
                Some(offset) => {
                    let at = cursor + offset;
                    let nth = haystack[..at].matches(pattern.as_str()).count() as isize;
                    cursor = at + pattern.len();
                    let color = if slice.is_variable() {
                        self.style.palette.variable
                    } else {
                        self.style.palette.constant
                    };
                    colorizer.colorize_component(&mut expr, &slice.latex, color, nth)?
                }
                None => None,
            };
            if range.is_none() {
                log::warn!("term {:?} not found in {latex:?}", slice.text);
            }
            located.push(Located {
                slice: slice.clone(),
                range,
            });
        }
        Ok((expr, located))
    }

    /// Variable terms morph out of the previous equation's variable terms; constants
    /// follow `constants`; everything else is written.
    fn morph_effects(
        &self,
        shown: &Shown,
        label: &str,
        expr: &Expression,
        terms: &[Located],
        constants: Constants<'_>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut covered: Vec<GlyphRange> = Vec::new();
        for term in terms {
            let Some(range) = term.range else { continue };
            let target = FragmentTarget::glyphs(label, 0, range);
            let is_variable = term.slice.is_variable();
            // Prefer a source term of the same kind on the same side.
            let source = shown
                .terms
                .iter()
                .filter(|t| t.slice.is_variable() == is_variable)
                .filter_map(|t| t.range.map(|r| (t.slice.side, r)))
                .min_by_key(|(side, _)| *side != term.slice.side)
                .map(|(_, r)| FragmentTarget::glyphs(shown.label.clone(), 0, r));
            let effect = match (is_variable, source, constants) {
                (true, Some(source), _) => Effect::TransformFromCopy { source, target },
                (true, None, _) => Effect::Write(target),
                (false, Some(source), Constants::Replace) => Effect::ReplacementTransform { source, target },
                (false, _, Constants::Replace) => Effect::FadeIn { target, from: None },
                (false, _, Constants::FadeFrom(note)) => Effect::FadeIn {
                    target,
                    from: note.cloned(),
                },
            };
            effects.push(effect);
            covered.push(range);
        }
        for gap in gaps(expr.len(), &covered) {
            effects.push(Effect::Write(FragmentTarget::glyphs(
                label,
                0,
                GlyphRange::new(gap.start, gap.end),
            )));
        }
        effects
    }

    /// The operation written under each side of the shown equation, centered on
    /// that side. Falls back to one spaced row when `=` cannot be located.
    fn note_fragment<T: Typesetter>(
        &self,
        colorizer: &mut Colorizer<T>,
        fragments: &[PlannedFragment],
        shown: &Shown,
        label: &str,
        annotation: &str,
    ) -> Result<PlannedFragment> {
        let color = self.style.palette.annotation;
        let typeset = |colorizer: &mut Colorizer<T>, source: &str| -> Result<Expression> {
            let mut expr = colorizer.locator_mut().typesetter_mut().typeset(source)?;
            let full = expr.full_range();
            expr.set_range_color(full, color);
            Ok(expr)
        };

        let above = fragments
            .iter()
            .find(|f| f.label == shown.label)
            .and_then(|f| f.parts.first());
        let centers = match above {
            Some(expr) => side_centers(colorizer, expr)?,
            None => None,
        };
        let Some(centers) = centers else {
            log::warn!("no `=` in {:?}; annotation goes in one row", shown.equation);
            let source = format!(r"{annotation} \qquad {annotation}");
            let expr = typeset(colorizer, &source)?;
            return Ok(planned(label, source, expr));
        };
        let parts = vec![typeset(colorizer, annotation)?, typeset(colorizer, annotation)?];
        Ok(PlannedFragment {
            label: label.to_string(),
            layout: FragmentLayout::Aligned,
            sources: vec![annotation.to_string(), annotation.to_string()],
            centers_pt: centers.to_vec(),
            parts,
        })
    }

    fn reveal_effect(&self, target: FragmentTarget) -> Effect {
        match self.style.reveal {
            Reveal::Write => Effect::Write(target),
            Reveal::FadeIn => Effect::FadeIn { target, from: None },
        }
    }
}

/// Spans (in `step.before`) of the terms the step operates on.
fn acted_on(step: &Step) -> Vec<Range<usize>> {
    use crate::linear::Operation;

    let map = &step.substring_map;
    let var_side = if map.var_terms_right.len() > map.var_terms_left.len() {
        Side::Right
    } else {
        Side::Left
    };
    let kept_side = if step.result_map.var_terms_right.is_empty() {
        Side::Left
    } else {
        Side::Right
    };
    let spans = |slices: &[TermSlice]| slices.iter().map(|s| s.span.clone()).collect::<Vec<_>>();
    match (step.kind, &step.operation) {
        (StepKind::MoveVariables, Operation::Add { .. }) => spans(map.var_terms(kept_side.other())),
        (StepKind::MoveVariables, _) => spans(map.var_terms(kept_side)),
        (StepKind::MoveConstants, Operation::Add { .. }) => spans(map.const_terms(var_side)),
        (StepKind::MoveConstants, _) => spans(map.const_terms(var_side.other())),
        (StepKind::Divide, _) => spans(map.var_terms(var_side)),
        (StepKind::Solution, _) => Vec::new(),
    }
}

fn planned(label: &str, source: String, expr: Expression) -> PlannedFragment {
    PlannedFragment {
        label: label.to_string(),
        layout: FragmentLayout::Row,
        sources: vec![source],
        centers_pt: Vec::new(),
        parts: vec![expr],
    }
}

/// Centers of the two sides of `equation`, split at its first `=` glyph, in the
/// space of a single-part row fragment.
fn side_centers<T: Typesetter>(colorizer: &mut Colorizer<T>, equation: &Expression) -> Result<Option<[f32; 2]>> {
    let Some(eq) = colorizer.locator_mut().find(equation, "=", 0)? else {
        return Ok(None);
    };
    let lhs = equation.range_bbox(GlyphRange::new(0, eq.start));
    let rhs = equation.range_bbox(GlyphRange::new(eq.end, equation.len()));
    if lhs.is_empty() || rhs.is_empty() {
        return Ok(None);
    }
    // Row fragments start their part at x = 0.
    let shift = -equation.bbox().min[0];
    Ok(Some([lhs.center()[0] + shift, rhs.center()[0] + shift]))
}

fn bookmark(name: &str) -> String {
    format!(r#"<bookmark mark="{name}"/>"#)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Braces would end `\text{..}` early.
fn escape_text(s: &str) -> String {
    s.replace(['{', '}'], "")
}

/// Uncovered sub-ranges of `0..len`.
fn gaps(len: usize, covered: &[GlyphRange]) -> Vec<Range<usize>> {
    let mut sorted: Vec<GlyphRange> = covered.to_vec();
    sorted.sort();
    let mut out = Vec::new();
    let mut at = 0;
    for r in sorted {
        if r.start > at {
            out.push(at..r.start);
        }
        at = at.max(r.end);
    }
    if at < len {
        out.push(at..len);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::headless::HeadlessEngine;
    use crate::linear::solve;

    fn plan(input: &str) -> TutorialPlan {
        let solution = solve(input).unwrap();
        StepAnnotator::new(TutorialStyle::default())
            .annotate(HeadlessEngine::default(), &solution)
            .unwrap()
    }

    #[test]
    fn fragments_are_declared_in_vertical_order() {
        let p = plan("4n - 26 = -2");
        let labels: Vec<&str> = p.fragments.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "equation",
                "step-1-note",
                "step-1-label",
                "step-1",
                "step-2-note",
                "step-2-label",
                "step-2",
            ]
        );
        assert_eq!(p.fragment("step-1-note").unwrap().sources, ["+26", "+26"]);
        assert_eq!(p.fragment("step-2-note").unwrap().sources, [r"\div 4", r"\div 4"]);
        assert_eq!(
            p.fragment("step-1-label").unwrap().sources[0],
            r"\text{Step 1: Add 26 to both sides}"
        );
    }

    #[test]
    fn note_is_centered_under_each_side() {
        let p = plan("4n - 26 = -2");
        let note = p.fragment("step-1-note").unwrap();
        assert_eq!(note.layout, FragmentLayout::Aligned);
        assert_eq!(note.parts.len(), 2);
        let equation = &p.fragment("equation").unwrap().parts[0];
        // Glyphs 0..5 are `4n-26`, 5 is `=`, 6..8 is `-2`.
        let shift = -equation.bbox().min[0];
        let lhs = equation.range_bbox(GlyphRange::new(0, 5)).center()[0] + shift;
        let rhs = equation.range_bbox(GlyphRange::new(6, 8)).center()[0] + shift;
        let bar = equation.range_bbox(GlyphRange::new(5, 6)).center()[0] + shift;
        assert_eq!(note.centers_pt, [lhs, rhs]);
        assert!(note.centers_pt[0] < bar && bar < note.centers_pt[1]);
    }

    #[test]
    fn first_step_highlights_the_moved_constant() {
        let p = plan("4n - 26 = -2");
        let Cue::Highlight { targets, .. } = &p.steps[1].cues[0] else {
            panic!("expected a highlight first: {:?}", p.steps[1].cues);
        };
        assert_eq!(targets, &[FragmentTarget::glyphs("equation", 0, GlyphRange::new(2, 5))]);
    }

    #[test]
    fn annotation_is_revealed_before_the_new_equation() {
        let p = plan("4n - 26 = -2");
        let reveals: Vec<&str> = p.steps[1]
            .cues
            .iter()
            .filter_map(|c| match c {
                Cue::Reveal { fragment, .. } => Some(fragment.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(reveals, ["step-1-note", "step-1-label", "step-1"]);
    }

    #[test]
    fn variable_morphs_and_constant_fades_in() {
        let p = plan("4n - 26 = -2");
        let effects = p.steps[1]
            .cues
            .iter()
            .find_map(|c| match c {
                Cue::Reveal { fragment, effects, .. } if fragment == "step-1" => Some(effects),
                _ => None,
            })
            .unwrap();
        assert!(effects.contains(&Effect::TransformFromCopy {
            source: FragmentTarget::glyphs("equation", 0, GlyphRange::new(0, 2)),
            target: FragmentTarget::glyphs("step-1", 0, GlyphRange::new(0, 2)),
        }));
        assert!(effects.contains(&Effect::FadeIn {
            target: FragmentTarget::glyphs("step-1", 0, GlyphRange::new(3, 5)),
            from: Some(FragmentTarget::whole("step-1-note")),
        }));
        // `=` is written.
        assert!(effects.contains(&Effect::Write(FragmentTarget::glyphs(
            "step-1",
            0,
            GlyphRange::new(2, 3)
        ))));
    }

    #[test]
    fn terms_are_colored_from_the_palette() {
        let p = plan("4n - 26 = -2");
        let palette = TutorialStyle::default().palette;
        let colors = p.fragments[0].parts[0].colors();
        assert_eq!(colors[0], palette.variable);
        assert_eq!(colors[2], palette.constant);
        assert_eq!(colors[5], palette.text, "`=`");
        assert_eq!(colors[7], palette.constant);
    }

    #[test]
    fn solution_highlights_existing_fragment() {
        let p = plan("4n - 26 = -2");
        let last = p.steps.last().unwrap();
        assert_eq!(last.kind, Some(StepKind::Solution));
        let Cue::Highlight { targets, color } = &last.cues[0] else {
            panic!("{:?}", last.cues);
        };
        assert_eq!(*color, TutorialStyle::default().palette.solution);
        assert!(targets.iter().all(|t| t.fragment == "step-2"));
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn rounded_solution_gets_its_own_fragment() {
        let p = plan("3x = 2");
        assert!(p.fragment("solution").is_some());
        assert_eq!(p.fragment("solution").unwrap().sources[0], "x = 0.66");
    }

    #[test]
    fn rounded_value_replaces_the_exact_one() {
        let p = plan("3x = 2");
        let effects = p
            .steps
            .iter()
            .flat_map(|s| &s.cues)
            .find_map(|c| match c {
                Cue::Reveal { fragment, effects, .. } if fragment == "solution" => Some(effects),
                _ => None,
            })
            .unwrap();
        let replaced: Vec<&FragmentTarget> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::ReplacementTransform { source, target } => {
                    assert_eq!(target.fragment, "solution");
                    Some(source)
                }
                _ => None,
            })
            .collect();
        assert_eq!(replaced.len(), 1, "{effects:?}");
        assert_eq!(replaced[0].fragment, "step-1");
        assert!(
            !effects.iter().any(|e| matches!(e, Effect::FadeIn { .. })),
            "{effects:?}"
        );
    }

    #[test]
    fn narration_carries_bookmarks_for_each_reveal() {
        let p = plan("2n = -4n + 12");
        let step = &p.steps[1];
        assert_eq!(
            step.narration,
            r#"Step 1: <bookmark mark="step-1-note"/>Add 4n to both sides. <bookmark mark="step-1"/>This gives 6n = 12."#
        );
        for cue in &step.cues {
            if let Cue::Bookmark(name) = cue {
                assert!(step.narration.contains(&bookmark(name)), "{name}");
            }
        }
    }

    #[test]
    fn no_solution_gets_a_closing_step() {
        let p = plan("2x + 1 = 2x + 3");
        assert_eq!(p.outcome, Outcome::NoSolution);
        assert_eq!(p.steps.len(), 2);
        assert!(p.steps[1].narration.contains("no solution"));
    }

    #[test]
    fn plan_serializes() {
        let p = plan("5 - 2u = 11");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["equation"], "5 - 2u = 11");
        assert_eq!(json["steps"][1]["kind"], "MOVE_CONSTANTS");
        assert!(json["fragments"][0].get("parts").is_none());
    }

    #[test]
    fn gap_computation() {
        let covered = [GlyphRange::new(3, 5), GlyphRange::new(0, 2)];
        assert_eq!(gaps(8, &covered), vec![2..3, 5..8]);
        assert_eq!(gaps(2, &[GlyphRange::new(0, 2)]), Vec::<Range<usize>>::new());
    }
}
