//! `stepcast` library crate root.
//!
//! Step-synchronized tutorial engine for narrated math animations: a script reveals
//! typeset fragments one at a time in a scrolling layout, colors and transforms
//! parts of earlier fragments into later ones, and keeps every reveal in order with
//! a spoken narration. A linear-equation stepper produces the step-by-step content.
//!
//! Pipeline:
//! - [`linear::solve`]: equation string → [`linear::Solution`] (one step per operation).
//! - [`annotate::StepAnnotator`]: solution → declarative [`annotate::TutorialPlan`].
//! - [`driver::TutorialDriver`]: runs a plan against a [`scroll::ScrollManager`] and a
//!   [`driver::Narrator`].
//!
//! The rendering engine is a collaborator behind [`engine::Typesetter`] and
//! [`engine::RenderEngine`]. [`engine::headless::HeadlessEngine`] needs no fonts and
//! is what the tests use; `typst::TypstEngine` (feature `typst`) typesets for real.
//!
//! The library never installs a logger; binaries decide their own logging setup.

pub mod anim;
pub mod annotate;
pub mod colorize;
pub mod driver;
pub mod engine;
pub mod error;
#[cfg(feature = "typst")]
pub mod font;
pub mod linear;
pub mod locate;
pub mod scene;
pub mod scroll;
pub mod style;
#[cfg(feature = "typst")]
pub mod typst;

pub use error::{Error, Result};

/// Solve `input` and build its tutorial plan with `typesetter`.
///
/// This is the convenience path for callers that only want the plan (for
/// inspection or serialization) without driving a scene.
pub fn plan_tutorial<T: engine::Typesetter>(
    typesetter: T,
    style: style::TutorialStyle,
    input: &str,
) -> Result<annotate::TutorialPlan> {
    let solution = linear::solve_with_precision(input, style.solution_precision)?;
    annotate::StepAnnotator::new(style).annotate(typesetter, &solution)
}
