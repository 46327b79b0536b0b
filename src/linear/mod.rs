//! Linear equations in one variable: exact model, term slicing and the stepper that
//! explains a solution one step at a time.
//!
//! ```
//! use stepcast::linear::{solve, StepKind};
//!
//! let solution = solve("4n - 26 = -2").unwrap();
//! let shown: Vec<_> = solution.steps.iter().map(|s| s.equation.as_str()).collect();
//! assert_eq!(shown, ["4n = 24", "n = 6", "n = 6"]);
//! assert_eq!(solution.steps[0].kind, StepKind::MoveConstants);
//! ```

mod equation;
mod rational;
mod slices;
mod stepper;

pub use equation::{EquationShape, LinearEquation, Side, Term, equation_formatted};
pub use rational::{Rational, format_solution};
pub use slices::{SubstringMap, SubstringSlices, TermKind, TermSlice, find_all_substring_slices};
pub use stepper::{
    DEFAULT_PRECISION, Operation, Outcome, Solution, Step, StepKind, solve, solve_with_precision,
};
