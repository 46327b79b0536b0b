//! Step-by-step solver for one-variable linear equations.
//!
//! Each iteration picks one step kind from the equation's current shape:
//! - `SOLUTION` once one side is the bare variable and the other a single constant;
//! - `MOVE_VARIABLES` while both sides carry the variable, or one side carries several
//!   variable terms. The side with the larger coefficient keeps it (ties go left) and
//!   constants stay where they are;
//! - `MOVE_CONSTANTS` while the variable side carries a constant, or the other side
//!   carries several;
//! - `DIVIDE` by the remaining coefficient (multiply by its reciprocal if fractional).
//!
//! [`LinearEquation::rank`] strictly decreases with every step, so the loop ends.

use serde::Serialize;

use super::equation::{LinearEquation, Side, Style, magnitude_text, number_text};
use super::rational::{Rational, format_solution};
use super::slices::{SubstringMap, SubstringSlices, TermKind, coefficient_slice};
use crate::error::{Error, Result};

pub const DEFAULT_PRECISION: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    MoveVariables,
    MoveConstants,
    Divide,
    Solution,
}

/// What was done to both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operation {
    /// Add `coefficient` (times the variable, if `variable` is set) to both sides.
    Add {
        coefficient: Rational,
        variable: Option<char>,
    },
    /// Combine like terms on a side; nothing crosses the `=`.
    Combine,
    DivideBy(Rational),
    MultiplyBy(Rational),
    None,
}

impl Operation {
    /// `"Add 26 to both sides"`, `"Multiply both sides by 5/4"`, ...
    pub fn description(&self) -> Option<String> {
        match self {
            Operation::Add {
                coefficient,
                variable,
            } => {
                let term = plain_term(coefficient.abs(), *variable);
                Some(if coefficient.is_negative() {
                    format!("Subtract {term} from both sides")
                } else {
                    format!("Add {term} to both sides")
                })
            }
            Operation::Combine => Some("Combine like terms".to_string()),
            Operation::DivideBy(r) => Some(format!("Divide both sides by {r}")),
            Operation::MultiplyBy(r) => Some(format!("Multiply both sides by {r}")),
            Operation::None => None,
        }
    }

    /// Annotation shown under each side (`"+26"`, `"\div 4"`, `"\cdot \frac{5}{4}"`).
    pub fn annotation_latex(&self) -> Option<String> {
        match self {
            Operation::Add {
                coefficient,
                variable,
            } => {
                let sign = if coefficient.is_negative() { '-' } else { '+' };
                let body = match variable {
                    Some(v) => magnitude_text(*v, coefficient.abs(), true, Style::Latex),
                    None => number_text(coefficient.abs(), Style::Latex),
                };
                Some(format!("{sign}{body}"))
            }
            Operation::DivideBy(r) => Some(format!(r"\div {}", signed_latex(*r))),
            Operation::MultiplyBy(r) => Some(format!(r"\cdot {}", signed_latex(*r))),
            Operation::Combine | Operation::None => None,
        }
    }
}

fn plain_term(magnitude: Rational, variable: Option<char>) -> String {
    match variable {
        Some(v) => magnitude_text(v, magnitude, true, Style::Canonical),
        None => magnitude.to_string(),
    }
}

fn signed_latex(r: Rational) -> String {
    let body = number_text(r.abs(), Style::Latex);
    if r.is_negative() {
        format!("(-{body})")
    } else {
        body
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub kind: StepKind,
    /// Display form of the equation this step acts on.
    pub before: String,
    /// Display form of the resulting equation.
    pub equation: String,
    /// Typesetting source of the resulting equation.
    pub latex: String,
    /// Salient terms of `before`.
    pub substring_map: SubstringMap,
    /// Salient terms of `equation`.
    pub result_map: SubstringMap,
    pub operation: Operation,
}

impl Step {
    pub fn latex(&self) -> &str {
        &self.latex
    }

    pub fn description(&self) -> Option<String> {
        self.operation.description()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    Unique(Rational),
    /// Reduces to `0 = c` with `c ≠ 0`.
    NoSolution,
    /// Reduces to `0 = 0`.
    Identity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    /// Display form of the input equation.
    pub input: String,
    pub input_latex: String,
    pub variable: char,
    pub steps: Vec<Step>,
    pub outcome: Outcome,
}

impl Solution {
    /// Formatted solution value, for unique outcomes.
    pub fn value_text(&self, precision: usize) -> Option<String> {
        match self.outcome {
            Outcome::Unique(v) => Some(format_solution(v, precision)),
            _ => None,
        }
    }
}

pub fn solve(input: &str) -> Result<Solution> {
    solve_with_precision(input, DEFAULT_PRECISION)
}

pub fn solve_with_precision(input: &str, precision: usize) -> Result<Solution> {
    let original = LinearEquation::parse(input)?;
    let variable = original.variable();
    let mut current = LinearEquation::parse(&original.display())?;
    let mut steps = Vec::new();
    log::info!("solving {:?} for {variable}", current.source());

    let outcome = loop {
        let (lv, rv) = (current.lhs_var_coeff(), current.rhs_var_coeff());
        if lv == rv {
            break if current.lhs_const() == current.rhs_const() {
                Outcome::Identity
            } else {
                Outcome::NoSolution
            };
        }

        if let Some((var_side, value)) = solved(&current) {
            steps.push(solution_step(&current, var_side, value, precision)?);
            break Outcome::Unique(value);
        }

        let rank = current.rank();
        let (step, next) = if rank.0 || rank.1 {
            move_variables(&current)?
        } else if rank.2 {
            move_constants(&current)?
        } else {
            divide(&current)?
        };
        debug_assert!(next.rank() < rank, "{} -> {}", current.source(), next.source());
        log::debug!("{:?}: {} -> {}", step.kind, step.before, step.equation);
        steps.push(step);
        current = next;
    };

    Ok(Solution {
        input: original.display(),
        input_latex: original.to_latex(),
        variable,
        steps,
        outcome,
    })
}

/// `Some((side, value))` when the equation reads `x = value` or `value = x`.
fn solved(eq: &LinearEquation) -> Option<(Side, Rational)> {
    [Side::Left, Side::Right].into_iter().find_map(|side| {
        let here = eq.side(side);
        let there = eq.side(side.other());
        let bare = here.len() == 1 && here[0].is_variable && here[0].coefficient == Rational::ONE;
        let single = there.len() == 1 && !there[0].is_variable;
        (bare && single).then(|| (side, there[0].coefficient))
    })
}

fn pairs_of(eq: &LinearEquation, side: Side, variables: bool) -> Vec<(Rational, bool)> {
    eq.side(side)
        .iter()
        .filter(|t| t.is_variable == variables)
        .map(|t| (t.coefficient, t.is_variable))
        .collect()
}

fn build(eq: &LinearEquation, kind: StepKind, next: LinearEquation, operation: Operation) -> Step {
    Step {
        kind,
        before: eq.source().to_string(),
        equation: next.source().to_string(),
        latex: next.to_latex(),
        substring_map: SubstringMap::from_slices(&SubstringSlices::from_equation(eq)),
        result_map: SubstringMap::from_slices(&SubstringSlices::from_equation(&next)),
        operation,
    }
}

fn overflow(eq: &LinearEquation) -> Error {
    Error::malformed(eq.source(), "coefficient overflow")
}

fn move_variables(eq: &LinearEquation) -> Result<(Step, LinearEquation)> {
    let keep = eq.variable_side();
    let other = keep.other();
    let moved = eq.var_coeff(other);
    let net = eq.var_coeff(keep).checked_sub(moved).ok_or_else(|| overflow(eq))?;

    let mut kept = vec![(net, true)];
    kept.extend(pairs_of(eq, keep, false));
    let rest = pairs_of(eq, other, false);
    let next = match keep {
        Side::Left => LinearEquation::from_terms(eq.variable(), &kept, &rest)?,
        Side::Right => LinearEquation::from_terms(eq.variable(), &rest, &kept)?,
    };
    let operation = if eq.has_variable(other) {
        Operation::Add {
            coefficient: -moved,
            variable: Some(eq.variable()),
        }
    } else {
        Operation::Combine
    };
    Ok((build(eq, StepKind::MoveVariables, next.clone(), operation), next))
}

fn move_constants(eq: &LinearEquation) -> Result<(Step, LinearEquation)> {
    let side = eq.variable_side();
    let moved = eq.constant(side);
    let value = eq
        .constant(side.other())
        .checked_sub(moved)
        .ok_or_else(|| overflow(eq))?;
    let kept = [(eq.var_coeff(side), true)];
    let rest = [(value, false)];
    let next = match side {
        Side::Left => LinearEquation::from_terms(eq.variable(), &kept, &rest)?,
        Side::Right => LinearEquation::from_terms(eq.variable(), &rest, &kept)?,
    };
    let operation = if eq.has_constant(side) {
        Operation::Add {
            coefficient: -moved,
            variable: None,
        }
    } else {
        Operation::Combine
    };
    Ok((build(eq, StepKind::MoveConstants, next.clone(), operation), next))
}

fn divide(eq: &LinearEquation) -> Result<(Step, LinearEquation)> {
    let side = eq.variable_side();
    let coefficient = eq.var_coeff(side);
    let value = eq
        .constant(side.other())
        .checked_div(coefficient)
        .ok_or_else(|| overflow(eq))?;
    let kept = [(Rational::ONE, true)];
    let rest = [(value, false)];
    let next = match side {
        Side::Left => LinearEquation::from_terms(eq.variable(), &kept, &rest)?,
        Side::Right => LinearEquation::from_terms(eq.variable(), &rest, &kept)?,
    };
    let operation = match coefficient.recip() {
        Some(reciprocal) if !coefficient.is_integer() => Operation::MultiplyBy(reciprocal),
        _ => Operation::DivideBy(coefficient),
    };
    let mut step = build(eq, StepKind::Divide, next.clone(), operation);
    let slices = SubstringSlices::from_equation(eq);
    step.substring_map.coefficient = slices
        .on(side, TermKind::Variable)
        .next()
        .map(|term| coefficient_slice(eq, term));
    Ok((step, next))
}

fn solution_step(eq: &LinearEquation, var_side: Side, value: Rational, precision: usize) -> Result<Step> {
    let variable = eq.variable();
    let shown = format_solution(value, precision);
    let equation = format!("{variable} = {shown}");
    let result = LinearEquation::parse(&equation)?;
    let mut result_map = SubstringMap::from_slices(&SubstringSlices::from_equation(&result));
    result_map.variable = result_map.var_terms_left.first().cloned();
    result_map.solution = result_map.const_terms_right.first().cloned().map(|mut s| {
        // The shown value may be a truncated decimal; typeset it as written.
        s.latex = s.text.clone();
        s
    });
    if let Some(s) = result_map.const_terms_right.first_mut() {
        s.latex = s.text.clone();
    }

    let mut substring_map = SubstringMap::from_slices(&SubstringSlices::from_equation(eq));
    substring_map.variable = substring_map.var_terms(var_side).first().cloned();
    substring_map.solution = substring_map.const_terms(var_side.other()).first().cloned();

    Ok(Step {
        kind: StepKind::Solution,
        before: eq.source().to_string(),
        latex: equation.clone(),
        equation,
        substring_map,
        result_map,
        operation: Operation::None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equations(s: &Solution) -> Vec<(StepKind, &str)> {
        s.steps.iter().map(|st| (st.kind, st.equation.as_str())).collect()
    }

    #[test]
    fn move_constants_then_divide() {
        let s = solve("4n - 26 = -2").unwrap();
        assert_eq!(
            equations(&s),
            [
                (StepKind::MoveConstants, "4n = 24"),
                (StepKind::Divide, "n = 6"),
                (StepKind::Solution, "n = 6"),
            ]
        );
        let first = &s.steps[0].substring_map;
        assert_eq!(first.const_terms_left[0].text, "-26");
        assert_eq!(first.const_terms_right[0].text, "-2");
        assert_eq!(first.var_terms_left[0].text, "4n");
        assert_eq!(s.steps[0].description().unwrap(), "Add 26 to both sides");
        assert_eq!(s.steps[1].description().unwrap(), "Divide both sides by 4");
        assert_eq!(s.outcome, Outcome::Unique(Rational::from(6)));
    }

    #[test]
    fn negative_coefficient() {
        let s = solve("-2y - 13 = -11").unwrap();
        assert_eq!(
            equations(&s)[..2],
            [(StepKind::MoveConstants, "-2y = 2"), (StepKind::Divide, "y = -1")]
        );
        assert_eq!(s.steps[1].operation, Operation::DivideBy(Rational::from(-2)));
        assert_eq!(s.steps[1].operation.annotation_latex().unwrap(), r"\div (-2)");
    }

    #[test]
    fn constant_before_variable() {
        let s = solve("5 - 2u = 11").unwrap();
        assert_eq!(
            equations(&s)[..2],
            [(StepKind::MoveConstants, "-2u = 6"), (StepKind::Divide, "u = -3")]
        );
        assert_eq!(s.steps[0].description().unwrap(), "Subtract 5 from both sides");
        assert_eq!(s.steps[0].operation.annotation_latex().unwrap(), "-5");
    }

    #[test]
    fn variables_on_both_sides() {
        let s = solve("2n = -4n + 12").unwrap();
        assert_eq!(
            equations(&s)[..2],
            [(StepKind::MoveVariables, "6n = 12"), (StepKind::Divide, "n = 2")]
        );
        assert_eq!(s.steps[0].description().unwrap(), "Add 4n to both sides");
        assert_eq!(s.steps[0].operation.annotation_latex().unwrap(), "+4n");
    }

    #[test]
    fn fractional_coefficient_multiplies_by_reciprocal() {
        let s = solve("4/5 x - 9 = -1").unwrap();
        assert_eq!(
            equations(&s)[..2],
            [(StepKind::MoveConstants, "4/5 x = 8"), (StepKind::Divide, "x = 10")]
        );
        assert_eq!(s.steps[1].operation, Operation::MultiplyBy(Rational::new(5, 4)));
        assert_eq!(s.steps[1].description().unwrap(), "Multiply both sides by 5/4");
        assert_eq!(
            s.steps[1].operation.annotation_latex().unwrap(),
            r"\cdot \frac{5}{4}"
        );
        let coeff = s.steps[1].substring_map.coefficient.as_ref().unwrap();
        assert_eq!(coeff.latex, r"\frac{4}{5}");
    }

    #[test]
    fn right_side_keeps_larger_coefficient() {
        let s = solve("x + 3 = 3x").unwrap();
        assert_eq!(s.steps[0].equation, "3 = 2x");
        assert_eq!(s.steps[0].description().unwrap(), "Subtract x from both sides");
        assert_eq!(s.steps.last().unwrap().equation, "x = 1.5");
        assert_eq!(s.outcome, Outcome::Unique(Rational::new(3, 2)));
    }

    #[test]
    fn already_solved_is_one_step() {
        let s = solve("x = 5").unwrap();
        assert_eq!(equations(&s), [(StepKind::Solution, "x = 5")]);
        let sol = &s.steps[0].result_map;
        assert_eq!(sol.variable.as_ref().unwrap().text, "x");
        assert_eq!(sol.solution.as_ref().unwrap().text, "5");
        assert_eq!(solve("7 = t").unwrap().steps[0].equation, "t = 7");
    }

    #[test]
    fn degenerate_outcomes_are_not_errors() {
        assert_eq!(solve("2x + 1 = 2x + 3").unwrap().outcome, Outcome::NoSolution);
        let id = solve("x + 1 = 1 + x").unwrap();
        assert_eq!(id.outcome, Outcome::Identity);
        assert!(id.steps.is_empty());
    }

    #[test]
    fn decimal_solution_uses_precision() {
        let s = solve_with_precision("3x = 2", 3).unwrap();
        assert_eq!(s.steps.last().unwrap().equation, "x = 0.666");
        assert_eq!(s.steps.last().unwrap().latex(), "x = 0.666");
        assert_eq!(s.value_text(2).unwrap(), "0.66");
    }

    #[test]
    fn substitution_satisfies_the_input() {
        for input in [
            "4n - 26 = -2",
            "-2y - 13 = -11",
            "5 - 2u = 11",
            "2n = -4n + 12",
            "4/5 x - 9 = -1",
            "3x + 4 - x = 10 + 5x",
            "7 = 2/3 t + 1",
            "0.5z + 2 = 1",
        ] {
            let s = solve(input).unwrap();
            let Outcome::Unique(v) = s.outcome else {
                panic!("{input}: {:?}", s.outcome);
            };
            assert_eq!(s.steps.last().unwrap().kind, StepKind::Solution, "{input}");
            let eq = LinearEquation::parse(input).unwrap();
            let lhs = eq.lhs_var_coeff() * v + eq.lhs_const();
            let rhs = eq.rhs_var_coeff() * v + eq.rhs_const();
            assert_eq!(lhs - rhs, Rational::ZERO, "{input}");
        }
    }

    #[test]
    fn rank_strictly_decreases() {
        for input in ["3x + 4 - x = 10 + 5x", "2 + 3 = x - 4 + 2x", "4/5 x - 9 = -1"] {
            let s = solve(input).unwrap();
            let ranks: Vec<_> = s
                .steps
                .iter()
                .map(|st| LinearEquation::parse(&st.before).unwrap().rank())
                .collect();
            assert!(ranks.windows(2).all(|w| w[1] < w[0]), "{input}: {ranks:?}");
        }
    }

    #[test]
    fn coefficient_overflow_is_malformed_not_a_panic() {
        let max = i128::MAX;
        for input in [
            format!("{max}x + {max}x = 1"),
            format!("x + {max} + {max} = 0"),
            format!("{max}x = -{max}x + 1"),
            format!("x + {max} = -{max}"),
        ] {
            assert!(
                matches!(solve(&input), Err(crate::Error::MalformedEquation { .. })),
                "{input}"
            );
        }
        // Large but representable values still solve.
        let s = solve(&format!("{max}x = {max}")).unwrap();
        assert_eq!(s.outcome, Outcome::Unique(Rational::ONE));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(solve("x + y = 2").is_err());
        assert!(matches!(solve("1 = 2"), Err(crate::Error::NoVariable(_))));
    }
}
