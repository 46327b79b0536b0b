//! Term slices: the bridge from equation strings to glyph ranges.
//!
//! Each syntactic term of an equation string is reported with its byte span, its
//! whitespace-free signed text (`"- 26"` reads as `"-26"`) and the LaTeX the term
//! typesets as, which is what the locator searches for.

use std::ops::Range;

use serde::Serialize;

use super::equation::{LinearEquation, Side, Style, magnitude_text, number_text};
use super::rational::Rational;
use crate::error::Result;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TermKind {
    Variable,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSlice {
    /// Whitespace-free signed text of the term.
    pub text: String,
    /// Byte range in the equation string.
    pub span: Range<usize>,
    pub side: Side,
    pub kind: TermKind,
    pub coefficient: Rational,
    /// Signed typesetting source of the term (`"-26"`, `"\frac{4}{5}x"`).
    pub latex: String,
}

impl TermSlice {
    pub fn is_variable(&self) -> bool {
        self.kind == TermKind::Variable
    }

    /// LaTeX of the term without its sign; matches the term wherever it sits.
    pub fn unsigned_latex(&self) -> &str {
        self.latex.strip_prefix('-').unwrap_or(&self.latex)
    }
}

/// Every term slice of one equation string, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubstringSlices {
    slices: Vec<TermSlice>,
}

impl SubstringSlices {
    pub fn from_equation(eq: &LinearEquation) -> Self {
        let variable = eq.variable();
        let slices = eq
            .terms()
            .map(|term| {
                let text: String = eq.source()[term.span.clone()]
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let mut latex = String::new();
                if term.coefficient.is_negative() {
                    latex.push('-');
                }
                latex.push_str(&magnitude_text(
                    variable,
                    term.coefficient.abs(),
                    term.is_variable,
                    Style::Latex,
                ));
                TermSlice {
                    text,
                    span: term.span.clone(),
                    side: term.side,
                    kind: if term.is_variable {
                        TermKind::Variable
                    } else {
                        TermKind::Constant
                    },
                    coefficient: term.coefficient,
                    latex,
                }
            })
            .collect();
        Self { slices }
    }

    /// First slice whose text is `text`.
    pub fn get(&self, text: &str) -> Option<&TermSlice> {
        self.slices.iter().find(|s| s.text == text)
    }

    /// Every slice whose text is `text`, in source order.
    pub fn all(&self, text: &str) -> Vec<&TermSlice> {
        self.slices.iter().filter(|s| s.text == text).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TermSlice> {
        self.slices.iter()
    }

    pub fn on(&self, side: Side, kind: TermKind) -> impl Iterator<Item = &TermSlice> {
        self.slices
            .iter()
            .filter(move |s| s.side == side && s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Slice every term of the equation string `s`.
pub fn find_all_substring_slices(s: &str) -> Result<SubstringSlices> {
    Ok(SubstringSlices::from_equation(&LinearEquation::parse(s)?))
}

/// The salient terms of one step equation, by role.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubstringMap {
    pub var_terms_left: Vec<TermSlice>,
    pub var_terms_right: Vec<TermSlice>,
    pub const_terms_left: Vec<TermSlice>,
    pub const_terms_right: Vec<TermSlice>,
    /// The coefficient divided by (or whose reciprocal is multiplied by).
    pub coefficient: Option<TermSlice>,
    /// `SOLUTION` steps only.
    pub variable: Option<TermSlice>,
    pub solution: Option<TermSlice>,
}

impl SubstringMap {
    pub fn from_slices(slices: &SubstringSlices) -> Self {
        let collect = |side, kind| slices.on(side, kind).cloned().collect::<Vec<_>>();
        Self {
            var_terms_left: collect(Side::Left, TermKind::Variable),
            var_terms_right: collect(Side::Right, TermKind::Variable),
            const_terms_left: collect(Side::Left, TermKind::Constant),
            const_terms_right: collect(Side::Right, TermKind::Constant),
            coefficient: None,
            variable: None,
            solution: None,
        }
    }

    pub fn var_terms(&self, side: Side) -> &[TermSlice] {
        match side {
            Side::Left => &self.var_terms_left,
            Side::Right => &self.var_terms_right,
        }
    }

    pub fn const_terms(&self, side: Side) -> &[TermSlice] {
        match side {
            Side::Left => &self.const_terms_left,
            Side::Right => &self.const_terms_right,
        }
    }

    /// Every term slice, left side first.
    pub fn terms(&self) -> impl Iterator<Item = &TermSlice> {
        self.var_terms_left
            .iter()
            .chain(&self.const_terms_left)
            .chain(&self.var_terms_right)
            .chain(&self.const_terms_right)
    }
}

/// Slice of the coefficient part of a variable term (`"4"` of `"4n"`, `"4/5"` of `"4/5 x"`).
pub(crate) fn coefficient_slice(eq: &LinearEquation, term: &TermSlice) -> TermSlice {
    let source = eq.source();
    let variable_start = eq
        .terms()
        .find(|t| t.span == term.span)
        .and_then(|t| t.variable_span.clone())
        .map(|v| v.start)
        .unwrap_or(term.span.end);
    let raw = &source[term.span.start..variable_start];
    let trimmed_end = term.span.start + raw.trim_end().len();
    let text: String = source[term.span.start..trimmed_end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let mut latex = String::new();
    if term.coefficient.is_negative() {
        latex.push('-');
    }
    latex.push_str(&number_text(term.coefficient.abs(), Style::Latex));
    TermSlice {
        text,
        span: term.span.start..trimmed_end,
        side: term.side,
        kind: TermKind::Constant,
        coefficient: term.coefficient,
        latex,
    }
}
