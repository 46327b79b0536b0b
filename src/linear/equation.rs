//! One-variable linear equations: parsing, derived coefficients, classification and
//! the three printed forms (canonical, display, LaTeX).

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use super::rational::Rational;
use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// One additive term of a side: `coefficient · variable` or a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub coefficient: Rational,
    pub is_variable: bool,
    pub side: Side,
    /// Bytes of the term in the parsed string. A `-` sign is included, a `+` is not.
    pub span: Range<usize>,
    /// Bytes of the variable letter, for variable terms.
    pub variable_span: Option<Range<usize>>,
}

/// `(type, format)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EquationShape {
    pub equation_type: u8,
    pub format: u8,
}

/// A parsed linear equation in one variable.
///
/// Equality is structural on the canonical form: the variable and the four derived
/// coefficients. Term order, spelling and spans do not take part.
#[derive(Debug, Clone)]
pub struct LinearEquation {
    source: String,
    variable: char,
    lhs: Vec<Term>,
    rhs: Vec<Term>,
    /// `[variable coefficient, constant]` per side, summed once at parse time.
    sums: [[Rational; 2]; 2],
}

impl PartialEq for LinearEquation {
    fn eq(&self, other: &Self) -> bool {
        self.variable == other.variable
            && self.lhs_var_coeff() == other.lhs_var_coeff()
            && self.lhs_const() == other.lhs_const()
            && self.rhs_var_coeff() == other.rhs_var_coeff()
            && self.rhs_const() == other.rhs_const()
    }
}

impl LinearEquation {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.split('=');
        let (Some(left), Some(right), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::malformed(input, "expected exactly one `=`"));
        };
        let mut variable = None;
        let lhs = parse_side(input, left, 0, Side::Left, &mut variable)?;
        let rhs = parse_side(input, right, left.len() + 1, Side::Right, &mut variable)?;
        let Some(variable) = variable else {
            return Err(Error::NoVariable(input.to_string()));
        };
        let sums = [side_sums(input, &lhs)?, side_sums(input, &rhs)?];
        Ok(Self {
            source: input.to_string(),
            variable,
            lhs,
            rhs,
            sums,
        })
    }

    /// Build from `(coefficient, is_variable)` lists; the result is parsed back from
    /// its display form so spans index [`LinearEquation::source`].
    pub fn from_terms(variable: char, lhs: &[(Rational, bool)], rhs: &[(Rational, bool)]) -> Result<Self> {
        let text = format!(
            "{} = {}",
            side_text(variable, lhs, Style::Display),
            side_text(variable, rhs, Style::Display)
        );
        Self::parse(&text)
    }

    /// The string this equation was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variable(&self) -> char {
        self.variable
    }

    pub fn side(&self, side: Side) -> &[Term] {
        match side {
            Side::Left => &self.lhs,
            Side::Right => &self.rhs,
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.lhs.iter().chain(self.rhs.iter())
    }

    pub fn var_coeff(&self, side: Side) -> Rational {
        self.sums[side as usize][0]
    }

    pub fn constant(&self, side: Side) -> Rational {
        self.sums[side as usize][1]
    }

    pub fn lhs_var_coeff(&self) -> Rational {
        self.var_coeff(Side::Left)
    }

    pub fn lhs_const(&self) -> Rational {
        self.constant(Side::Left)
    }

    pub fn rhs_var_coeff(&self) -> Rational {
        self.var_coeff(Side::Right)
    }

    pub fn rhs_const(&self) -> Rational {
        self.constant(Side::Right)
    }

    pub fn multiple_variables(&self) -> bool {
        !self.lhs_var_coeff().is_zero() && !self.rhs_var_coeff().is_zero()
    }

    pub fn multiple_constants(&self) -> bool {
        !self.lhs_const().is_zero() && !self.rhs_const().is_zero()
    }

    pub fn var_terms(&self, side: Side) -> usize {
        self.side(side).iter().filter(|t| t.is_variable).count()
    }

    pub fn const_terms(&self, side: Side) -> usize {
        self.side(side).iter().filter(|t| !t.is_variable).count()
    }

    pub fn has_variable(&self, side: Side) -> bool {
        self.var_terms(side) > 0
    }

    pub fn has_constant(&self, side: Side) -> bool {
        self.const_terms(side) > 0
    }

    /// The side that keeps the variable when both sides carry one: the larger
    /// coefficient wins, ties go left. With only one variable side, that side.
    pub fn variable_side(&self) -> Side {
        match (self.has_variable(Side::Left), self.has_variable(Side::Right)) {
            (true, true) if self.rhs_var_coeff() > self.lhs_var_coeff() => Side::Right,
            (false, true) => Side::Right,
            _ => Side::Left,
        }
    }

    /// Type comes from the summed coefficients, so terms that cancel on one side
    /// do not count; format looks at the terms as written.
    pub fn classify(&self) -> EquationShape {
        let equation_type = match (self.multiple_variables(), self.multiple_constants()) {
            (true, true) => 1,
            (true, false) => 2,
            (false, true) => 3,
            (false, false) => 4,
        };
        let primary = self.variable_side();
        let constant_first = self
            .side(primary)
            .iter()
            .position(|t| t.is_variable)
            .is_some_and(|first_var| self.side(primary)[..first_var].iter().any(|t| !t.is_variable));
        let format = 1 + 2 * u8::from(primary == Side::Right) + u8::from(constant_first);
        EquationShape {
            equation_type,
            format,
        }
    }

    /// Progress measure for the stepper; strictly decreases with every emitted step.
    ///
    /// `(both sides carry the variable, variable terms not yet combined,
    ///   constants not yet collected opposite the variable, coefficient ≠ 1)`
    pub fn rank(&self) -> (bool, bool, bool, bool) {
        let side = self.variable_side();
        let both = self.has_variable(Side::Left) && self.has_variable(Side::Right);
        let split = self.var_terms(side) > 1;
        let misplaced = self.has_constant(side) || self.const_terms(side.other()) > 1;
        let coeff = self.var_coeff(side) != Rational::ONE;
        (both, split, misplaced, coeff)
    }

    /// Canonical whitespace-free form (`"4/5x=8"`).
    pub fn formatted(&self) -> String {
        format!(
            "{}={}",
            side_text(self.variable, &pairs(&self.lhs), Style::Canonical),
            side_text(self.variable, &pairs(&self.rhs), Style::Canonical)
        )
    }

    /// Human display form (`"4/5 x - 9 = -1"`).
    pub fn display(&self) -> String {
        format!(
            "{} = {}",
            side_text(self.variable, &pairs(&self.lhs), Style::Display),
            side_text(self.variable, &pairs(&self.rhs), Style::Display)
        )
    }

    /// Typesetting source (`"\frac{4}{5}x - 9 = -1"`).
    pub fn to_latex(&self) -> String {
        format!(
            "{} = {}",
            side_text(self.variable, &pairs(&self.lhs), Style::Latex),
            side_text(self.variable, &pairs(&self.rhs), Style::Latex)
        )
    }
}

impl fmt::Display for LinearEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl std::str::FromStr for LinearEquation {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Combined variable coefficient and constant of one side.
fn side_sums(input: &str, terms: &[Term]) -> Result<[Rational; 2]> {
    let sum = |variable: bool| {
        Rational::checked_sum(
            terms
                .iter()
                .filter(|t| t.is_variable == variable)
                .map(|t| t.coefficient),
        )
        .ok_or_else(|| Error::malformed(input, "coefficient overflow"))
    };
    Ok([sum(true)?, sum(false)?])
}

/// Canonical whitespace-free source form of `eq`.
pub fn equation_formatted(eq: &LinearEquation) -> String {
    eq.formatted()
}

fn pairs(terms: &[Term]) -> Vec<(Rational, bool)> {
    terms.iter().map(|t| (t.coefficient, t.is_variable)).collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Style {
    Canonical,
    Display,
    Latex,
}

pub(crate) fn side_text(variable: char, terms: &[(Rational, bool)], style: Style) -> String {
    if terms.is_empty() {
        return "0".to_string();
    }
    let mut out = String::new();
    for (i, &(coefficient, is_variable)) in terms.iter().enumerate() {
        let negative = coefficient.is_negative();
        if i == 0 {
            if negative {
                out.push('-');
            }
        } else {
            let sign = if negative { '-' } else { '+' };
            match style {
                Style::Canonical => out.push(sign),
                Style::Display | Style::Latex => {
                    out.push(' ');
                    out.push(sign);
                    out.push(' ');
                }
            }
        }
        out.push_str(&magnitude_text(variable, coefficient.abs(), is_variable, style));
    }
    out
}

/// Unsigned text of one term.
pub(crate) fn magnitude_text(variable: char, magnitude: Rational, is_variable: bool, style: Style) -> String {
    let number = number_text(magnitude, style);
    if !is_variable {
        return number;
    }
    if magnitude == Rational::ONE {
        return variable.to_string();
    }
    match style {
        Style::Display if !magnitude.is_integer() => format!("{number} {variable}"),
        _ => format!("{number}{variable}"),
    }
}

pub(crate) fn number_text(magnitude: Rational, style: Style) -> String {
    if magnitude.is_integer() || style != Style::Latex {
        magnitude.to_string()
    } else {
        format!(r"\frac{{{}}}{{{}}}", magnitude.numer(), magnitude.denom())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Rational),
    Letter(char),
    Plus,
    Minus,
    Star,
    Slash,
}

fn tokenize(input: &str, text: &str, offset: usize) -> Result<Vec<(Token, Range<usize>)>> {
    let mut out = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let start = offset + i;
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' | '−' => Token::Minus,
            '*' | '·' | '×' => Token::Star,
            '/' => Token::Slash,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = i + c.len_utf8();
                while let Some(&(j, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = j + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &text[i..end];
                let value = Rational::parse_literal(literal)
                    .ok_or_else(|| Error::malformed(input, format!("bad numeric literal `{literal}`")))?;
                out.push((Token::Number(value), start..offset + end));
                continue;
            }
            c if c.is_alphabetic() => Token::Letter(c),
            other => return Err(Error::malformed(input, format!("unexpected character `{other}`"))),
        };
        out.push((token, start..start + c.len_utf8()));
    }
    Ok(out)
}

fn parse_side(
    input: &str,
    text: &str,
    offset: usize,
    side: Side,
    variable: &mut Option<char>,
) -> Result<Vec<Term>> {
    let tokens = tokenize(input, text, offset)?;
    if tokens.is_empty() {
        let which = match side {
            Side::Left => "left",
            Side::Right => "right",
        };
        return Err(Error::malformed(input, format!("empty {which} side")));
    }

    let mut terms = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        // Optional sign. Between terms it is the binary operator.
        let mut negative = false;
        let mut start = None;
        match tokens[i].0 {
            Token::Plus => i += 1,
            Token::Minus => {
                negative = true;
                start = Some(tokens[i].1.start);
                i += 1;
            }
            _ if !terms.is_empty() => {
                return Err(Error::malformed(input, "expected `+` or `-` between terms"));
            }
            _ => {}
        }
        if matches!(tokens.get(i).map(|t| &t.0), Some(Token::Plus | Token::Minus)) {
            return Err(Error::malformed(input, "consecutive signs"));
        }

        let mut coefficient = Rational::ONE;
        let mut variable_span = None;
        let mut end = None;
        let mut expect_factor = true;
        while let Some((token, span)) = tokens.get(i) {
            match token {
                Token::Plus | Token::Minus => break,
                Token::Number(n) => {
                    coefficient = coefficient
                        .checked_mul(*n)
                        .ok_or_else(|| Error::malformed(input, "coefficient overflow"))?;
                }
                Token::Letter(c) => {
                    match *variable {
                        Some(v) if v != *c => {
                            return Err(Error::malformed(input, format!("more than one variable (`{v}`, `{c}`)")));
                        }
                        _ => *variable = Some(*c),
                    }
                    if variable_span.is_some() {
                        return Err(Error::malformed(input, "not linear: variable appears twice in a term"));
                    }
                    variable_span = Some(span.clone());
                }
                Token::Star => {
                    if expect_factor {
                        return Err(Error::malformed(input, "`*` without a left operand"));
                    }
                    expect_factor = true;
                    i += 1;
                    continue;
                }
                Token::Slash => {
                    if expect_factor {
                        return Err(Error::malformed(input, "`/` without a left operand"));
                    }
                    let Some((Token::Number(d), d_span)) = tokens.get(i + 1) else {
                        return Err(Error::malformed(input, "can only divide by a numeric literal"));
                    };
                    coefficient = coefficient
                        .checked_div(*d)
                        .ok_or_else(|| Error::malformed(input, "division by zero"))?;
                    start.get_or_insert(span.start);
                    end = Some(d_span.end);
                    expect_factor = false;
                    i += 2;
                    continue;
                }
            }
            start.get_or_insert(span.start);
            end = Some(span.end);
            expect_factor = false;
            i += 1;
        }
        let (Some(start), Some(end)) = (start, end) else {
            return Err(Error::malformed(input, "dangling sign"));
        };
        if expect_factor {
            return Err(Error::malformed(input, "`*` without a right operand"));
        }
        if negative {
            coefficient = -coefficient;
        }
        terms.push(Term {
            coefficient,
            is_variable: variable_span.is_some(),
            side,
            span: start..end,
            variable_span,
        });
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(s: &str) -> LinearEquation {
        LinearEquation::parse(s).unwrap()
    }

    #[test]
    fn parses_coefficients_and_spans() {
        let e = eq("4n - 26 = -2");
        assert_eq!(e.variable(), 'n');
        assert_eq!(e.lhs_var_coeff(), Rational::from(4));
        assert_eq!(e.lhs_const(), Rational::from(-26));
        assert_eq!(e.rhs_const(), Rational::from(-2));
        let spans: Vec<&str> = e.terms().map(|t| &e.source()[t.span.clone()]).collect();
        assert_eq!(spans, ["4n", "- 26", "-2"]);
        assert_eq!(e.side(Side::Left)[0].variable_span, Some(1..2));
    }

    #[test]
    fn fractions_before_and_after_the_variable() {
        assert_eq!(eq("2x/3 = 1").lhs_var_coeff(), Rational::new(2, 3));
        assert_eq!(eq("2/3x = 1").lhs_var_coeff(), Rational::new(2, 3));
        assert_eq!(eq("4/5 x - 9 = -1").lhs_var_coeff(), Rational::new(4, 5));
        assert_eq!(eq("3 * x = 0.5").rhs_const(), Rational::new(1, 2));
        assert_eq!(eq("-x = 3").lhs_var_coeff(), Rational::from(-1));
    }

    #[test]
    fn malformed_inputs() {
        for bad in [
            "4n - 26",
            "x = 1 = 2",
            "x + y = 1",
            "x x = 1",
            "2x/y = 1",
            " = 3",
            "x - = 3",
            "x + -3 = 1",
            "x / 0 = 1",
            "(x) = 1",
            "3 4x + = 1",
        ] {
            assert!(
                matches!(LinearEquation::parse(bad), Err(Error::MalformedEquation { .. })),
                "{bad:?}"
            );
        }
        assert!(matches!(
            LinearEquation::parse("3 = 4"),
            Err(Error::NoVariable(_))
        ));
    }

    #[test]
    fn classification_types() {
        assert_eq!(eq("2x + 1 = x + 3").classify().equation_type, 1);
        assert_eq!(eq("2n = -4n + 12").classify().equation_type, 2);
        assert_eq!(eq("4n - 26 = -2").classify().equation_type, 3);
        assert_eq!(eq("4n = 24").classify().equation_type, 4);
    }

    #[test]
    fn cancelled_terms_do_not_count_towards_the_type() {
        let cancelled = eq("x - x + 3 = 2x");
        assert!(!cancelled.multiple_variables());
        assert!(!cancelled.multiple_constants());
        assert_eq!(cancelled.classify().equation_type, 4);
        assert_eq!(eq("x + 3 = 2x + 5 - 5").classify().equation_type, 2);
        for input in ["x - x + 3 = 2x", "2x + 1 = x + 3", "4n - 26 = -2", "x + 3 = 2x + 5 - 5"] {
            let e = eq(input);
            let t = e.classify().equation_type;
            assert_eq!(t <= 2, e.multiple_variables(), "{input}");
            assert_eq!(t == 1 || t == 3, e.multiple_constants(), "{input}");
        }
    }

    #[test]
    fn classification_formats() {
        assert_eq!(eq("4n - 26 = -2").classify().format, 1);
        assert_eq!(eq("5 - 2u = 11").classify().format, 2);
        assert_eq!(eq("11 = 2u + 5").classify().format, 3);
        assert_eq!(eq("11 = 5 - 2u").classify().format, 4);
        // Right side keeps the variable: 3 > 1.
        assert_eq!(eq("x + 3 = 3x").classify().format, 3);
    }

    #[test]
    fn printed_forms() {
        let e = eq("2x/3 - 9 = -1");
        assert_eq!(e.formatted(), "2/3x-9=-1");
        assert_eq!(e.display(), "2/3 x - 9 = -1");
        assert_eq!(e.to_latex(), r"\frac{2}{3}x - 9 = -1");
        assert_eq!(eq("1n = -1 n").formatted(), "n=-n");
        assert_eq!(equation_formatted(&eq("4n   -26= -2")), "4n-26=-2");
    }

    #[test]
    fn canonical_round_trip() {
        for s in ["4n - 26 = -2", "2x/3 + 1 = 5 - x", "-y = 0.25", "7 = 3t - 2/7"] {
            let e = eq(s);
            assert_eq!(eq(&equation_formatted(&e)), e, "{s}");
            assert_eq!(eq(&e.display()), e, "{s}");
        }
    }

    #[test]
    fn equality_is_canonical() {
        assert_eq!(eq("4n - 26 = -2"), eq("-26 + 4n = -2"));
        assert_ne!(eq("4n = 2"), eq("4m = 2"));
        assert_ne!(eq("4n = 2"), eq("2 = 4n"));
    }

    #[test]
    fn from_terms_parses_its_own_display() {
        let e = LinearEquation::from_terms(
            'x',
            &[(Rational::new(4, 5), true)],
            &[(Rational::from(8), false)],
        )
        .unwrap();
        assert_eq!(e.source(), "4/5 x = 8");
        let empty = LinearEquation::from_terms('x', &[(Rational::from(6), true)], &[]).unwrap();
        assert_eq!(empty.source(), "6x = 0");
    }
}
