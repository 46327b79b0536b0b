//! Exact rational arithmetic on `i128`.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Serialize, Serializer};

/// A normalized fraction: `den > 0`, `gcd(|num|, den) == 1` and `num > i128::MIN`,
/// so negation and `abs` never overflow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub const ZERO: Self = Self { num: 0, den: 1 };
    pub const ONE: Self = Self { num: 1, den: 1 };

    /// # Panics
    /// If `den` is zero.
    pub fn new(num: i128, den: i128) -> Self {
        match Self::try_new(num, den) {
            Some(r) => r,
            None => panic!("Rational::new with zero denominator"),
        }
    }

    pub fn try_new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num, den);
        let (mut num, mut den) = (num / g, den / g);
        if den < 0 {
            num = num.checked_neg()?;
            den = den.checked_neg()?;
        }
        if num == i128::MIN {
            return None;
        }
        Some(Self { num, den })
    }

    #[inline]
    const fn from_integer(n: i128) -> Self {
        Self { num: n, den: 1 }
    }

    #[inline]
    pub fn numer(&self) -> i128 {
        self.num
    }

    #[inline]
    pub fn denom(&self) -> i128 {
        self.den
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        self.den == 1
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    pub fn abs(self) -> Self {
        Self {
            num: self.num.abs(),
            den: self.den,
        }
    }

    /// `1 / self`, or `None` for zero.
    pub fn recip(self) -> Option<Self> {
        Self::try_new(self.den, self.num)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let g = gcd(self.den, rhs.den);
        let lhs_scale = rhs.den / g;
        let rhs_scale = self.den / g;
        let num = self
            .num
            .checked_mul(lhs_scale)?
            .checked_add(rhs.num.checked_mul(rhs_scale)?)?;
        Self::try_new(num, self.den.checked_mul(lhs_scale)?)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.checked_add(-rhs)
    }

    /// Sum of `values`, or `None` on overflow.
    pub fn checked_sum(values: impl IntoIterator<Item = Self>) -> Option<Self> {
        values
            .into_iter()
            .try_fold(Self::ZERO, |acc, r| acc.checked_add(r))
    }

    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        // Cross-reduce first to keep intermediates small.
        let g1 = gcd(self.num, rhs.den);
        let g2 = gcd(rhs.num, self.den);
        let num = (self.num / g1).checked_mul(rhs.num / g2)?;
        let den = (self.den / g2).checked_mul(rhs.den / g1)?;
        Self::try_new(num, den)
    }

    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        self.checked_mul(rhs.recip()?)
    }

    /// Parse an unsigned integer or decimal literal (`"26"`, `"1.5"`, `".25"`).
    ///
    /// `None` for anything else, including values that overflow.
    pub fn parse_literal(text: &str) -> Option<Self> {
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut num: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            num = num.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
        }
        let den = 10i128.checked_pow(u32::try_from(frac_part.len()).ok()?)?;
        Self::try_new(num, den)
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Self::from_integer(i128::from(n))
    }
}

impl From<i32> for Rational {
    fn from(n: i32) -> Self {
        Self::from_integer(i128::from(n))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive, so cross-multiplication keeps the order.
        match (
            self.num.checked_mul(other.den),
            other.num.checked_mul(self.den),
        ) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => (self.num as f64 / self.den as f64).total_cmp(&(other.num as f64 / other.den as f64)),
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Operators panic on overflow like the integer operators they wrap.
impl Add for Rational {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        match self.checked_add(rhs) {
            Some(r) => r,
            None => panic!("rational addition overflowed"),
        }
    }
}

impl Sub for Rational {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Mul for Rational {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        match self.checked_mul(rhs) {
            Some(r) => r,
            None => panic!("rational multiplication overflowed"),
        }
    }
}

impl Div for Rational {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        match self.checked_div(rhs) {
            Some(r) => r,
            None => panic!("rational division by zero or overflow"),
        }
    }
}

impl Neg for Rational {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            num: -self.num,
            den: self.den,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl Serialize for Rational {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Integer when integral, else a decimal truncated toward zero to `precision`
/// places with trailing zeros trimmed.
pub fn format_solution(value: Rational, precision: usize) -> String {
    if value.is_integer() {
        return value.num.to_string();
    }
    let Some(scale) = u32::try_from(precision).ok().and_then(|p| 10i128.checked_pow(p)) else {
        return value.to_string();
    };
    let Some(scaled) = value.num.unsigned_abs().checked_mul(scale as u128) else {
        return value.to_string();
    };
    let scaled = scaled / value.den as u128;
    let int_part = scaled / scale as u128;
    let frac_part = scaled % scale as u128;

    let mut out = String::new();
    if value.is_negative() && scaled != 0 {
        out.push('-');
    }
    out.push_str(&int_part.to_string());
    if precision > 0 {
        let digits = format!("{frac_part:0precision$}");
        let digits = digits.trim_end_matches('0');
        if !digits.is_empty() {
            out.push('.');
            out.push_str(digits);
        }
    }
    out
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    // gcd(0, 0) only arises for a zero numerator over a zero denominator, which
    // `try_new` rejects before dividing.
    i128::try_from(a.max(1)).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let max = Rational::try_new(i128::MAX, 1).unwrap();
        assert!(max.checked_add(max).is_none());
        assert!(max.checked_mul(Rational::from(4)).is_none());
        assert!(Rational::checked_sum([max, max, -max]).is_none(), "partial sums overflow");
        assert_eq!(Rational::checked_sum([max, -max]), Some(Rational::ZERO));
        assert!(Rational::try_new(i128::MIN, 1).is_none());
        assert!(Rational::ONE.checked_div(Rational::ZERO).is_none());
        assert_eq!(-max, Rational::try_new(-i128::MAX, 1).unwrap());
    }

    #[test]
    fn normalizes_sign_and_gcd() {
        let r = Rational::new(6, -4);
        assert_eq!((r.numer(), r.denom()), (-3, 2));
        assert_eq!(Rational::new(0, -7), Rational::ZERO);
        assert!(Rational::try_new(1, 0).is_none());
    }

    #[test]
    fn arithmetic_is_exact() {
        let a = Rational::new(4, 5);
        let b = Rational::new(5, 4);
        assert_eq!(a * b, Rational::ONE);
        assert_eq!(Rational::from(8) / a, Rational::from(10));
        assert_eq!(a - a, Rational::ZERO);
        assert_eq!(Rational::new(1, 3) + Rational::new(1, 6), Rational::new(1, 2));
        assert!(Rational::new(-1, 2) < Rational::new(1, 3));
        assert_eq!(Rational::ZERO.recip(), None);
    }

    #[test]
    fn parses_literals() {
        assert_eq!(Rational::parse_literal("26"), Some(Rational::from(26)));
        assert_eq!(Rational::parse_literal("1.5"), Some(Rational::new(3, 2)));
        assert_eq!(Rational::parse_literal(".25"), Some(Rational::new(1, 4)));
        assert_eq!(Rational::parse_literal("."), None);
        assert_eq!(Rational::parse_literal("1.2.3"), None);
        assert_eq!(Rational::parse_literal(&"9".repeat(60)), None, "overflow");
    }

    #[test]
    fn solution_formatting() {
        assert_eq!(format_solution(Rational::new(6, 1), 2), "6");
        assert_eq!(format_solution(Rational::new(-1536, 1000), 3), "-1.536");
        assert_eq!(format_solution(Rational::new(2, 3), 2), "0.66");
        assert_eq!(format_solution(Rational::new(-2, 3), 2), "-0.66");
        assert_eq!(format_solution(Rational::new(1, 2), 4), "0.5");
        assert_eq!(format_solution(Rational::new(-1, 1000), 2), "0");
        assert_eq!(format_solution(Rational::new(7, 2), 0), "3");
    }
}
