//! Renderer-agnostic 2D geometry and color.
//!
//! Conventions shared by every module in this crate:
//! - Coordinates are in **pt**. Typeset output (Typst or headless) is laid out in pt
//!   with the baseline origin at (0, 0); scene composition keeps pt end-to-end.
//! - The y axis points **down** inside a typeset expression (Typst convention) and
//!   in the scroll viewport: fragment `n + 1` sits below fragment `n`.
//! - Transforms are explicit and composable (matrix order matters).
//!
//! This file does not depend on Typst or on any rendering engine.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 2D affine transform, column-major 3x3, acting on column vectors `(x, y, 1)`.
///
/// Placements compose as `world_from_fragment.mul(fragment_from_part)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    pub m: [[f32; 3]; 3],
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    #[inline]
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [tx, ty, 1.0]],
        }
    }

    #[inline]
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Compose transforms: `self * rhs`.
    ///
    /// With column-vector convention, rhs applies first, then self.
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        let a = self.m;
        let b = rhs.m;

        let mut out = [[0.0f32; 3]; 3];
        for col in 0..3 {
            for row in 0..3 {
                out[col][row] =
                    a[0][row] * b[col][0] + a[1][row] * b[col][1] + a[2][row] * b[col][2];
            }
        }
        Self { m: out }
    }

    #[inline]
    pub fn transform_point(self, x: f32, y: f32) -> (f32, f32) {
        let nx = self.m[0][0] * x + self.m[1][0] * y + self.m[2][0];
        let ny = self.m[0][1] * x + self.m[1][1] * y + self.m[2][1];
        (nx, ny)
    }

    /// Conservative bounds of `b` after this transform (all four corners are mapped).
    pub fn transform_aabb(self, b: Aabb2) -> Aabb2 {
        if b.is_empty() {
            return b;
        }
        let mut out = Aabb2::empty();
        for c in [
            [b.min[0], b.min[1]],
            [b.max[0], b.min[1]],
            [b.max[0], b.max[1]],
            [b.min[0], b.max[1]],
        ] {
            let (x, y) = self.transform_point(c[0], c[1]);
            out.include_point([x, y]);
        }
        out
    }

    /// Translation part of the transform.
    #[inline]
    pub fn translation(self) -> [f32; 2] {
        [self.m[2][0], self.m[2][1]]
    }
}

/// Axis-aligned box in pt. [`Aabb2::empty`] is the union identity.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Aabb2 {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Aabb2 {
    #[inline]
    pub fn from_min_max(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY, f32::INFINITY],
            max: [f32::NEG_INFINITY, f32::NEG_INFINITY],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    #[inline]
    pub fn include_point(&mut self, p: [f32; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    #[inline]
    pub fn center(&self) -> [f32; 2] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        ]
    }

    #[inline]
    pub fn size(&self) -> [f32; 2] {
        if self.is_empty() {
            return [0.0, 0.0];
        }
        [self.max[0] - self.min[0], self.max[1] - self.min[1]]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size()[0]
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size()[1]
    }
}

/// Simple RGBA color.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    // Tutorial palette.
    pub const BLUE: Self = Self::rgb(0.345, 0.769, 0.867);
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.514, 0.757, 0.404);
    pub const RED: Self = Self::rgb(0.988, 0.384, 0.333);
    pub const ORANGE: Self = Self::rgb(1.0, 0.525, 0.184);

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| -> Option<f32> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 1.0 },
        })
    }

    /// Format as `#RRGGBB` (or `#RRGGBBAA` when not opaque).
    pub fn to_hex(&self) -> String {
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02X}{:02X}{:02X}", to_u8(self.r), to_u8(self.g), to_u8(self.b))
        } else {
            format!(
                "#{:02X}{:02X}{:02X}{:02X}",
                to_u8(self.r),
                to_u8(self.g),
                to_u8(self.b),
                to_u8(self.a)
            )
        }
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgba::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color {s:?}, expected #RRGGBB")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_then_scale_composes_right_to_left() {
        let xf = Affine2::translate(10.0, 0.0).mul(Affine2::scale(2.0, 2.0));
        assert_eq!(xf.transform_point(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn transformed_aabb_covers_all_corners() {
        let b = Aabb2::from_min_max([0.0, 0.0], [2.0, 1.0]);
        let out = Affine2::translate(0.0, 5.0).transform_aabb(b);
        assert_eq!(out, Aabb2::from_min_max([0.0, 5.0], [2.0, 6.0]));
    }

    #[test]
    fn empty_union_is_identity() {
        let b = Aabb2::from_min_max([1.0, 1.0], [2.0, 2.0]);
        assert_eq!(Aabb2::empty().union(b), b);
        assert_eq!(Aabb2::empty().size(), [0.0, 0.0]);
    }

    #[test]
    fn hex_colors_round_trip() {
        let c = Rgba::from_hex("#FF8000").unwrap();
        assert_eq!(c.to_hex(), "#FF8000");
        assert!(Rgba::from_hex("#12").is_none());
        assert!(Rgba::from_hex("zzzzzz").is_none());
    }
}
