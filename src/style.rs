//! Tutorial-wide style: palette, timings and viewport geometry.
//!
//! One `TutorialStyle` value is threaded through the scroll manager, the annotator and
//! the driver. Missing YAML keys fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scene::Rgba;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub text: Rgba,
    pub variable: Rgba,
    pub constant: Rgba,
    pub solution: Rgba,
    pub annotation: Rgba,
    pub highlight: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: Rgba::WHITE,
            variable: Rgba::BLUE,
            constant: Rgba::ORANGE,
            solution: Rgba::GREEN,
            annotation: Rgba::YELLOW,
            highlight: Rgba::YELLOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub write_s: f32,
    pub fade_s: f32,
    pub transform_s: f32,
    pub scroll_s: f32,
    pub indicate_s: f32,
    /// Pause after each step when no narration drives the pacing.
    pub pause_s: f32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            write_s: 1.0,
            fade_s: 0.6,
            transform_s: 1.0,
            scroll_s: 0.8,
            indicate_s: 0.6,
            pause_s: 0.5,
        }
    }
}

/// Default reveal animation for `prepare_next`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reveal {
    #[default]
    Write,
    FadeIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorialStyle {
    pub palette: Palette,
    pub timings: Timings,
    pub font_size_pt: f32,
    /// Height available for fragments, in pt.
    pub viewport_height_pt: f32,
    /// Top edge of the viewport in scene coordinates (y down).
    pub viewport_top_pt: f32,
    /// Vertical gap between consecutive fragments, in pt.
    pub fragment_gap_pt: f32,
    /// Horizontal gap between parts bundled into one fragment, in pt.
    pub part_gap_pt: f32,
    /// Scroll older fragments away automatically when a reveal would overflow.
    pub auto_scroll: bool,
    pub reveal: Reveal,
    /// Decimal places for non-integral solutions.
    pub solution_precision: usize,
}

impl Default for TutorialStyle {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            timings: Timings::default(),
            font_size_pt: 24.0,
            viewport_height_pt: 360.0,
            viewport_top_pt: 0.0,
            fragment_gap_pt: 12.0,
            part_gap_pt: 16.0,
            auto_scroll: true,
            reveal: Reveal::Write,
            solution_precision: 2,
        }
    }
}

impl TutorialStyle {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let style: TutorialStyle = serde_yaml::from_str(content)?;
        log::debug!("loaded tutorial style: {style:?}");
        Ok(style)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let style = TutorialStyle::from_yaml_str(
            r##"
viewport_height_pt: 200
palette:
  variable: "#FF0000"
timings:
  write_s: 2.5
"##,
        )
        .unwrap();
        assert_eq!(style.viewport_height_pt, 200.0);
        assert_eq!(style.palette.variable, Rgba::rgb(1.0, 0.0, 0.0));
        assert_eq!(style.palette.constant, Palette::default().constant);
        assert_eq!(style.timings.write_s, 2.5);
        assert_eq!(style.timings.fade_s, Timings::default().fade_s);
        assert_eq!(style.solution_precision, 2);
    }

    #[test]
    fn bad_color_is_a_style_error() {
        let err = TutorialStyle::from_yaml_str("palette:\n  text: nope\n").unwrap_err();
        assert!(matches!(err, crate::Error::Style(_)), "{err}");
    }

    #[test]
    fn yaml_round_trip() {
        let style = TutorialStyle {
            reveal: Reveal::FadeIn,
            ..TutorialStyle::default()
        };
        let yaml = style.to_yaml_string().unwrap();
        let back = TutorialStyle::from_yaml_str(&yaml).unwrap();
        assert_eq!(back.reveal, Reveal::FadeIn);
        assert_eq!(back.viewport_height_pt, style.viewport_height_pt);
    }
}
