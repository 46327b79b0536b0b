//! Font outline plumbing for the Typst typesetter.
//!
//! Glyphs are identified by their outlines, not by glyph ids: two glyphs are the
//! same shape when their contours (scaled to the rendered size) agree. This lets
//! an expression and a search pattern typeset in separate documents match even if
//! the faces were loaded in a different order.
//!
//! - [`outline::glyph_outline`] extracts a glyph as a `lyon::path::Path` in font units.
//! - [`outline::OutlineHash`] quantizes the contour events into a stable key.

pub mod outline;

pub use outline::{GlyphOutline, OutlineHash, glyph_outline};

/// Errors produced by the outline layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    #[error("font face has no units-per-em")]
    InvalidUnitsPerEm,

    #[error("glyph outline not found for glyph id {glyph_id}")]
    MissingGlyph { glyph_id: u16 },
}
