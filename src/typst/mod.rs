//! Typst integration layer.
//!
//! Real typesetting for tutorials: the LaTeX-ish notation is translated to Typst
//! math, compiled in an in-memory world with embedded fonts, and the resulting
//! frames are flattened into [`crate::engine::Expression`]s whose shape keys come
//! from glyph outline hashes.
//!
//! ```no_run
//! use stepcast::engine::Typesetter;
//! use stepcast::typst::{TypstEngine, TypstOptions};
//!
//! let mut engine = TypstEngine::new(TypstOptions::default())?;
//! let expr = engine.typeset(r"\frac{4}{5}x - 9 = -1")?;
//! assert!(!expr.is_empty());
//! # Ok::<(), stepcast::engine::EngineError>(())
//! ```

pub mod engine;

pub use engine::{FontOptions, TypstEngine, TypstOptions};
