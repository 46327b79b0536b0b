//! Crate error type.
//!
//! Scripting bugs (bad patterns, unknown labels, out-of-order reveals) and input bugs
//! (malformed equations) are errors. Expected misses are not: the locator returns
//! `None`/empty and the stepper reports `NoSolution`/`Identity` as a typed outcome.

use thiserror::Error;

use crate::engine::EngineError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The pattern is empty or the rendering engine cannot typeset it.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A fragment label was referenced before it was declared.
    #[error("unknown fragment label {0:?}")]
    UnknownFragmentLabel(String),

    /// A copy-transform referenced a fragment that has not been revealed yet.
    #[error("fragment {fragment} is not visible yet (cursor at {cursor})")]
    SourceNotVisible { fragment: usize, cursor: usize },

    /// A reveal targeted a fragment other than the one under the cursor.
    #[error("fragment {got} revealed out of order, next fragment is {expected}")]
    OutOfOrder { expected: usize, got: usize },

    #[error("malformed equation {input:?}: {reason}")]
    MalformedEquation { input: String, reason: String },

    #[error("equation {0:?} has no variable")]
    NoVariable(String),

    /// The narration has no bookmark with this name.
    #[error("unknown narration bookmark {0:?}")]
    UnknownBookmark(String),

    #[error("rendering engine unavailable: {0}")]
    RenderingEngineUnavailable(String),

    #[error("rendering engine error: {0}")]
    RenderingEngine(#[source] EngineError),

    #[error("invalid tutorial style: {0}")]
    Style(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Error::MalformedEquation {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(msg) => Error::RenderingEngineUnavailable(msg),
            other => Error::RenderingEngine(other),
        }
    }
}
