//! Error taxonomy shared by the compiler, the solver backends and the public API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can stop a graph or solve request from producing a solution.
///
/// [`NoSolution`](FlowError::NoSolution) and [`TimedOut`](FlowError::TimedOut) are verdicts, not bugs;
/// callers should offer the user a different backend or a longer deadline rather than retrying automatically.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The space kind, its dimensions, or the request options are malformed.
    #[error("configuration error: {0}")]
    Config(String),
    /// The space is well-formed but violates a puzzle invariant, e.g. a color without exactly two terminals.
    #[error("validation error: {0}")]
    Validation(String),
    /// The puzzle was proven to have no valid path cover.
    #[error("puzzle has no solution")]
    NoSolution,
    /// No verdict was reached before the deadline elapsed or the request was cancelled.
    #[error("no verdict within {}ms", .0.as_millis())]
    TimedOut(Duration),
    /// The solver failed for reasons unrelated to satisfiability.
    #[error("solver error: {0}")]
    Solver(String),
}

/// Wire tag for a [`FlowError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// [`FlowError::Config`]
    ConfigError,
    /// [`FlowError::Validation`]
    ValidationError,
    /// [`FlowError::NoSolution`]
    NoSolution,
    /// [`FlowError::TimedOut`]
    TimedOut,
    /// [`FlowError::Solver`]
    SolverError,
}

/// The serialized failure shape, `{kind, message}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Which failure this is.
    pub kind: ErrorKind,
    /// The error's display text.
    pub message: String,
}

impl FlowError {
    /// The wire tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::NoSolution => ErrorKind::NoSolution,
            Self::TimedOut(_) => ErrorKind::TimedOut,
            Self::Solver(_) => ErrorKind::SolverError,
        }
    }

    /// This error in its serialized shape.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}
