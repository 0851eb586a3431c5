//! Solver backends and the bits they share: the [`Outcome`] of one attempt, the [`Deadline`] it runs under, and the [`CancelToken`] a caller may trip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::Assignment;

pub mod clock;
pub mod sat;
pub mod search;

use self::clock::Instant;

/// Which strategy answers a solve request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// Clause encoding handed to the CDCL solver.
    #[default]
    #[serde(alias = "smt")]
    #[strum(to_string = "sat", serialize = "smt")]
    Sat,
    /// Depth-first search with pruning, no external solver.
    #[serde(alias = "dfs")]
    #[strum(to_string = "search", serialize = "dfs")]
    Search,
}

/// Result of one backend run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// A verified assignment.
    Solution(Assignment),
    /// The search space was exhausted, or the solver proved unsatisfiability.
    NoSolution,
    /// The deadline elapsed or the request was cancelled before a verdict.
    TimedOut,
    /// The solver failed for reasons unrelated to the puzzle.
    SolverError(String),
}

/// A shared flag that stops a running solve at its next deadline check.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token nobody has tripped yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every solve holding a clone of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Wall-clock limit of one solve, plus the caller's cancellation flag.
#[derive(Clone, Debug)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
    cancel: CancelToken,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration, cancel: CancelToken) -> Self {
        Self { started: Instant::now(), budget, cancel }
    }

    /// Whether the solve must stop now.
    pub fn expired(&self) -> bool {
        self.cancel.is_cancelled() || self.started.elapsed() >= self.budget
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }

    /// The flag this deadline also stops on.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}
