//! Solver configuration: worker count, default backend and deadline bounds.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::solver::search::DEFAULT_CHECK_INTERVAL;
use crate::solver::Backend;

/// Shortest deadline a request may ask for.
pub const MIN_DEADLINE_MS: u64 = 1;
/// Longest deadline a request may ask for.
pub const MAX_DEADLINE_MS: u64 = 1_000_000;
/// Deadline of a request that names none.
pub const DEFAULT_DEADLINE_MS: u64 = 30_000;

/// Process-wide solver settings; per-request [`SolveOptions`](crate::SolveOptions) start from these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    /// Size of the solve pool; `0` uses one worker per available core.
    pub workers: usize,
    /// Backend of a request that names none.
    pub default_backend: Backend,
    /// Deadline of a request that names none.
    pub default_deadline_ms: u64,
    /// Upper bound on any request's deadline.
    pub max_deadline_ms: u64,
    /// Search expansions between deadline checks.
    pub check_interval: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            default_backend: Backend::Sat,
            default_deadline_ms: DEFAULT_DEADLINE_MS,
            max_deadline_ms: MAX_DEADLINE_MS,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, fallback: T) -> Result<T, FlowError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse()
            .map_err(|_| FlowError::Config(format!("{name} has an invalid value: {raw:?}"))),
        Err(env::VarError::NotPresent) => Ok(fallback),
        Err(err) => Err(FlowError::Config(format!("{name}: {err}"))),
    }
}

impl SolverConfig {
    /// Defaults overridden by `FLOWCOVER_WORKERS`, `FLOWCOVER_BACKEND`, `FLOWCOVER_DEADLINE_MS`,
    /// `FLOWCOVER_MAX_DEADLINE_MS` and `FLOWCOVER_CHECK_INTERVAL`, then validated.
    pub fn from_env() -> Result<Self, FlowError> {
        let defaults = Self::default();
        let config = Self {
            workers: parse_var("FLOWCOVER_WORKERS", defaults.workers)?,
            default_backend: parse_var("FLOWCOVER_BACKEND", defaults.default_backend)?,
            default_deadline_ms: parse_var("FLOWCOVER_DEADLINE_MS", defaults.default_deadline_ms)?,
            max_deadline_ms: parse_var("FLOWCOVER_MAX_DEADLINE_MS", defaults.max_deadline_ms)?,
            check_interval: parse_var("FLOWCOVER_CHECK_INTERVAL", defaults.check_interval)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Both deadlines must lie within the global bounds, the default within the maximum.
    pub fn validate(&self) -> Result<(), FlowError> {
        if !(MIN_DEADLINE_MS..=MAX_DEADLINE_MS).contains(&self.max_deadline_ms) {
            return Err(FlowError::Config(format!(
                "max deadline must lie in {MIN_DEADLINE_MS}..={MAX_DEADLINE_MS} ms (got {})",
                self.max_deadline_ms
            )));
        }
        if !(MIN_DEADLINE_MS..=self.max_deadline_ms).contains(&self.default_deadline_ms) {
            return Err(FlowError::Config(format!(
                "default deadline must lie in {MIN_DEADLINE_MS}..={} ms (got {})",
                self.max_deadline_ms, self.default_deadline_ms
            )));
        }
        if self.check_interval == 0 {
            return Err(FlowError::Config("check interval must be at least 1".to_string()));
        }

        Ok(())
    }

    /// [`SolverConfig::default_deadline_ms`] as a [`Duration`].
    pub fn default_deadline(&self) -> Duration {
        Duration::from_millis(self.default_deadline_ms)
    }
}
