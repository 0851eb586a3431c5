//! The orchestrator: compile a space, build its constraint model, run one backend and shape the answer for callers.

use std::collections::BTreeMap;
use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::affiliation::UNAFFILIATED;
use crate::compiler::compile;
use crate::config::{SolverConfig, DEFAULT_DEADLINE_MS, MAX_DEADLINE_MS, MIN_DEADLINE_MS};
use crate::error::FlowError;
use crate::graph::{GraphPayload, PuzzleGraph};
use crate::model::{Assignment, ConstraintModel};
use crate::solver::clock::Instant;
use crate::solver::search::DEFAULT_CHECK_INTERVAL;
use crate::solver::{sat, search, Backend, CancelToken, Deadline, Outcome};
use crate::space::Space;

/// Per-request knobs. On the wire: `{ backend, fillRequired, deadlineMs }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOptions {
    /// Which solver answers.
    #[serde(default)]
    pub backend: Backend,
    /// Overrides the space's own `fill` flag when set.
    #[serde(default)]
    pub fill_required: Option<bool>,
    /// Wall-clock budget; must lie in `1 ms ..= 1000 s`.
    #[serde(rename = "deadlineMs", with = "millis", default = "default_deadline")]
    pub deadline: Duration,
    /// Search expansions between deadline checks; ignored by the SAT backend.
    #[serde(default = "default_check_interval")]
    pub check_interval: usize,
}

fn default_deadline() -> Duration {
    Duration::from_millis(DEFAULT_DEADLINE_MS)
}

fn default_check_interval() -> usize {
    DEFAULT_CHECK_INTERVAL
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            fill_required: None,
            deadline: default_deadline(),
            check_interval: default_check_interval(),
        }
    }
}

impl SolveOptions {
    /// The configured defaults.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            backend: config.default_backend,
            fill_required: None,
            deadline: config.default_deadline(),
            check_interval: config.check_interval,
        }
    }

    /// Use `backend` instead.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Override the space's `fill` flag.
    pub fn with_fill(mut self, fill: bool) -> Self {
        self.fill_required = Some(fill);
        self
    }

    /// Use `deadline` instead.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The deadline must lie in `1 ms ..= max_ms`.
    pub fn validate_within(&self, max_ms: u64) -> Result<(), FlowError> {
        let ms = self.deadline.as_millis();
        if ms < u128::from(MIN_DEADLINE_MS) || ms > u128::from(max_ms) {
            return Err(FlowError::Config(format!("deadline must lie in {MIN_DEADLINE_MS}..={max_ms} ms (got {ms})")));
        }
        if self.check_interval == 0 {
            return Err(FlowError::Config("check interval must be at least 1".to_string()));
        }

        Ok(())
    }

    /// [`SolveOptions::validate_within`] the global maximum.
    pub fn validate(&self) -> Result<(), FlowError> {
        self.validate_within(MAX_DEADLINE_MS)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// A solved puzzle: the color of every node (`null` when uncovered), each color's path, and the graph it was solved on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    /// Node name to the color covering it.
    pub node_color: BTreeMap<String, Option<String>>,
    /// Color name to its path, as node names from one terminal to the other.
    pub paths: BTreeMap<String, Vec<String>>,
    /// The compiled graph.
    pub graph: GraphPayload,
}

/// Compile `space` for preview rendering. Never invokes a solver.
pub fn graph(space: &Space) -> Result<GraphPayload, FlowError> {
    Ok(compile(space)?.payload())
}

/// Solve `space` with one backend under the options' deadline.
pub fn solve(space: &Space, options: &SolveOptions) -> Result<SolveResponse, FlowError> {
    solve_with_cancel(space, options, &CancelToken::new())
}

/// As [`solve`], stopping early (as [`FlowError::TimedOut`]) once `cancel` is tripped.
pub fn solve_with_cancel(space: &Space, options: &SolveOptions, cancel: &CancelToken) -> Result<SolveResponse, FlowError> {
    options.validate()?;
    let graph = compile(space)?;
    let fill = options.fill_required.unwrap_or(space.fill);
    let model = ConstraintModel::build(&graph, fill);
    let deadline = Deadline::after(options.deadline, cancel.clone());

    tracing::info!(
        backend = %options.backend,
        fill,
        nodes = graph.node_count(),
        colors = graph.num_colors(),
        deadline_ms = options.deadline.as_millis() as u64,
        "solving"
    );

    let started = Instant::now();
    let outcome = match options.backend {
        Backend::Sat => sat::solve(&model, &deadline),
        Backend::Search => search::solve(&model, &deadline, options.check_interval),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Outcome::Solution(assignment) => {
            tracing::info!(elapsed_ms, "solved");
            respond(&model, &assignment)
        }
        Outcome::NoSolution => {
            tracing::info!(elapsed_ms, "no solution");
            Err(FlowError::NoSolution)
        }
        Outcome::TimedOut => {
            tracing::info!(elapsed_ms, cancelled = cancel.is_cancelled(), "timed out");
            Err(FlowError::TimedOut(options.deadline))
        }
        Outcome::SolverError(message) => {
            tracing::error!(
                backend = %options.backend,
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                colors = graph.num_colors(),
                %message,
                "solver failed"
            );
            Err(FlowError::Solver(message))
        }
    }
}

fn respond(model: &ConstraintModel, assignment: &Assignment) -> Result<SolveResponse, FlowError> {
    let graph: &PuzzleGraph = model.graph();
    let paths = model.paths(assignment)
        .ok_or_else(|| FlowError::Solver("solution does not decode into one path per color".to_string()))?;

    let node_color = graph.node_ids()
        .map(|node| {
            let affiliation = assignment.node_colors[node.index()];
            let color = (affiliation != UNAFFILIATED)
                .then(|| graph.color(affiliation).map(|color| color.0.clone()))
                .flatten();
            (graph.name(node).to_string(), color)
        })
        .collect();

    let paths = graph.colors().iter()
        .zip(paths)
        .map(|(color, path)| (color.0.clone(), path.into_iter().map(|node| graph.name(node).to_string()).collect_vec()))
        .collect();

    Ok(SolveResponse {
        node_color,
        paths,
        graph: graph.payload(),
    })
}

/// [`graph`] over JSON text.
pub fn graph_json(space_json: &str) -> Result<String, FlowError> {
    let space = Space::from_json(space_json)?;
    Ok(serde_json::to_string(&graph(&space)?)?)
}

/// [`solve`] over JSON text; empty options text means defaults.
pub fn solve_json(space_json: &str, options_json: &str) -> Result<String, FlowError> {
    let space = Space::from_json(space_json)?;
    let options = match options_json.trim() {
        "" => SolveOptions::default(),
        text => serde_json::from_str(text)?,
    };
    Ok(serde_json::to_string(&solve(&space, &options)?)?)
}
