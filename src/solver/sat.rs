//! The SAT backend: translate the constraint model into CNF and hand it to `varisat`.
//!
//! # Logical setup
//! Suppose the puzzle graph is G with k colors, and let A range over the nonzero affiliations `1..=k`.
//!
//! ## Vertices
//! If V is a terminal, its affiliation is known and all other affiliations are incorrect; we tell the solver to assume so.
//! Exactly one incident edge has the same affiliation (the edge by which the path leaves this terminal),
//! and exactly one incident edge is used at all.
//!
//! Otherwise V has exactly one affiliation, which may be 0 unless every node must be covered.
//! If V has affiliation A, at least one incident edge has affiliation A, each such edge implies another, and no three exist;
//! together, exactly two incident edges carry A.
//!
//! ## Edges
//! Every edge E has exactly one affiliation, which may be 0.
//! If E has affiliation A, both its endpoints have affiliation A. The converse is not encoded: two adjacent cells of one color
//! need not be consecutive on that color's path.
//!
//! ## Cycles
//! The degree rules above admit solutions in which a color's path is accompanied by a detached loop of the same color.
//! Rather than encode connectivity up front, we solve, look for such loops, forbid each one in every color with a single clause,
//! and solve again incrementally until the model is loop-free or the solver proves there is no solution.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use itertools::Itertools;
use varisat::checker::{CheckedProofStep, CheckerData, ProofProcessor};
use varisat::solver::SolverError;
use varisat::{CnfFormula, Lit, Solver, Var};

use crate::affiliation::{AffiliationID, UNAFFILIATED};
use crate::logic::{at_most_two, exactly_one, implies_any};
use crate::model::{Assignment, Constraint, ConstraintModel, EdgeIndex};
use crate::solver::{Deadline, Outcome};

/// How often a waiting caller looks at its cancellation flag.
const POLL: Duration = Duration::from_millis(10);

/// Solve `model` before `deadline`.
pub fn solve(model: &ConstraintModel, deadline: &Deadline) -> Outcome {
    let (clauses, assumptions) = encode(model);
    tracing::debug!(
        vars = model.num_vars(),
        clauses = clauses.len(),
        assumptions = assumptions.len(),
        "encoded constraint model"
    );

    let mut stop = StopAtDeadline(deadline.clone());
    let mut worker = SatWorker::spawn(deadline, &mut stop);

    let mut pending = clauses;
    let mut round = 0;
    loop {
        if deadline.expired() {
            return Outcome::TimedOut;
        }

        let lits = match worker.run(pending, assumptions.clone(), deadline) {
            Ok(Some(lits)) => lits,
            Ok(None) => return Outcome::NoSolution,
            Err(Interrupt::TimedOut) => return Outcome::TimedOut,
            Err(Interrupt::Failed(message)) => return Outcome::SolverError(message),
        };

        let assignment = match decode(model, &lits) {
            Ok(assignment) => assignment,
            Err(message) => return Outcome::SolverError(message),
        };

        let cycles = model.colors()
            .flat_map(|affiliation| model.detached_cycles(&assignment, affiliation))
            .collect_vec();

        if cycles.is_empty() {
            tracing::debug!(rounds = round + 1, "model is free of detached cycles");
            return match model.verify(&assignment) {
                Ok(()) => Outcome::Solution(assignment),
                Err(violation) => Outcome::SolverError(format!("decoded model is invalid: {violation}")),
            };
        }

        tracing::debug!(round, cycles = cycles.len(), "refuting detached cycles");
        pending = refute(model, &cycles);
        round += 1;
    }
}

/// Clauses and assumptions for every constraint except [`Constraint::SinglePath`], which is enforced by refinement.
fn encode(model: &ConstraintModel) -> (Vec<Vec<Lit>>, Vec<Lit>) {
    let mut clauses = Vec::new();
    let mut assumptions = Vec::new();

    for constraint in model.constraints() {
        match constraint {
            Constraint::Terminal { node, affiliation } => {
                assumptions.extend(model.affiliations()
                    .map(|maybe_aff| model.node_var(*node, maybe_aff).lit(maybe_aff == *affiliation)));

                // exactly one incident edge has the same affiliation
                clauses.extend(exactly_one(model.incident(*node).iter()
                    .map(|edge| model.edge_var(*edge, *affiliation).positive())
                    .collect_vec()));

                // exactly one incident edge does *not* have affiliation 0
                clauses.extend(exactly_one(model.incident(*node).iter()
                    .map(|edge| model.edge_var(*edge, UNAFFILIATED).negative())
                    .collect_vec()));
            }
            Constraint::PathNode { node, fill } => {
                if *fill {
                    assumptions.push(model.node_var(*node, UNAFFILIATED).negative());
                }

                clauses.extend(exactly_one(model.affiliations()
                    .map(|aff| model.node_var(*node, aff).positive())
                    .collect_vec()));

                let incident = model.incident(*node);
                for aff in model.colors() {
                    let lits = incident.iter().map(|edge| model.edge_var(*edge, aff).positive()).collect_vec();

                    // V having affiliation A implies at least one incident edge has the same affiliation
                    clauses.push(implies_any(model.node_var(*node, aff).positive(), lits.iter().copied()));

                    // some incident E_0 having affiliation A implies that another incident E has affiliation A
                    clauses.extend(lits.iter().map(|e0| implies_any(*e0, lits.iter().filter(|e| *e != e0).copied())));

                    // however, no three such E exist
                    clauses.extend(at_most_two(&lits));
                }
            }
            Constraint::EdgeExclusive { edge } => {
                clauses.extend(exactly_one(model.affiliations()
                    .map(|aff| model.edge_var(*edge, aff).positive())
                    .collect_vec()));

                // E having affiliation A => both endpoints have A; (!E + B)(!E + C)
                let (b, c) = model.edges()[*edge];
                for aff in model.colors() {
                    let e = model.edge_var(*edge, aff);
                    clauses.push(vec![e.negative(), model.node_var(b, aff).positive()]);
                    clauses.push(vec![e.negative(), model.node_var(c, aff).positive()]);
                }
            }
            Constraint::DistinctChannels { tile } => {
                for (a, b) in tile.iter().tuple_combinations() {
                    clauses.extend(model.colors()
                        .map(|aff| vec![model.node_var(*a, aff).negative(), model.node_var(*b, aff).negative()]));
                }
            }
            Constraint::SinglePath { .. } => {}
        }
    }

    (clauses, assumptions)
}

/// One clause per (cycle, color): not every edge of the cycle may carry that color.
fn refute(model: &ConstraintModel, cycles: &[Vec<EdgeIndex>]) -> Vec<Vec<Lit>> {
    cycles.iter()
        .flat_map(|cycle| model.colors()
            .map(|aff| cycle.iter().map(|edge| model.edge_var(*edge, aff).negative()).collect_vec()))
        .collect_vec()
}

fn solved_affiliation_of(model: &ConstraintModel, lits: &[Lit], var_of: impl Fn(AffiliationID) -> Var) -> Option<AffiliationID> {
    model.affiliations()
        .find(|aff| lits.get(var_of(*aff).index()).map_or(false, |lit| lit.is_positive()))
}

fn decode(model: &ConstraintModel, lits: &[Lit]) -> Result<Assignment, String> {
    let node_colors = model.graph().node_ids()
        .map(|node| solved_affiliation_of(model, lits, |aff| model.node_var(node, aff))
            .ok_or_else(|| format!("no affiliation found for node {}", model.graph().name(node))))
        .collect::<Result<Vec<_>, _>>()?;

    let edge_colors = (0..model.edges().len())
        .map(|edge| solved_affiliation_of(model, lits, |aff| model.edge_var(edge, aff))
            .ok_or_else(|| format!("no affiliation found for edge {edge}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Assignment { node_colors, edge_colors })
}

enum Interrupt {
    TimedOut,
    Failed(String),
}

/// New clauses and the assumptions to solve under.
struct Round {
    clauses: Vec<Vec<Lit>>,
    assumptions: Vec<Lit>,
}

type Verdict = Result<Option<Vec<Lit>>, Interrupt>;

/// Fails the proof step in progress once the deadline passes, which makes `varisat` abandon the solve.
///
/// The solver cannot be used again afterwards; a timed out solve never asks it to.
struct StopAtDeadline(Deadline);

impl ProofProcessor for StopAtDeadline {
    fn process_step(&mut self, _step: &CheckedProofStep, _data: CheckerData) -> Result<(), anyhow::Error> {
        if self.0.expired() {
            anyhow::bail!("deadline passed");
        }
        Ok(())
    }
}

fn solve_round(solver: &mut Solver, round: Round) -> Verdict {
    solver.add_formula(&CnfFormula::from(round.clauses));
    solver.assume(&round.assumptions);

    match solver.solve() {
        Ok(true) => solver.model()
            .map(Some)
            .ok_or_else(|| Interrupt::Failed("solver reported satisfiable without a model".to_string())),
        Ok(false) => Ok(None),
        Err(SolverError::ProofProcessorError { .. }) => Err(Interrupt::TimedOut),
        Err(err) => Err(Interrupt::Failed(err.to_string())),
    }
}

/// An incremental solver, on its own thread where the platform has threads, so a caller can stop waiting for it.
///
/// Every solver carries a [`StopAtDeadline`], so a round in progress ends soon after the deadline passes.
/// Dropping the worker closes its request channel and joins the thread.
/// Without threads (e.g. on `wasm32`) rounds run inline on the caller's thread.
enum SatWorker<'a> {
    Threaded {
        requests: Option<Sender<Round>>,
        verdicts: Receiver<Verdict>,
        handle: Option<JoinHandle<()>>,
    },
    Inline(Box<Solver<'a>>),
}

impl<'a> SatWorker<'a> {
    /// `stop` is only used when no thread can be started; a threaded solver gets its own copy of `deadline`.
    fn spawn(deadline: &Deadline, stop: &'a mut StopAtDeadline) -> Self {
        let (requests, inbox) = mpsc::channel::<Round>();
        let (outbox, verdicts) = mpsc::channel::<Verdict>();
        let watch = deadline.clone();

        let spawned = thread::Builder::new()
            .name("flowcover-sat".to_string())
            .spawn(move || {
                let mut stop = StopAtDeadline(watch);
                let mut solver = Solver::new();
                solver.add_proof_processor(&mut stop);
                for round in inbox {
                    if outbox.send(solve_round(&mut solver, round)).is_err() {
                        break;
                    }
                }
            });

        match spawned {
            Ok(handle) => Self::Threaded { requests: Some(requests), verdicts, handle: Some(handle) },
            Err(err) => {
                tracing::warn!(%err, "no solver thread available; solving inline");
                let mut solver = Solver::new();
                solver.add_proof_processor(stop);
                Self::Inline(Box::new(solver))
            }
        }
    }

    fn run(&mut self, clauses: Vec<Vec<Lit>>, assumptions: Vec<Lit>, deadline: &Deadline) -> Verdict {
        let round = Round { clauses, assumptions };
        let (requests, verdicts) = match self {
            Self::Inline(solver) => return solve_round(solver, round),
            Self::Threaded { requests: Some(requests), verdicts, .. } => (requests, verdicts),
            Self::Threaded { requests: None, .. } => return Err(Interrupt::Failed("solver thread was stopped".to_string())),
        };

        requests.send(round)
            .map_err(|_| Interrupt::Failed("solver thread exited".to_string()))?;

        while !deadline.expired() {
            match verdicts.recv_timeout(deadline.remaining().min(POLL)) {
                Ok(verdict) => return verdict,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(Interrupt::Failed("solver thread exited".to_string())),
            }
        }

        Err(Interrupt::TimedOut)
    }
}

impl Drop for SatWorker<'_> {
    fn drop(&mut self) {
        if let Self::Threaded { requests, handle, .. } = self {
            // the thread leaves its loop once the channel closes
            requests.take();
            if let Some(handle) = handle.take() {
                if handle.join().is_err() {
                    tracing::error!("solver thread panicked");
                }
            }
        }
    }
}
