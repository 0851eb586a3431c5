//! The search backend: depth-first path extension with forward checking, no external solver.
//!
//! Colors are extended one at a time in declaration order, each from its first terminal toward its second.
//! Candidates are tried in ascending node id order, so a given puzzle always yields the same answer.
//! After every step the partial state is checked for dead ends before the search descends further:
//! every unfinished color must still reach its target through uncolored nodes, and when every node must be covered,
//! every uncolored node must keep at least two open neighbours.
//!
//! Choice points live on an explicit stack, so path length is bounded by memory rather than the thread's stack.

use std::collections::VecDeque;

use itertools::Itertools;

use crate::affiliation::{AffiliationID, UNAFFILIATED};
use crate::graph::NodeId;
use crate::model::ConstraintModel;
use crate::solver::{Deadline, Outcome};

/// Deadline checks happen once per this many expansions unless configured otherwise.
pub const DEFAULT_CHECK_INTERVAL: usize = 256;

/// Solve `model` before `deadline`, checking the clock every `check_interval` expansions.
pub fn solve(model: &ConstraintModel, deadline: &Deadline, check_interval: usize) -> Outcome {
    let mut search = Search::new(model, deadline, check_interval);
    let result = search.run();
    tracing::debug!(expansions = search.expansions, "search finished");

    match result {
        Ok(true) => {
            let assignment = model.assignment_from_paths(&search.paths);
            match model.verify(&assignment) {
                Ok(()) => Outcome::Solution(assignment),
                Err(violation) => Outcome::SolverError(format!("search produced an invalid path set: {violation}")),
            }
        }
        Ok(false) => Outcome::NoSolution,
        Err(Interrupted) => Outcome::TimedOut,
    }
}

/// The deadline passed or the caller cancelled.
struct Interrupted;

/// A choice point: the remaining ways to extend one color's open path.
struct Frame {
    affiliation: AffiliationID,
    target: NodeId,
    candidates: Vec<NodeId>,
    cursor: usize,
    /// The candidate currently on the path, undone before the next one is tried.
    placed: Option<NodeId>,
}

enum Step {
    /// Every color is joined; whether that completes the puzzle.
    Joined(bool),
    Branch(Frame),
}

struct Search<'m, 'g> {
    model: &'m ConstraintModel<'g>,
    deadline: &'m Deadline,
    check_interval: usize,
    expansions: usize,
    neighbors: Vec<Vec<NodeId>>,
    tile_of: Vec<Option<usize>>,
    colors: Vec<AffiliationID>,
    /// One path per color, each starting at that color's first terminal; only the last is ever open.
    paths: Vec<Vec<NodeId>>,
}

impl<'m, 'g> Search<'m, 'g> {
    fn new(model: &'m ConstraintModel<'g>, deadline: &'m Deadline, check_interval: usize) -> Self {
        let graph = model.graph();

        let mut tile_of = vec![None; graph.node_count()];
        for (index, tile) in graph.tiles().iter().enumerate() {
            for node in tile {
                tile_of[node.index()] = Some(index);
            }
        }

        let mut colors = vec![UNAFFILIATED; graph.node_count()];
        let mut paths = Vec::with_capacity(graph.num_colors());
        for (affiliation, (start, end)) in graph.terminal_pairs() {
            colors[start.index()] = affiliation;
            colors[end.index()] = affiliation;
            paths.push(vec![start]);
        }

        Self {
            model,
            deadline,
            check_interval: check_interval.max(1),
            expansions: 0,
            neighbors: graph.node_ids().map(|node| graph.neighbors(node)).collect_vec(),
            tile_of,
            colors,
            paths,
        }
    }

    fn run(&mut self) -> Result<bool, Interrupted> {
        if !self.feasible(1) {
            return Ok(false);
        }

        let mut stack = match self.open(1)? {
            Step::Joined(complete) => return Ok(complete),
            Step::Branch(frame) => vec![frame],
        };

        while let Some(frame) = stack.last_mut() {
            let (affiliation, target) = (frame.affiliation, frame.target);
            if let Some(previous) = frame.placed.take() {
                self.retract(affiliation, target, previous);
            }

            let Some(next) = frame.candidates.get(frame.cursor).copied() else {
                stack.pop();
                continue;
            };
            frame.cursor += 1;
            frame.placed = Some(next);

            self.paths[affiliation - 1].push(next);
            let current = if next == target {
                affiliation + 1
            } else {
                self.colors[next.index()] = affiliation;
                affiliation
            };

            if !self.feasible(current) {
                continue;
            }

            match self.open(current)? {
                Step::Joined(true) => return Ok(true),
                Step::Joined(false) => {}
                Step::Branch(frame) => stack.push(frame),
            }
        }

        Ok(false)
    }

    fn tick(&mut self) -> Result<(), Interrupted> {
        if self.expansions % self.check_interval == 0 && self.deadline.expired() {
            return Err(Interrupted);
        }
        self.expansions += 1;

        Ok(())
    }

    fn target_of(&self, affiliation: AffiliationID) -> Option<NodeId> {
        self.model.graph().terminals_of(affiliation).map(|(_, end)| end)
    }

    fn open_end(&self, affiliation: AffiliationID) -> Option<NodeId> {
        self.paths.get(affiliation - 1).and_then(|path| path.last()).copied()
    }

    /// Whether `node` may take `affiliation` without sharing a tile with another channel of that color.
    fn channel_free(&self, node: NodeId, affiliation: AffiliationID) -> bool {
        match self.tile_of[node.index()] {
            None => true,
            Some(tile) => self.model.graph().tiles()[tile].iter()
                .all(|other| *other == node || self.colors[other.index()] != affiliation),
        }
    }

    /// The choice point for extending `affiliation`'s open path by one node.
    fn open(&mut self, affiliation: AffiliationID) -> Result<Step, Interrupted> {
        self.tick()?;

        let (Some(target), Some(frontier)) = (self.target_of(affiliation), self.open_end(affiliation)) else {
            return Ok(Step::Joined(!self.model.fill() || self.colors.iter().all(|color| *color != UNAFFILIATED)));
        };

        let mut candidates = self.neighbors[frontier.index()].iter()
            .copied()
            .filter(|next| *next == target
                || (self.colors[next.index()] == UNAFFILIATED && self.channel_free(*next, affiliation)))
            .collect_vec();
        // closing the path early only pays off when nodes may be left uncovered
        let fill = self.model.fill();
        candidates.sort_by_key(|next| (*next == target) == fill);

        Ok(Step::Branch(Frame { affiliation, target, candidates, cursor: 0, placed: None }))
    }

    /// Take `node` back off the end of `affiliation`'s path.
    fn retract(&mut self, affiliation: AffiliationID, target: NodeId, node: NodeId) {
        self.paths[affiliation - 1].pop();
        if node != target {
            self.colors[node.index()] = UNAFFILIATED;
        }
    }

    /// Whether the partial state, with colors before `current` joined, can still be completed.
    fn feasible(&self, current: AffiliationID) -> bool {
        let unfinished = (current..=self.model.num_colors())
            .filter_map(|affiliation| Some((self.open_end(affiliation)?, self.target_of(affiliation)?)))
            .collect_vec();

        if unfinished.iter().any(|(from, to)| !self.reaches(*from, *to)) {
            return false;
        }

        if !self.model.fill() {
            return true;
        }

        let mut open = vec![false; self.colors.len()];
        for (from, to) in &unfinished {
            open[from.index()] = true;
            open[to.index()] = true;
        }

        // a covered node needs one way in and one way out
        self.colors.iter()
            .enumerate()
            .filter(|(_, color)| **color == UNAFFILIATED)
            .all(|(index, _)| self.neighbors[index].iter()
                .filter(|next| open[next.index()] || self.colors[next.index()] == UNAFFILIATED)
                .nth(1)
                .is_some())
    }

    /// Whether `to` is reachable from `from` through uncolored nodes.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = vec![false; self.colors.len()];
        let mut queue = VecDeque::from([from]);
        seen[from.index()] = true;

        while let Some(node) = queue.pop_front() {
            for next in &self.neighbors[node.index()] {
                if *next == to {
                    return true;
                }
                if !seen[next.index()] && self.colors[next.index()] == UNAFFILIATED {
                    seen[next.index()] = true;
                    queue.push_back(*next);
                }
            }
        }

        false
    }
}
