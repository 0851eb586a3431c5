//! The topology-agnostic constraint model shared by both solver backends.
//!
//! A [`ConstraintModel`] is data: a variable layout over the puzzle graph plus a list of symbolic [`Constraint`]s.
//! The SAT backend translates each constraint into clauses, the search backend respects them while extending paths,
//! and both run their answer through [`ConstraintModel::verify`] so they can never disagree on what a valid path cover is.
//!
//! # Variables
//! Every node N has a color variable ranging over affiliations `0..=k`, where 0 means uncolored and `1..=k` are the declared colors.
//! Every edge E has an edge-usage variable over the same range; affiliation A on E means "E is part of color A's path", and 0 means unused.
//! Expressed as Booleans, `(N, A)` and `(E, A)` each get one indicator; see [`ConstraintModel::node_var`] and [`ConstraintModel::edge_var`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::RangeInclusive;

use itertools::Itertools;
use thiserror::Error;
use unordered_pair::UnorderedPair;
use varisat::Var;

use crate::affiliation::{AffiliationID, UNAFFILIATED};
use crate::graph::{NodeId, PuzzleGraph};

/// Index of an edge in [`ConstraintModel::edges`].
pub type EdgeIndex = usize;

/// One symbolic rule over the model's variables.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Constraint {
    /// `node` has exactly `affiliation` and exactly one incident edge of that color; its other incident edges are unused.
    Terminal {
        /// The terminal.
        node: NodeId,
        /// Its color.
        affiliation: AffiliationID,
    },
    /// A non-terminal node with color A uses exactly two incident edges of color A and none of any other color.
    /// When uncolored (allowed only if `fill` is false), it uses no incident edge at all.
    PathNode {
        /// The node.
        node: NodeId,
        /// Whether it must be colored.
        fill: bool,
    },
    /// The edge carries at most one color, and a colored edge has both endpoints of that color.
    EdgeExclusive {
        /// The edge.
        edge: EdgeIndex,
    },
    /// No two channels of one physical tile carry the same color.
    DistinctChannels {
        /// The channels of one tile.
        tile: Vec<NodeId>,
    },
    /// The used edges of this color form one simple path between its terminals; no detached cycles.
    SinglePath {
        /// The color.
        affiliation: AffiliationID,
    },
}

/// A candidate answer: one affiliation per node and per edge, indexed like the model.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assignment {
    /// Indexed by [`NodeId::index`].
    pub node_colors: Vec<AffiliationID>,
    /// Indexed by [`EdgeIndex`]; 0 marks an unused edge.
    pub edge_colors: Vec<AffiliationID>,
}

/// The first constraint an [`Assignment`] breaks.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[allow(missing_docs)]
pub enum Violation {
    /// A terminal is not its own color.
    #[error("terminal {node:?} has affiliation {found}, expected {expected}")]
    TerminalColor { node: NodeId, expected: AffiliationID, found: AffiliationID },
    /// A node has the wrong number of incident edges of its color: one for terminals, two otherwise.
    #[error("node {node:?} has {degree} incident edges of affiliation {affiliation}")]
    Degree { node: NodeId, affiliation: AffiliationID, degree: usize },
    /// A node is uncolored on a board that must be filled.
    #[error("node {node:?} is uncolored but every node must be covered")]
    Uncovered { node: NodeId },
    /// An uncolored node touches a used edge.
    #[error("node {node:?} is uncolored but carries a used edge")]
    StrayEdge { node: NodeId },
    /// A colored edge has an endpoint of another color.
    #[error("edge {edge} has affiliation {affiliation} but its endpoints do not")]
    EdgeMismatch { edge: EdgeIndex, affiliation: AffiliationID },
    /// Two channels of one tile share a color.
    #[error("channels {a:?} and {b:?} of one tile both carry affiliation {affiliation}")]
    SharedTile { a: NodeId, b: NodeId, affiliation: AffiliationID },
    /// A color's edges include loops apart from its path; each cycle is listed by edge.
    #[error("affiliation {affiliation} has {} detached cycle(s)", .cycles.len())]
    DetachedCycles { affiliation: AffiliationID, cycles: Vec<Vec<EdgeIndex>> },
    /// A color's edges do not lead from one terminal to the other.
    #[error("affiliation {affiliation} does not join its terminals")]
    BrokenPath { affiliation: AffiliationID },
    /// The assignment was made for a different model.
    #[error("assignment covers {found} nodes/edges, model has {expected}")]
    Shape { expected: usize, found: usize },
}

/// The shared formalization of "valid path cover" over one [`PuzzleGraph`].
#[derive(Clone, Debug)]
pub struct ConstraintModel<'g> {
    graph: &'g PuzzleGraph,
    fill: bool,
    edges: Vec<(NodeId, NodeId)>,
    edge_index: HashMap<UnorderedPair<NodeId>, EdgeIndex>,
    // incident edge indices per node, in ascending neighbor order
    incident: Vec<Vec<EdgeIndex>>,
    constraints: Vec<Constraint>,
}

impl<'g> ConstraintModel<'g> {
    /// Derive the model for `graph`. Colors are visited in declaration order, which fixes variable and constraint order only.
    pub fn build(graph: &'g PuzzleGraph, fill: bool) -> Self {
        let edges = graph.edges();
        let edge_index = edges.iter()
            .enumerate()
            .map(|(i, (a, b))| (UnorderedPair(*a, *b), i))
            .collect::<HashMap<_, _>>();

        let incident = graph.node_ids()
            .map(|node| graph.neighbors(node).into_iter()
                .filter_map(|other| edge_index.get(&UnorderedPair(node, other)).copied())
                .collect_vec())
            .collect_vec();

        let mut constraints = Vec::with_capacity(graph.node_count() + edges.len() + graph.tiles().len() + graph.num_colors());

        for (affiliation, (a, b)) in graph.terminal_pairs() {
            constraints.push(Constraint::Terminal { node: a, affiliation });
            constraints.push(Constraint::Terminal { node: b, affiliation });
        }
        constraints.extend(graph.node_ids()
            .filter(|node| graph.terminal_affiliation(*node).is_none())
            .map(|node| Constraint::PathNode { node, fill }));
        constraints.extend((0..edges.len()).map(|edge| Constraint::EdgeExclusive { edge }));
        constraints.extend(graph.tiles().iter()
            .map(|tile| Constraint::DistinctChannels { tile: tile.clone() }));
        constraints.extend((1..=graph.num_colors()).map(|affiliation| Constraint::SinglePath { affiliation }));

        Self {
            graph,
            fill,
            edges,
            edge_index,
            incident,
            constraints,
        }
    }

    /// The graph this model constrains.
    pub fn graph(&self) -> &'g PuzzleGraph {
        self.graph
    }

    /// Whether every node must be covered.
    pub fn fill(&self) -> bool {
        self.fill
    }

    /// Every rule, terminals first.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Every edge once, in [`PuzzleGraph::edges`] order.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    /// The edge joining `a` and `b`, in either order.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeIndex> {
        self.edge_index.get(&UnorderedPair(a, b)).copied()
    }

    /// Edges touching `node`, in ascending neighbor order.
    pub fn incident(&self, node: NodeId) -> &[EdgeIndex] {
        &self.incident[node.index()]
    }

    /// Number of colors.
    pub fn num_colors(&self) -> usize {
        self.graph.num_colors()
    }

    /// `0..=k`, uncolored included.
    #[inline]
    pub fn affiliations(&self) -> RangeInclusive<AffiliationID> {
        0..=self.num_colors()
    }

    /// `1..=k`.
    #[inline]
    pub fn colors(&self) -> RangeInclusive<AffiliationID> {
        1..=self.num_colors()
    }

    /// Number of Boolean indicators: one per (node, affiliation) and per (edge, affiliation).
    pub fn num_vars(&self) -> usize {
        (self.graph.node_count() + self.edges.len()) * (self.num_colors() + 1)
    }

    /// Indicator for "`node` has `affiliation`".
    #[inline]
    pub fn node_var(&self, node: NodeId, affiliation: AffiliationID) -> Var {
        Var::from_index(node.index() * (self.num_colors() + 1) + affiliation)
    }

    /// Indicator for "`edge` is used by `affiliation`" (0: unused).
    #[inline]
    pub fn edge_var(&self, edge: EdgeIndex, affiliation: AffiliationID) -> Var {
        Var::from_index((self.graph.node_count() + edge) * (self.num_colors() + 1) + affiliation)
    }

    fn other_end(&self, edge: EdgeIndex, node: NodeId) -> NodeId {
        let (a, b) = self.edges[edge];
        if a == node { b } else { a }
    }

    fn degree_in(&self, assignment: &Assignment, node: NodeId, affiliation: AffiliationID) -> usize {
        self.incident(node).iter()
            .filter(|edge| assignment.edge_colors[**edge] == affiliation)
            .count()
    }

    /// Check `assignment` against every constraint, in order, and report the first violation.
    pub fn verify(&self, assignment: &Assignment) -> Result<(), Violation> {
        if assignment.node_colors.len() != self.graph.node_count() {
            return Err(Violation::Shape { expected: self.graph.node_count(), found: assignment.node_colors.len() });
        }
        if assignment.edge_colors.len() != self.edges.len() {
            return Err(Violation::Shape { expected: self.edges.len(), found: assignment.edge_colors.len() });
        }

        for constraint in &self.constraints {
            self.check(constraint, assignment)?;
        }

        Ok(())
    }

    fn check(&self, constraint: &Constraint, assignment: &Assignment) -> Result<(), Violation> {
        match constraint {
            Constraint::Terminal { node, affiliation } => {
                let found = assignment.node_colors[node.index()];
                if found != *affiliation {
                    return Err(Violation::TerminalColor { node: *node, expected: *affiliation, found });
                }

                let used = self.incident(*node).iter()
                    .filter(|edge| assignment.edge_colors[**edge] != UNAFFILIATED)
                    .count();
                if used != 1 || self.degree_in(assignment, *node, *affiliation) != 1 {
                    return Err(Violation::Degree { node: *node, affiliation: *affiliation, degree: used });
                }
            }
            Constraint::PathNode { node, fill } => {
                let color = assignment.node_colors[node.index()];
                if color == UNAFFILIATED {
                    if *fill {
                        return Err(Violation::Uncovered { node: *node });
                    }
                    if self.incident(*node).iter().any(|edge| assignment.edge_colors[*edge] != UNAFFILIATED) {
                        return Err(Violation::StrayEdge { node: *node });
                    }
                    return Ok(());
                }

                for affiliation in self.colors() {
                    let degree = self.degree_in(assignment, *node, affiliation);
                    let expected = if affiliation == color { 2 } else { 0 };
                    if degree != expected {
                        return Err(Violation::Degree { node: *node, affiliation, degree });
                    }
                }
            }
            Constraint::EdgeExclusive { edge } => {
                let affiliation = assignment.edge_colors[*edge];
                let (a, b) = self.edges[*edge];
                if affiliation > self.num_colors() || (affiliation != UNAFFILIATED
                    && (assignment.node_colors[a.index()] != affiliation || assignment.node_colors[b.index()] != affiliation)) {
                    return Err(Violation::EdgeMismatch { edge: *edge, affiliation });
                }
            }
            Constraint::DistinctChannels { tile } => {
                for (a, b) in tile.iter().tuple_combinations() {
                    let affiliation = assignment.node_colors[a.index()];
                    if affiliation != UNAFFILIATED && affiliation == assignment.node_colors[b.index()] {
                        return Err(Violation::SharedTile { a: *a, b: *b, affiliation });
                    }
                }
            }
            Constraint::SinglePath { affiliation } => {
                let cycles = self.detached_cycles(assignment, *affiliation);
                if !cycles.is_empty() {
                    return Err(Violation::DetachedCycles { affiliation: *affiliation, cycles });
                }
                if self.walk(assignment, *affiliation).is_none() {
                    return Err(Violation::BrokenPath { affiliation: *affiliation });
                }
            }
        }

        Ok(())
    }

    /// Edge sets of every component of `affiliation`'s used edges that contains neither of its terminals.
    ///
    /// Degree constraints alone admit such components; under them each one is a cycle.
    pub fn detached_cycles(&self, assignment: &Assignment, affiliation: AffiliationID) -> Vec<Vec<EdgeIndex>> {
        let Some((start, _)) = self.graph.terminals_of(affiliation) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        self.component(assignment, affiliation, start, &mut seen);

        let mut cycles = Vec::new();
        for node in self.graph.node_ids() {
            if assignment.node_colors[node.index()] == affiliation && !seen.contains(&node) {
                let edges = self.component(assignment, affiliation, node, &mut seen);
                if !edges.is_empty() {
                    cycles.push(edges);
                }
            }
        }

        cycles
    }

    /// Flood `affiliation`'s used edges from `from`, marking nodes in `seen`; returns the edges traversed.
    fn component(&self, assignment: &Assignment, affiliation: AffiliationID, from: NodeId, seen: &mut HashSet<NodeId>) -> Vec<EdgeIndex> {
        let mut edges = HashSet::new();
        let mut queue = VecDeque::from([from]);
        seen.insert(from);

        while let Some(node) = queue.pop_front() {
            for edge in self.incident(node) {
                if assignment.edge_colors[*edge] != affiliation {
                    continue;
                }
                edges.insert(*edge);
                let next = self.other_end(*edge, node);
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        edges.into_iter().sorted().collect_vec()
    }

    /// Walk `affiliation`'s used edges from its first terminal to its second.
    ///
    /// Returns [`None`] if the walk branches, dead-ends or skips a node of that color.
    pub fn walk(&self, assignment: &Assignment, affiliation: AffiliationID) -> Option<Vec<NodeId>> {
        let (start, end) = self.graph.terminals_of(affiliation)?;
        let mut path = vec![start];
        let mut previous: Option<EdgeIndex> = None;
        let mut current = start;

        while current != end {
            let onward = self.incident(current).iter()
                .filter(|edge| assignment.edge_colors[**edge] == affiliation && Some(**edge) != previous)
                .collect_vec();
            let [edge] = onward[..] else {
                return None;
            };

            current = self.other_end(*edge, current);
            previous = Some(*edge);
            if path.contains(&current) {
                return None;
            }
            path.push(current);
        }

        let colored = assignment.node_colors.iter().filter(|color| **color == affiliation).count();
        (colored == path.len()).then_some(path)
    }

    /// Paths of every color in declaration order; `None` if any color's edges do not form its path.
    pub fn paths(&self, assignment: &Assignment) -> Option<Vec<Vec<NodeId>>> {
        self.colors()
            .map(|affiliation| self.walk(assignment, affiliation))
            .collect()
    }

    /// Build the [`Assignment`] implied by one path per color, in declaration order.
    pub fn assignment_from_paths(&self, paths: &[Vec<NodeId>]) -> Assignment {
        let mut node_colors = vec![UNAFFILIATED; self.graph.node_count()];
        let mut edge_colors = vec![UNAFFILIATED; self.edges.len()];

        for (index, path) in paths.iter().enumerate() {
            let affiliation = index + 1;
            for node in path {
                node_colors[node.index()] = affiliation;
            }
            for (a, b) in path.iter().tuple_windows() {
                if let Some(edge) = self.edge_between(*a, *b) {
                    edge_colors[edge] = affiliation;
                }
            }
        }

        Assignment { node_colors, edge_colors }
    }
}
