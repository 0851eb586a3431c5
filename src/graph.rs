//! The compiled puzzle graph: nodes, undirected edges and terminal pairs, independent of topology.

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};

use crate::affiliation::{AffiliationID, Color};

/// Index of a node in its [`PuzzleGraph`]. Ids are dense and assigned in compilation order.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of this node in [`PuzzleGraph::node_ids`] order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What a node is for.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Role {
    /// An ordinary cell, coverable by any color.
    Plain,
    /// One endpoint of the path with this (nonzero) affiliation.
    Terminal(AffiliationID),
    /// One of several channels sharing a physical tile, e.g. half of a bridge.
    BridgeChannel,
}

/// Everything the graph records about one node besides its edges.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeInfo {
    /// Unique within the graph; grid cells are named `"x,y"` and channels `"x,y:h"` / `"x,y:v"`.
    pub name: String,
    /// Rendering position; the solvers never look at it.
    pub position: (f64, f64, f64),
    /// What the node is for.
    pub role: Role,
    /// Free-form annotations for renderers, e.g. the tile a channel belongs to.
    pub extra: BTreeMap<String, String>,
}

/// The uniform graph every board compiles to. Built once per request and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct PuzzleGraph {
    pub(crate) graph: UnGraphMap<NodeId, ()>,
    pub(crate) nodes: Vec<NodeInfo>,
    pub(crate) by_name: HashMap<String, NodeId>,
    /// Colors in declaration order; color `i` has affiliation `i + 1`.
    pub(crate) colors: Vec<Color>,
    /// Terminal pairs, indexed like `colors`.
    pub(crate) terminals: Vec<(NodeId, NodeId)>,
    /// Node groups sharing one physical tile; single-node tiles are omitted.
    pub(crate) tiles: Vec<Vec<NodeId>>,
}

impl PuzzleGraph {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of colors, i.e. of terminal pairs.
    pub fn num_colors(&self) -> usize {
        self.colors.len()
    }

    /// Every node id, ascending.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// # Panics
    /// If `id` belongs to another graph.
    pub fn node(&self, id: NodeId) -> &NodeInfo {
        &self.nodes[id.0]
    }

    /// The unique name of `id`.
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// The node called `name`, if any.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Neighbors of `id` in ascending id order.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.graph.neighbors(id).sorted().collect_vec()
    }

    /// Number of neighbors of `id`.
    pub fn degree(&self, id: NodeId) -> usize {
        self.graph.neighbors(id).count()
    }

    /// Whether `a` and `b` are adjacent.
    pub fn contains_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.graph.contains_edge(a, b)
    }

    /// Every edge once, in insertion order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.graph.all_edges().map(|(a, b, _)| (a, b)).collect_vec()
    }

    /// Colors in declaration order.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// The color behind a nonzero affiliation.
    pub fn color(&self, affiliation: AffiliationID) -> Option<&Color> {
        affiliation.checked_sub(1).and_then(|i| self.colors.get(i))
    }

    /// The terminal pair of a nonzero affiliation.
    pub fn terminals_of(&self, affiliation: AffiliationID) -> Option<(NodeId, NodeId)> {
        affiliation.checked_sub(1).and_then(|i| self.terminals.get(i)).copied()
    }

    /// `(affiliation, terminal pair)` in declaration order.
    pub fn terminal_pairs(&self) -> impl Iterator<Item = (AffiliationID, (NodeId, NodeId))> + '_ {
        self.terminals.iter().enumerate().map(|(i, pair)| (i + 1, *pair))
    }

    /// The affiliation `id` is a terminal of, if it is one.
    pub fn terminal_affiliation(&self, id: NodeId) -> Option<AffiliationID> {
        match self.nodes[id.0].role {
            Role::Terminal(affiliation) => Some(affiliation),
            _ => None,
        }
    }

    /// Groups of channel nodes sharing one physical tile.
    pub fn tiles(&self) -> &[Vec<NodeId>] {
        &self.tiles
    }

    /// The serializable preview of this graph.
    pub fn payload(&self) -> GraphPayload {
        GraphPayload {
            nodes: self.nodes.iter()
                .map(|node| NodePayload {
                    id: node.name.clone(),
                    x: node.position.0,
                    y: node.position.1,
                    z: node.position.2,
                    role: match node.role {
                        Role::Plain => RoleTag::Plain,
                        Role::Terminal(_) => RoleTag::Terminal,
                        Role::BridgeChannel => RoleTag::BridgeChannel,
                    },
                    extra: node.extra.clone(),
                })
                .collect_vec(),
            edges: self.edges().into_iter()
                .map(|(a, b)| [self.name(a).to_string(), self.name(b).to_string()])
                .collect_vec(),
            terminals: self.terminal_pairs()
                .filter_map(|(aff, (a, b))| self.color(aff)
                    .map(|color| (color.0.clone(), [self.name(a).to_string(), self.name(b).to_string()])))
                .collect(),
        }
    }
}

/// Wire tag for a node role.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleTag {
    /// See [`Role::Plain`].
    Plain,
    /// See [`Role::Terminal`].
    Terminal,
    /// See [`Role::BridgeChannel`].
    BridgeChannel,
}

/// One node of a [`GraphPayload`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodePayload {
    /// The node's name.
    pub id: String,
    /// Rendering position, from [`NodeInfo::position`].
    pub x: f64,
    /// See `x`.
    pub y: f64,
    /// See `x`; nonzero only for stacked channels.
    pub z: f64,
    /// What the node is for.
    pub role: RoleTag,
    /// Copied from [`NodeInfo::extra`].
    pub extra: BTreeMap<String, String>,
}

/// `{ nodes, edges, terminals }`, as used for preview rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    /// In id order.
    pub nodes: Vec<NodePayload>,
    /// Pairs of node names.
    pub edges: Vec<[String; 2]>,
    /// Color name to its two terminal node names.
    pub terminals: BTreeMap<String, [String; 2]>,
}
