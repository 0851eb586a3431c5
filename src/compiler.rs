//! The graph compiler: a pure, deterministic translation from a [`Space`] to a [`PuzzleGraph`].
//!
//! Grid-like boards (square, hex, circle) share one compiler parametrised by their [`Step`] shape.
//! Every cell becomes a node, except holes (no node) and bridges (one channel node per axis).
//! Edges are added by stepping in each forward direction from every cell, so each edge is visited once.
//! A bridge channel is wired only to the neighbors along its own axis, so paths cross without joining.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::marker::PhantomData;

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
use unordered_pair::UnorderedPair;

use crate::affiliation::Color;
use crate::error::FlowError;
use crate::graph::{NodeId, NodeInfo, PuzzleGraph, Role};
use crate::location::{Coord, Location};
use crate::shape::{CircleStep, HexStep, Shape, SquareStep, Step};
use crate::space::{declared_colors, Cell, Freeform, Grid, Layout, Rings, Space, SpaceKind, Warp};

/// Offset of bridge channels from the board plane, so they can be told apart when plotted.
const CHANNEL_Z: f64 = 0.15;

/// Compile `space` into its puzzle graph.
///
/// Fails with [`FlowError::Config`] for malformed dimensions or features a topology does not support,
/// and with [`FlowError::Validation`] when a color does not have exactly two terminals, a freeform edge references an undeclared node,
/// or a terminal has no neighbors.
pub fn compile(space: &Space) -> Result<PuzzleGraph, FlowError> {
    let graph = match &space.layout {
        Layout::Square(grid) => {
            let mut compiler = GridCompiler::<SquareStep>::new(grid.width, grid.height, &grid.cells)?;
            compiler.connect_neighbors(&grid.walls)?;
            compiler.connect_warps(&grid.warps)?;
            compiler.finish(declared_colors(&grid.colors, &grid.cells))
        }
        Layout::Hex(grid) => compile_hex(grid),
        Layout::Circle(rings) => compile_circle(rings),
        Layout::Freeform(freeform) => compile_freeform(freeform),
    }?;

    tracing::debug!(
        kind = ?space.kind(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        colors = graph.num_colors(),
        "compiled space"
    );

    Ok(graph)
}

fn compile_hex(grid: &Grid) -> Result<PuzzleGraph, FlowError> {
    if !grid.warps.is_empty() {
        return Err(FlowError::Config("warps are only supported on square boards".to_string()));
    }

    let mut compiler = GridCompiler::<HexStep>::new(grid.width, grid.height, &grid.cells)?;
    compiler.connect_neighbors(&grid.walls)?;
    compiler.finish(declared_colors(&grid.colors, &grid.cells))
}

fn compile_circle(rings: &Rings) -> Result<PuzzleGraph, FlowError> {
    let mut compiler = GridCompiler::<CircleStep>::new(rings.sectors, rings.rings, &rings.cells)?;
    compiler.connect_neighbors(&rings.walls)?;
    if rings.core {
        compiler.add_core();
    }
    compiler.finish(declared_colors(&rings.colors, &rings.cells))
}

/// The node(s) a cell contributes to the graph.
enum Port {
    Single(NodeId),
    /// One channel per forward direction of the shape.
    Channels(Vec<NodeId>),
}

/// Accumulates nodes and edges; shared by every topology.
#[derive(Default)]
struct Assembly {
    graph: UnGraphMap<NodeId, ()>,
    nodes: Vec<NodeInfo>,
    tiles: Vec<Vec<NodeId>>,
    // terminal nodes in the order they were encountered
    terminal_cells: Vec<(Color, NodeId)>,
}

impl Assembly {
    fn add_node(&mut self, name: String, position: (f64, f64, f64), role: Role, extra: BTreeMap<String, String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeInfo { name, position, role, extra });
        self.graph.add_node(id);
        id
    }

    fn add_edge(&mut self, a: NodeId, b: NodeId) {
        if a != b {
            self.graph.add_edge(a, b, ());
        }
    }

    /// Pair up terminals by color, in declaration order, and check the graph invariants.
    fn finish(mut self, colors: Vec<Color>) -> Result<PuzzleGraph, FlowError> {
        if self.terminal_cells.is_empty() {
            return Err(FlowError::Validation("no terminals found; at least one color pair is required".to_string()));
        }

        let mut seen = HashSet::with_capacity(self.terminal_cells.len());
        for (color, node) in &self.terminal_cells {
            if !seen.insert(*node) {
                return Err(FlowError::Validation(format!(
                    "node {} is used as a terminal more than once (color {color})",
                    self.nodes[node.0].name
                )));
            }
        }

        let mut terminals = Vec::with_capacity(colors.len());
        for (index, color) in colors.iter().enumerate() {
            let affiliation = index + 1;
            let nodes = self.terminal_cells.iter()
                .filter(|(c, _)| c == color)
                .map(|(_, node)| *node)
                .collect_vec();

            let &[a, b] = nodes.as_slice() else {
                return Err(FlowError::Validation(format!(
                    "color {color} must have exactly two terminals (found {})",
                    nodes.len()
                )));
            };

            for node in [a, b] {
                if self.graph.neighbors(node).next().is_none() {
                    return Err(FlowError::Validation(format!(
                        "terminal {} of color {color} has no neighbors",
                        self.nodes[node.0].name
                    )));
                }

                let info = &mut self.nodes[node.0];
                info.role = Role::Terminal(affiliation);
                info.extra.insert("color".to_string(), color.0.clone());
            }

            terminals.push((a, b));
        }

        let by_name = self.nodes.iter()
            .enumerate()
            .map(|(index, node)| (node.name.clone(), NodeId(index)))
            .collect();

        Ok(PuzzleGraph {
            graph: self.graph,
            nodes: self.nodes,
            by_name,
            colors,
            terminals,
            tiles: self.tiles,
        })
    }
}

fn tile_extra(tile: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("tile".to_string(), tile.to_string())])
}

struct GridCompiler<Sh: Step> {
    dims: (Coord, Coord),
    assembly: Assembly,
    ports: HashMap<Location, Port>,
    shape: PhantomData<Sh>,
}

impl<Sh: Step> GridCompiler<Sh> {
    /// Validate the dimensions and emit one node per cell (two or more per bridge, none per hole).
    fn new(width: Coord, height: Coord, cells: &[Vec<Cell>]) -> Result<Self, FlowError> {
        if width == 0 || height == 0 {
            return Err(FlowError::Config(format!("{:?} board must have nonzero dimensions (got {width}x{height})", Sh::KIND)));
        }

        if cells.len() != height || cells.iter().any(|row| row.len() != width) {
            return Err(FlowError::Config(format!("{:?} board cells do not match its {width}x{height} dimensions", Sh::KIND)));
        }

        let dims = (width, height);
        let mut assembly = Assembly::default();
        let mut ports = HashMap::with_capacity(width * height);

        for (y, row) in cells.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let location = Location(x, y);
                let tile = location.tile_name();
                let position = Sh::position(location, dims);

                let port = match cell {
                    Cell::Hole => continue,
                    Cell::Bridge => {
                        if Sh::KIND != SpaceKind::Square {
                            return Err(FlowError::Config(format!("bridges are only supported on square boards (found one at {tile})")));
                        }

                        let channels = Sh::CHANNEL_NAMES.iter()
                            .enumerate()
                            .map(|(i, suffix)| {
                                // channels stack above and below the board plane
                                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                                let z = sign * CHANNEL_Z * (1 + i / 2) as f64;
                                let mut extra = tile_extra(&tile);
                                extra.insert("axis".to_string(), suffix.to_string());
                                assembly.add_node(format!("{tile}:{suffix}"), (position.0, position.1, z), Role::BridgeChannel, extra)
                            })
                            .collect_vec();

                        assembly.tiles.push(channels.clone());
                        Port::Channels(channels)
                    }
                    Cell::Terminal(color) => {
                        let node = assembly.add_node(tile.clone(), position, Role::Plain, tile_extra(&tile));
                        assembly.terminal_cells.push((color.clone(), node));
                        Port::Single(node)
                    }
                    Cell::Empty => Port::Single(assembly.add_node(tile.clone(), position, Role::Plain, tile_extra(&tile))),
                };

                ports.insert(location, port);
            }
        }

        Ok(Self {
            dims,
            assembly,
            ports,
            shape: PhantomData,
        })
    }

    /// The node through which a path leaves `location` heading in `direction`.
    fn port_toward(&self, location: Location, direction: Sh) -> Option<NodeId> {
        match self.ports.get(&location)? {
            Port::Single(node) => Some(*node),
            Port::Channels(channels) => {
                let axis = direction.ensure_forward();
                Sh::FORWARD_VARIANTS.iter()
                    .position(|dir| *dir == axis)
                    .and_then(|i| channels.get(i))
                    .copied()
            }
        }
    }

    fn connect_neighbors(&mut self, walls: &[[Location; 2]]) -> Result<(), FlowError> {
        for [a, b] in walls {
            if !a.within(self.dims) || !b.within(self.dims) {
                return Err(FlowError::Config(format!("wall between {} and {} lies outside the board", a.tile_name(), b.tile_name())));
            }
        }

        let walls = walls.iter()
            .map(|[a, b]| UnorderedPair(*a, *b))
            .collect::<HashSet<_>>();

        let locations = self.ports.keys().copied().sorted().collect_vec();
        for location in locations {
            for direction in Sh::FORWARD_VARIANTS {
                let Some(neighbor) = direction.attempt_from(location, self.dims) else {
                    continue;
                };

                if walls.contains(&UnorderedPair(location, neighbor)) {
                    continue;
                }

                if let (Some(a), Some(b)) = (self.port_toward(location, *direction), self.port_toward(neighbor, direction.invert())) {
                    self.assembly.add_edge(a, b);
                }
            }
        }

        Ok(())
    }

    fn finish(self, colors: Vec<Color>) -> Result<PuzzleGraph, FlowError> {
        self.assembly.finish(colors)
    }
}

impl GridCompiler<SquareStep> {
    /// Join each warp's endpoints; on a bridge the warp attaches to the channel along the warp's axis.
    fn connect_warps(&mut self, warps: &[Warp]) -> Result<(), FlowError> {
        for warp in warps {
            let (from, to) = (warp.from.min(warp.to), warp.from.max(warp.to));
            if !from.within(self.dims) || !to.within(self.dims) {
                return Err(FlowError::Config(format!("warp {} -> {} lies outside the board", from.tile_name(), to.tile_name())));
            }

            let (width, height) = self.dims;
            let direction = if from.1 == to.1 {
                SquareStep::Left
            } else if from.0 == to.0 {
                SquareStep::Up
            } else {
                return Err(FlowError::Config(format!("warp {} -> {} is not along a row or column", from.tile_name(), to.tile_name())));
            };

            // a warp leaves through one border and re-enters through the opposite one
            let spans = match direction {
                SquareStep::Left => from.0 == 0 && to.0 + 1 == width,
                _ => from.1 == 0 && to.1 + 1 == height,
            };
            if !spans {
                return Err(FlowError::Config(format!("warp {} -> {} does not join opposite borders", from.tile_name(), to.tile_name())));
            }

            if let (Some(a), Some(b)) = (self.port_toward(from, direction), self.port_toward(to, direction.invert())) {
                self.assembly.add_edge(a, b);
            }
        }

        Ok(())
    }
}

impl GridCompiler<CircleStep> {
    /// Add the hub node, joined to every sector of the innermost ring.
    fn add_core(&mut self) {
        let mut extra = tile_extra("core");
        extra.insert("core".to_string(), "true".to_string());
        let core = self.assembly.add_node("core".to_string(), (0.0, 0.0, 0.0), Role::Plain, extra);

        for sector in 0..self.dims.0 {
            if let Some(node) = self.port_toward(Location(sector, 0), CircleStep::Inward) {
                self.assembly.add_edge(core, node);
            }
        }
    }
}

fn compile_freeform(freeform: &Freeform) -> Result<PuzzleGraph, FlowError> {
    let mut assembly = Assembly::default();
    let mut by_name: HashMap<&str, NodeId> = HashMap::with_capacity(freeform.nodes.len());

    for node in &freeform.nodes {
        if by_name.contains_key(node.id.as_str()) {
            return Err(FlowError::Validation(format!("node {} is declared more than once", node.id)));
        }
        let pos = (node.pos[0], node.pos[1], node.pos[2]);
        let id = assembly.add_node(node.id.clone(), pos, Role::Plain, tile_extra(&node.id));
        by_name.insert(node.id.as_str(), id);
    }

    let lookup = |name: &str, context: &str| by_name.get(name).copied()
        .ok_or_else(|| FlowError::Validation(format!("{context} references undeclared node {name}")));

    for [a, b] in &freeform.edges {
        let (u, v) = (lookup(a, "edge")?, lookup(b, "edge")?);
        if u == v {
            return Err(FlowError::Validation(format!("edge {a} -> {b} is a self-loop")));
        }
        assembly.add_edge(u, v);
    }

    let mut tiled = HashSet::new();
    for (index, tile) in freeform.tiles.iter().enumerate() {
        let members = tile.iter().map(|name| lookup(name, "tile")).collect::<Result<Vec<_>, _>>()?;
        if members.iter().any(|node| !tiled.insert(*node)) {
            return Err(FlowError::Validation(format!("tile {index} shares a node with another tile")));
        }
        if members.len() < 2 {
            continue;
        }

        let tile_name = format!("tile{index}");
        for node in &members {
            let info = &mut assembly.nodes[node.0];
            info.role = Role::BridgeChannel;
            info.extra.insert("tile".to_string(), tile_name.clone());
        }
        assembly.tiles.push(members);
    }

    let mut colors: Vec<Color> = Vec::with_capacity(freeform.terminals.len());
    for (color, [a, b]) in &freeform.terminals {
        let (u, v) = (lookup(a, "terminal")?, lookup(b, "terminal")?);
        assembly.terminal_cells.push((color.clone(), u));
        assembly.terminal_cells.push((color.clone(), v));
        if !colors.contains(color) {
            colors.push(color.clone());
        }
    }

    assembly.finish(colors)
}
