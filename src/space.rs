//! The space model: a typed, pre-graph description of a board and its cell markings.
//!
//! A [`Space`] is immutable once built. Build one with a [`Builder`](crate::builder::Builder),
//! construct the structs directly, or decode one from JSON with [`Space::from_json`].

use serde::{Deserialize, Serialize};

use crate::affiliation::Color;
use crate::error::FlowError;
use crate::location::{Coord, Location};

/// The four supported board topologies.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceKind {
    /// Rectangular grid of square cells.
    Square,
    /// Rectangular grid of hexagonal cells in offset rows.
    Hex,
    /// Concentric rings of sectors.
    Circle,
    /// An explicit graph.
    Freeform,
}

/// The marking on one grid cell.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    /// An ordinary cell.
    #[default]
    Empty,
    /// No node is emitted; the cell does not exist on the board.
    Hole,
    /// Two independent channels cross here without joining.
    Bridge,
    /// One endpoint of `color`'s path.
    Terminal(Color),
}

/// A warp joins a border cell to its partner on the opposite border.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Warp {
    /// One end, on the left or top border.
    pub from: Location,
    /// The other end, on the opposite border.
    pub to: Location,
}

/// A rectangular grid of square or hexagonal cells, stored row-major.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Cells per row.
    pub width: Coord,
    /// Number of rows.
    pub height: Coord,
    /// `cells[y][x]`.
    pub cells: Vec<Vec<Cell>>,
    /// Declaration order of colors; when empty, colors are ordered by first appearance in `cells`.
    #[serde(default)]
    pub colors: Vec<Color>,
    /// Pairs of adjacent cells separated by a wall.
    #[serde(default)]
    pub walls: Vec<[Location; 2]>,
    /// Border cells joined to their partner across the board.
    #[serde(default)]
    pub warps: Vec<Warp>,
}

/// Concentric rings of sectors. `cells[ring][sector]`, innermost ring first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rings {
    /// Number of rings.
    pub rings: Coord,
    /// Sectors per ring.
    pub sectors: Coord,
    /// `cells[ring][sector]`.
    pub cells: Vec<Vec<Cell>>,
    /// As [`Grid::colors`].
    #[serde(default)]
    pub colors: Vec<Color>,
    /// Pairs of adjacent cells, as `Location(sector, ring)`, separated by a wall.
    #[serde(default)]
    pub walls: Vec<[Location; 2]>,
    /// Synthesize one hub node adjacent to every cell of the innermost ring.
    #[serde(default)]
    pub core: bool,
}

/// A node of a freeform graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FreeformNode {
    /// Unique node name.
    pub id: String,
    /// Caller-supplied layout position; never consulted by the solvers.
    #[serde(default)]
    pub pos: [f64; 3],
}

/// An arbitrary graph with explicitly declared nodes, edges and terminal pairs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Freeform {
    /// Every node.
    pub nodes: Vec<FreeformNode>,
    /// Undirected edges, as pairs of node ids.
    pub edges: Vec<[String; 2]>,
    /// Terminal pairs in declaration order.
    pub terminals: Vec<(Color, [String; 2])>,
    /// Groups of nodes sharing one physical tile; their nodes are treated as channels.
    #[serde(default)]
    pub tiles: Vec<Vec<String>>,
}

/// Topology-specific board description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Layout {
    /// See [`SpaceKind::Square`].
    Square(Grid),
    /// See [`SpaceKind::Hex`].
    Hex(Grid),
    /// See [`SpaceKind::Circle`].
    Circle(Rings),
    /// See [`SpaceKind::Freeform`].
    Freeform(Freeform),
}

/// A board topology plus the puzzle flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Require every node to be covered by some path.
    #[serde(default = "default_fill")]
    pub fill: bool,
    /// The board itself, tagged by `kind` on the wire.
    #[serde(flatten)]
    pub layout: Layout,
}

fn default_fill() -> bool {
    true
}

impl Space {
    /// A space over `layout`.
    pub fn new(layout: Layout, fill: bool) -> Self {
        Self { fill, layout }
    }

    /// The topology of this space.
    pub fn kind(&self) -> SpaceKind {
        match self.layout {
            Layout::Square(_) => SpaceKind::Square,
            Layout::Hex(_) => SpaceKind::Hex,
            Layout::Circle(_) => SpaceKind::Circle,
            Layout::Freeform(_) => SpaceKind::Freeform,
        }
    }

    /// Decode a space from its JSON form.
    ///
    /// An unknown `kind` or any other malformed document is a [`FlowError::Config`].
    pub fn from_json(text: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode this space as JSON, readable by [`Space::from_json`].
    pub fn to_json(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Declaration order for a cell grid: the explicit list if given, otherwise first appearance row by row.
pub(crate) fn declared_colors(explicit: &[Color], cells: &[Vec<Cell>]) -> Vec<Color> {
    let mut colors = explicit.to_vec();
    for cell in cells.iter().flatten() {
        if let Cell::Terminal(color) = cell {
            if !colors.contains(color) {
                colors.push(color.clone());
            }
        }
    }

    colors
}
