//! Incremental, validating construction of [`Space`](crate::Space)s.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::num::NonZero;
use std::ops::IndexMut;

use itertools::Itertools;
use ndarray::{Array2, AssignElem};
use unordered_pair::UnorderedPair;

use crate::affiliation::Color;
use crate::location::{Dimension, Location};
use crate::shape::{CircleStep, HexStep, Shape, SquareStep, Step};
use crate::space::{Cell, Freeform, FreeformNode, Grid, Layout, Rings, Space, SpaceKind, Warp};

/// Why a builder refuses to produce a [`Space`]. Reasons accumulate; the first one freezes the builder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuilderInvalidReason {
    /// A terminal, bridge, hole, wall or warp lies outside `dims`.
    FeatureOutOfBounds,
    /// A warp away from the border, or at a corner without a usable direction.
    WarpBadDirection,
    /// Bridges are only defined for square cells.
    BridgeUnsupported,
    /// A bridge was placed on the border of the board, where one of its channels could never be used.
    BridgeOnBorder,
    /// A freeform node id was declared twice.
    DuplicateNode,
    /// A freeform edge, terminal or tile referenced a node that was never declared.
    UnknownNode,
}

/// Fluent construction of grid spaces whose cells are shaped by `Sh`.
///
/// Every method returns the builder for chaining. Once any call records a [`BuilderInvalidReason`],
/// later feature calls are ignored and [`build`](Self::build) reports the reasons.
/// Clone a builder to keep a snapshot of it.
pub trait Builder<Sh: Step>: Clone {
    /// An empty board of `(width, height)` cells; `(sectors, rings)` for circular boards.
    fn with_dims(dims: (Dimension, Dimension)) -> Self;
    /// Place the two terminals of `color`, in either order. Colors are declared in the order they are added.
    fn add_termini(&mut self, color: impl Into<Color>, locations: (Location, Location)) -> &mut Self;
    /// Forget the most recently added color.
    fn pop_termini(&mut self) -> &mut Self;
    /// Turn `location` into a bridge: one channel per axis, so two paths may cross there without turning or joining.
    ///
    /// Square boards only, and never on the border.
    fn add_bridge(&mut self, location: Location) -> &mut Self;
    /// Punch a hole at `location`. Whatever else was placed there is dropped, whenever this is called.
    fn drop_location(&mut self, location: Location) -> &mut Self;
    /// Put a wall between two adjacent cells; a pair that is not adjacent is ignored.
    fn disconnect(&mut self, locations: UnorderedPair<Location>) -> &mut Self;
    /// Wall `location` off from its neighbours in each of `directions`; repeats are harmless.
    fn disconnect_around(&mut self, location: Location, directions: Vec<Sh>) -> &mut Self;
    /// Require (or stop requiring) every cell to be covered by a path.
    fn with_fill(&mut self, fill: bool) -> &mut Self;
    /// `None` while valid, otherwise every reason recorded so far.
    fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>>;
    /// The space described so far, or the reasons it cannot be built.
    fn build(&self) -> Result<Space, &Vec<BuilderInvalidReason>>;
}

/// A builder for boards of cells shaped by `Sh`. Use one of the aliases below.
#[derive(Clone)]
pub struct GridSpaceBuilder<Sh: Step> {
    // width, height
    dims: (Dimension, Dimension),
    cells: Array2<Cell>,
    colors: Vec<Color>,
    fill: bool,
    invalid_reasons: Vec<BuilderInvalidReason>,
    // walls
    edge_blacklist: HashSet<UnorderedPair<Location>>,
    // holes
    location_blacklist: HashSet<Location>,
    bridges: HashSet<Location>,
    warps: Vec<Warp>,
    core: bool,
    shape: PhantomData<Sh>,
}

/// A builder for boards with square-shaped cells, i.e. the rectangular boards found in Numberlink puzzles and in Flow Free and the Bridges and Warps expansions.
pub type SquareSpaceBuilder = GridSpaceBuilder<SquareStep>;
/// A builder for boards of hexagonal cells in offset rows.
pub type HexSpaceBuilder = GridSpaceBuilder<HexStep>;
/// A builder for circular boards; dimensions are `(sectors, rings)`.
pub type CircleSpaceBuilder = GridSpaceBuilder<CircleStep>;

impl<Sh: Step> Default for GridSpaceBuilder<Sh> {
    fn default() -> Self {
        let five = NonZero::new(5).unwrap_or(NonZero::<usize>::MIN);
        Self::with_dims((five, five))
    }
}

impl<Sh: Step> GridSpaceBuilder<Sh> {
    #[inline]
    fn in_bounds(&self, location: Location) -> bool {
        location.within((self.dims.0.get(), self.dims.1.get()))
    }

    #[inline]
    fn max_loc(&self) -> Location {
        Location(self.dims.0.get() - 1, self.dims.1.get() - 1)
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        let mut cells = self.cells.clone();
        for bridge in &self.bridges {
            cells.index_mut(bridge.as_index()).assign_elem(Cell::Bridge);
        }
        for hole in &self.location_blacklist {
            cells.index_mut(hole.as_index()).assign_elem(Cell::Hole);
        }

        cells.rows().into_iter().map(|row| row.to_vec()).collect_vec()
    }

    fn walls(&self) -> Vec<[Location; 2]> {
        self.edge_blacklist.iter()
            .map(|UnorderedPair(a, b)| if a <= b { [*a, *b] } else { [*b, *a] })
            .sorted()
            .collect_vec()
    }
}

impl<Sh: Step> Builder<Sh> for GridSpaceBuilder<Sh> {
    fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            cells: Array2::from_shape_simple_fn((dims.1.get(), dims.0.get()), Cell::default),
            colors: Default::default(),
            fill: true,

            invalid_reasons: Default::default(),
            edge_blacklist: Default::default(),
            location_blacklist: Default::default(),
            bridges: Default::default(),
            warps: Default::default(),
            core: false,
            shape: PhantomData,
        }
    }

    fn add_termini(&mut self, color: impl Into<Color>, locations: (Location, Location)) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        for location in [locations.0, locations.1] {
            if !self.in_bounds(location) {
                self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
                return self;
            }
        }

        let color = color.into();
        self.colors.push(color.clone());
        for location in [locations.0, locations.1] {
            self.cells.index_mut(location.as_index()).assign_elem(Cell::Terminal(color.clone()))
        }

        self
    }

    fn pop_termini(&mut self) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if let Some(to_remove) = self.colors.pop() {
            self.cells.map_inplace(|cell| {
                if *cell == Cell::Terminal(to_remove.clone()) {
                    cell.assign_elem(Cell::Empty);
                }
            })
        }

        self
    }

    fn add_bridge(&mut self, location: Location) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if Sh::KIND != SpaceKind::Square {
            self.invalid_reasons.push(BuilderInvalidReason::BridgeUnsupported);
            return self;
        }

        if !self.in_bounds(location) {
            self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
            return self;
        }

        if !(1..(self.dims.0.get() - 1)).contains(&location.0) || !(1..(self.dims.1.get() - 1)).contains(&location.1) {
            self.invalid_reasons.push(BuilderInvalidReason::BridgeOnBorder);
            return self;
        }

        self.bridges.insert(location);
        self
    }

    fn drop_location(&mut self, location: Location) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !self.in_bounds(location) {
            self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
            return self;
        }

        self.location_blacklist.insert(location);
        self
    }

    fn disconnect(&mut self, locations: UnorderedPair<Location>) -> &mut Self {
        for location in [locations.0, locations.1] {
            if !self.in_bounds(location) {
                self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
                return self;
            }
        }

        let dims = (self.dims.0.get(), self.dims.1.get());
        if Sh::direction_to(locations.0, locations.1, dims).is_none() {
            return self;
        }

        self.edge_blacklist.insert(locations);

        self
    }

    fn disconnect_around(&mut self, location: Location, directions: Vec<Sh>) -> &mut Self {
        let dims = (self.dims.0.get(), self.dims.1.get());
        for direction in directions.into_iter().unique() {
            if let Some(neighbor) = direction.attempt_from(location, dims) {
                self.disconnect(UnorderedPair::from((location, neighbor)));
            }
        }

        self
    }

    fn with_fill(&mut self, fill: bool) -> &mut Self {
        self.fill = fill;
        self
    }

    fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    fn build(&self) -> Result<Space, &Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(&self.invalid_reasons);
        }

        let grid = Grid {
            width: self.dims.0.get(),
            height: self.dims.1.get(),
            cells: self.rows(),
            colors: self.colors.clone(),
            walls: self.walls(),
            warps: self.warps.clone(),
        };

        let layout = match Sh::KIND {
            SpaceKind::Hex => Layout::Hex(grid),
            SpaceKind::Circle => Layout::Circle(Rings {
                rings: grid.height,
                sectors: grid.width,
                cells: grid.cells,
                colors: grid.colors,
                walls: grid.walls,
                core: self.core,
            }),
            // freeform spaces come from FreeformSpaceBuilder, never from a grid shape
            SpaceKind::Square | SpaceKind::Freeform => Layout::Square(grid),
        };

        Ok(Space::new(layout, self.fill))
    }
}

impl SquareSpaceBuilder {
    /// Join the border cell at `location` to its partner on the opposite border.
    ///
    /// Along an edge the partner is implied; at a corner `direction` picks which border the warp leaves through.
    /// A location off the border, or a corner without a usable `direction`, records
    /// [`WarpBadDirection`](BuilderInvalidReason::WarpBadDirection).
    pub fn add_warp(&mut self, location: Location, direction: Option<SquareStep>) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !self.in_bounds(location) {
            self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
            return self;
        }

        let max = self.max_loc();
        let on_edge = location.0 == 0 || location.1 == 0 || location.0 == max.0 || location.1 == max.1;
        if !on_edge {
            self.invalid_reasons.push(BuilderInvalidReason::WarpBadDirection);
            return self;
        }

        let is_corner = (location.0 == 0 || location.0 == max.0) && (location.1 == 0 || location.1 == max.1);

        let edge = if is_corner {
            match direction {
                Some(direction) => direction,
                None => {
                    self.invalid_reasons.push(BuilderInvalidReason::WarpBadDirection);
                    return self;
                }
            }
        } else {
            match location {
                Location(0, _) => SquareStep::Left,
                Location(_, 0) => SquareStep::Up,
                Location(x, _) if x == max.0 => SquareStep::Right,
                // always true: y == max.1
                _ => SquareStep::Down,
            }
        };

        let partner = match edge {
            SquareStep::Up => Location(location.0, max.1),
            SquareStep::Down => Location(location.0, 0),
            SquareStep::Left => Location(max.0, location.1),
            SquareStep::Right => Location(0, location.1),
        };

        if partner == location {
            // a corner warp pointing back into the board, e.g. Down from the top-left corner
            self.invalid_reasons.push(BuilderInvalidReason::WarpBadDirection);
            return self;
        }

        let warp = Warp { from: location.min(partner), to: location.max(partner) };
        if !self.warps.contains(&warp) {
            self.warps.push(warp);
        }

        self
    }
}

impl CircleSpaceBuilder {
    /// Add (or remove) the hub node joined to every sector of the innermost ring.
    pub fn with_core(&mut self, core: bool) -> &mut Self {
        self.core = core;
        self
    }
}

/// A builder for arbitrary graphs with explicitly declared nodes and edges.
#[derive(Clone, Default)]
pub struct FreeformSpaceBuilder {
    nodes: Vec<FreeformNode>,
    edges: Vec<[String; 2]>,
    terminals: Vec<(Color, [String; 2])>,
    tiles: Vec<Vec<String>>,
    fill: bool,
    invalid_reasons: Vec<BuilderInvalidReason>,
}

impl FreeformSpaceBuilder {
    /// An empty graph that must be filled.
    pub fn new() -> Self {
        Self {
            fill: true,
            ..Default::default()
        }
    }

    fn knows(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    fn require_known<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> bool {
        let all_known = ids.into_iter().all(|id| self.knows(id));
        if !all_known {
            self.invalid_reasons.push(BuilderInvalidReason::UnknownNode);
        }
        all_known
    }

    /// Declare a node drawn at `pos`.
    ///
    /// May cause the builder to enter a [`DuplicateNode`](BuilderInvalidReason::DuplicateNode) invalid state.
    pub fn add_node(&mut self, id: &str, pos: [f64; 3]) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if self.knows(id) {
            self.invalid_reasons.push(BuilderInvalidReason::DuplicateNode);
            return self;
        }

        self.nodes.push(FreeformNode { id: id.to_string(), pos });
        self
    }

    /// Connect two declared nodes.
    pub fn add_edge(&mut self, a: &str, b: &str) -> &mut Self {
        if !self.invalid_reasons.is_empty() || !self.require_known([a, b]) {
            return self;
        }

        self.edges.push([a.to_string(), b.to_string()]);
        self
    }

    /// Declare `color` with its two terminal nodes.
    pub fn add_termini(&mut self, color: impl Into<Color>, nodes: (&str, &str)) -> &mut Self {
        if !self.invalid_reasons.is_empty() || !self.require_known([nodes.0, nodes.1]) {
            return self;
        }

        self.terminals.push((color.into(), [nodes.0.to_string(), nodes.1.to_string()]));
        self
    }

    /// Remove the most recently declared terminal pair.
    pub fn pop_termini(&mut self) -> &mut Self {
        if self.invalid_reasons.is_empty() {
            self.terminals.pop();
        }
        self
    }

    /// Group nodes into one physical tile, making them channels of that tile.
    pub fn add_tile(&mut self, nodes: &[&str]) -> &mut Self {
        if !self.invalid_reasons.is_empty() || !self.require_known(nodes.iter().copied()) {
            return self;
        }

        self.tiles.push(nodes.iter().map(|id| id.to_string()).collect_vec());
        self
    }

    /// Whether every node must be covered.
    pub fn with_fill(&mut self, fill: bool) -> &mut Self {
        self.fill = fill;
        self
    }

    /// `None` if the builder is valid, otherwise every reason it is not.
    pub fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    /// The described space, or the reasons it cannot be built.
    pub fn build(&self) -> Result<Space, &Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(&self.invalid_reasons);
        }

        Ok(Space::new(Layout::Freeform(Freeform {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            terminals: self.terminals.clone(),
            tiles: self.tiles.clone(),
        }), self.fill))
    }
}
