//! Cell shapes: how each topology steps between neighbors, places cells and prints boards.

use std::f64::consts::PI;
use std::fmt::Debug;
use std::hash::Hash;

use itertools::Itertools;
use ndarray::Array2;
use strum::VariantArray;

use crate::location::{Coord, Location};
use crate::space::SpaceKind;

/// Functionality that must be implemented on a case-by-case basis for any grid-like board shape.
///
/// [`SquareStep`], [`HexStep`] and [`CircleStep`] are built-in implementations.
pub trait Step: Sized + Copy + VariantArray + PartialEq + Eq + Hash + Ord + PartialOrd + Debug {
    /// The space kind boards of this shape compile from.
    const KIND: SpaceKind;
    /// The static array of all "forward" directions.
    ///
    /// Forward directions should be those which, upon stepping from one location to another, cause the destination location to be indexed higher than the origin location.
    /// Stepping forward from every cell reaches every edge of the board exactly once (up to wrap-around on tiny circular boards).
    const FORWARD_VARIANTS: &'static [Self];
    /// Name suffixes for the channels of a bridge, one per entry of [`Self::FORWARD_VARIANTS`].
    const CHANNEL_NAMES: &'static [&'static str];
    /// Attempt the step from `location` in the direction specified by `self` on a board of `dims`.
    ///
    /// Returns [`None`] if the step leaves the board.
    fn attempt_from(&self, location: Location, dims: (Coord, Coord)) -> Option<Location>;
    /// Invert the direction specified by `self`.
    fn invert(&self) -> Self;
    /// Where the cell at `location` is drawn; rendering only, never consulted by the solvers.
    fn position(location: Location, dims: (Coord, Coord)) -> (f64, f64, f64);
    /// Dump the specified [`ndarray::Array2`], laying out individual characters based on the geometry of the shape [`Self`].
    fn print(board: Array2<char>) -> String;
}

/// The square cell type and rectangular board shape, as found in Numberlink puzzles, Flow Free, and the Bridges and Warps expansions.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum SquareStep {
    /// Toward row 0.
    Up,
    /// Away from row 0.
    Down,
    /// Toward column 0.
    Left,
    /// Away from column 0.
    Right,
}

impl Step for SquareStep {
    const KIND: SpaceKind = SpaceKind::Square;
    const FORWARD_VARIANTS: &'static [Self] = &[Self::Right, Self::Down];
    const CHANNEL_NAMES: &'static [&'static str] = &["h", "v"];

    fn attempt_from(&self, location: Location, dims: (Coord, Coord)) -> Option<Location> {
        let stepped = match self {
            Self::Up => location.offset_by((0, -1)),
            Self::Down => location.offset_by((0, 1)),
            Self::Left => location.offset_by((-1, 0)),
            Self::Right => location.offset_by((1, 0)),
        };

        stepped.within(dims).then_some(stepped)
    }

    fn invert(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    fn position(location: Location, _dims: (Coord, Coord)) -> (f64, f64, f64) {
        // y grows upward when plotted
        (location.0 as f64, -(location.1 as f64), 0.0)
    }

    fn print(board: Array2<char>) -> String {
        let mut out = String::with_capacity(board.nrows() * (board.ncols() + 1));

        for row in board.rows() {
            for col in row {
                out.push(*col);
            }
            out.push('\n');
        }

        out
    }
}

// NB: we organize hexagonal grids as "odd-r" offset rows; odd rows are shifted half a cell right:
// 0 1 2 3
//  0 1 2 3
// 0 1 2 3
//  0 1 2 3
/// The hexagonal cell type, laid out in offset rows.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum HexStep {
    /// Same row, next column.
    East,
    /// Row above, toward higher columns.
    NorthEast,
    /// Row above, toward lower columns.
    NorthWest,
    /// Same row, previous column.
    West,
    /// Row below, toward lower columns.
    SouthWest,
    /// Row below, toward higher columns.
    SouthEast,
}

impl Step for HexStep {
    const KIND: SpaceKind = SpaceKind::Hex;
    const FORWARD_VARIANTS: &'static [Self] = &[Self::East, Self::SouthWest, Self::SouthEast];
    const CHANNEL_NAMES: &'static [&'static str] = &["e", "sw", "se"];

    fn attempt_from(&self, location: Location, dims: (Coord, Coord)) -> Option<Location> {
        // diagonal steps depend on the parity of the row
        let shift = if location.1 % 2 == 0 { -1 } else { 0 };
        let stepped = match self {
            Self::East => location.offset_by((1, 0)),
            Self::West => location.offset_by((-1, 0)),
            Self::NorthEast => location.offset_by((shift + 1, -1)),
            Self::NorthWest => location.offset_by((shift, -1)),
            Self::SouthEast => location.offset_by((shift + 1, 1)),
            Self::SouthWest => location.offset_by((shift, 1)),
        };

        stepped.within(dims).then_some(stepped)
    }

    fn invert(&self) -> Self {
        match self {
            Self::East => Self::West,
            Self::NorthEast => Self::SouthWest,
            Self::NorthWest => Self::SouthEast,
            Self::West => Self::East,
            Self::SouthWest => Self::NorthEast,
            Self::SouthEast => Self::NorthWest,
        }
    }

    fn position(location: Location, _dims: (Coord, Coord)) -> (f64, f64, f64) {
        let shift = if location.1 % 2 == 1 { 0.5 } else { 0.0 };
        (location.0 as f64 + shift, -(location.1 as f64) * 3f64.sqrt() / 2.0, 0.0)
    }

    fn print(board: Array2<char>) -> String {
        board.rows().into_iter()
            .enumerate()
            .map(|(y, row)| {
                let indent = if y % 2 == 1 { " " } else { "" };
                format!("{indent}{}\n", row.iter().join(" "))
            })
            .collect()
    }
}

/// Cells of a circular board: rings are rows (innermost first) and sectors are columns, wrapping around.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum CircleStep {
    /// One ring closer to the center.
    Inward,
    /// One ring further out.
    Outward,
    /// Next sector, wrapping.
    Clockwise,
    /// Previous sector, wrapping.
    Counterclockwise,
}

impl Step for CircleStep {
    const KIND: SpaceKind = SpaceKind::Circle;
    const FORWARD_VARIANTS: &'static [Self] = &[Self::Clockwise, Self::Outward];
    const CHANNEL_NAMES: &'static [&'static str] = &["cw", "out"];

    fn attempt_from(&self, location: Location, dims: (Coord, Coord)) -> Option<Location> {
        let (sectors, rings) = dims;
        let stepped = match self {
            Self::Inward => location.offset_by((0, -1)),
            Self::Outward => location.offset_by((0, 1)),
            Self::Clockwise => Location((location.0 + 1) % sectors, location.1),
            Self::Counterclockwise => Location((location.0 + sectors - 1) % sectors, location.1),
        };

        (stepped.within((sectors, rings)) && stepped != location).then_some(stepped)
    }

    fn invert(&self) -> Self {
        match self {
            Self::Inward => Self::Outward,
            Self::Outward => Self::Inward,
            Self::Clockwise => Self::Counterclockwise,
            Self::Counterclockwise => Self::Clockwise,
        }
    }

    fn position(location: Location, dims: (Coord, Coord)) -> (f64, f64, f64) {
        // adjacent sectors of the innermost ring sit roughly one unit apart
        let base_radius = (dims.0 as f64 / (2.0 * PI)).max(1.0);
        let radius = base_radius + location.1 as f64;
        let theta = 2.0 * PI * location.0 as f64 / dims.0 as f64;
        (radius * theta.cos(), radius * theta.sin(), 0.0)
    }

    fn print(board: Array2<char>) -> String {
        SquareStep::print(board)
    }
}

/// Functionality on top of [`Step`] with identical implementation across all shapes.
pub trait Shape: Step {
    /// Determine the direction from `a` to `b` by calling [`attempt_from`](Step::attempt_from) until one works.
    ///
    /// It works only on two [`Location`]s which are adjacent in the array representation of their board and will return [`None`] otherwise.
    fn direction_to(a: Location, b: Location, dims: (Coord, Coord)) -> Option<Self>;
    /// Convert this [`Self`] to a "forward" direction, if it is not already such a direction.
    ///
    /// For the definition of forward directions, see [`Step::FORWARD_VARIANTS`].
    fn ensure_forward(&self) -> Self;
}

impl<Sh> Shape for Sh
where
    Sh: Step,
{
    fn direction_to(a: Location, b: Location, dims: (Coord, Coord)) -> Option<Self> {
        Self::VARIANTS.iter().find(|dir| dir.attempt_from(a, dims) == Some(b)).copied()
    }

    fn ensure_forward(&self) -> Self {
        match Self::FORWARD_VARIANTS.contains(self) {
            true => *self,
            false => self.invert(),
        }
    }
}
