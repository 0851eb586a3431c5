//! Text rendering of grid-like spaces, optionally overlaid with a solution.
//!
//! Terminals print as their color's first letter in uppercase, solved path cells in lowercase.
//! Bridges print as `+`, holes as `#` and uncovered cells as `.`.

use ndarray::Array2;

use crate::api::SolveResponse;
use crate::error::FlowError;
use crate::location::Location;
use crate::shape::{CircleStep, HexStep, SquareStep, Step};
use crate::space::{Cell, Layout, Space};

fn glyph_of(cell: &Cell, location: Location, solution: Option<&SolveResponse>) -> char {
    match cell {
        Cell::Hole => '#',
        Cell::Bridge => '+',
        Cell::Terminal(color) => color.glyph().to_ascii_uppercase(),
        Cell::Empty => solution
            .and_then(|solved| solved.node_color.get(&location.tile_name()))
            .and_then(|color| color.as_ref())
            .and_then(|color| color.chars().next())
            .map_or('.', |glyph| glyph.to_ascii_lowercase()),
    }
}

fn draw<Sh: Step>(cells: &[Vec<Cell>], solution: Option<&SolveResponse>) -> String {
    let height = cells.len();
    let width = cells.first().map_or(0, Vec::len);

    let board = Array2::from_shape_fn((height, width), |index| {
        let location = Location::from(index);
        cells.get(location.1)
            .and_then(|row| row.get(location.0))
            .map_or('#', |cell| glyph_of(cell, location, solution))
    });

    Sh::print(board)
}

/// Draw `space`, filling in path cells from `solution` when given.
///
/// Freeform spaces have no grid to draw and yield a [`FlowError::Config`].
pub fn render(space: &Space, solution: Option<&SolveResponse>) -> Result<String, FlowError> {
    match &space.layout {
        Layout::Square(grid) => Ok(draw::<SquareStep>(&grid.cells, solution)),
        Layout::Hex(grid) => Ok(draw::<HexStep>(&grid.cells, solution)),
        Layout::Circle(rings) => Ok(draw::<CircleStep>(&rings.cells, solution)),
        Layout::Freeform(_) => Err(FlowError::Config("freeform spaces cannot be rendered as text".to_string())),
    }
}
