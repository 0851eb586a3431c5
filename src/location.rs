//! Board coordinates.

use std::num::NonZero;

use ndarray::Ix;
use serde::{Deserialize, Serialize};

/// One board coordinate.
pub type Coord = usize;
/// A nonzero board extent; widths, heights, ring and sector counts.
pub type Dimension = NonZero<Coord>;

/// A location `(x, y)` on a board. The top left corner is `Location(0, 0)`.
///
/// On circular boards `x` is the sector and `y` the ring, innermost ring first.
#[derive(Clone, Eq, Hash, Copy, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub struct Location(pub Coord, pub Coord);

impl Location {
    pub(crate) fn as_index(&self) -> (Coord, Coord) {
        (self.1, self.0)
    }

    pub(crate) fn offset_by(self, rhs: (isize, isize)) -> Self {
        Self(self.0.wrapping_add_signed(rhs.0), self.1.wrapping_add_signed(rhs.1))
    }

    pub(crate) fn within(&self, dims: (Coord, Coord)) -> bool {
        self.0 < dims.0 && self.1 < dims.1
    }

    /// Node name used on the wire, e.g. `"3,1"`.
    pub(crate) fn tile_name(&self) -> String {
        format!("{},{}", self.0, self.1)
    }
}

impl From<(Ix, Ix)> for Location {
    fn from(value: (Ix, Ix)) -> Self {
        Self(value.1, value.0)
    }
}
