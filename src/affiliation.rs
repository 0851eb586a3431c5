//! Colors and the numeric affiliations the solvers work with.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Index of a color in declaration order, offset by one.
/// Affiliation 0 is the null affiliation, i.e. "uncolored".
pub type AffiliationID = usize;

pub(crate) const UNAFFILIATED: AffiliationID = 0;

/// A color label as declared by the puzzle, e.g. `"A"` or `"red"`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub String);

impl Color {
    /// The character used when drawing this color on a text board.
    pub(crate) fn glyph(&self) -> char {
        self.0.chars().next().unwrap_or('?')
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<char> for Color {
    fn from(value: char) -> Self {
        Self(value.to_string())
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
