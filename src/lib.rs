#![warn(missing_docs)]

//! # `flowcover`
//!
//! A graph compiler and solver for [Numberlink](https://en.wikipedia.org/wiki/Numberlink) and the puzzles of the mobile game Flow Free,
//! generalised to square, hexagonal, circular and freeform boards.
//! Describe a board as a [`Space`], either directly, from JSON via [`Space::from_json`], or with a builder such as
//! [`SquareSpaceBuilder`](builder::SquareSpaceBuilder) from the [`builder`] module.
//! Then call [`api::solve`] to obtain one path per color, or [`api::graph`] to preview the compiled graph.
//!
//! # Internals
//! Every board is first compiled into a uniform undirected graph ([`compiler::compile`]).
//! A vertex corresponds to a cell as seen in-game, edges encode connections between cells,
//! and bridges become separate channel vertices sharing one position, so paths can cross without joining.
//! Walls, warps, holes and the hub of a circular board are all expressed in the same terms.
//!
//! The rules of the puzzle are then stated once, as data, in a [`ConstraintModel`](model::ConstraintModel):
//! 1. Every terminal has its color and exactly one incident path edge of that color.
//! 2. Every other vertex is either on some color's path, with exactly two incident edges of that color, or uncolored
//!    (only when the board need not be filled), with no used incident edges.
//! 3. Every edge carries at most one color, and both endpoints of a colored edge share it.
//! 4. Channels of one tile never carry the same color.
//! 5. Each color's edges form a single path, without detached loops.
//!
//! Two interchangeable backends interpret the model under a deadline:
//! - [`solver::sat`] expresses rules 1-4 as a Boolean satisfiability problem for `varisat` and enforces rule 5 by refinement,
//!   along lines similar to [Ben Torvaney's project](https://torvaney.github.io/projects/flow-solver.html) and
//!   [Matt Zucker's solution](https://mzucker.github.io/2016/09/02/eating-sat-flavored-crow.html);
//! - [`solver::search`] extends one path at a time by depth-first search, pruning dead ends early.
//!
//! Both check their answer against the model before returning it.

pub use api::{graph, solve, solve_with_cancel, SolveOptions, SolveResponse};
pub use builder::Builder;
pub use error::FlowError;
pub use location::Location;
pub use solver::{Backend, CancelToken};
pub use space::Space;

pub mod affiliation;
pub mod api;
pub mod board;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod location;
pub(crate) mod logic;
pub mod model;
pub mod pool;
pub mod shape;
pub mod solver;
pub mod space;
#[cfg(feature = "wasm")]
pub mod wasm;
mod tests;
