//! # `wave-collapse`
//!
//! `wave-collapse` is a Wave Function Collapse constraint solver for 2D
//! grids: it assigns exactly one pattern to every cell subject to
//! per-direction adjacency rules, by constraint propagation and backtracking
//! search.
//!
//! Build a [`Wave`] and an [`Adjacency`], then hand them to [`solve`] together
//! with a location heuristic, a pattern heuristic, and an [`Observer`]. On
//! success the result is a `width x height` grid of pattern indices; an
//! unsatisfiable wave fails with [`Contradiction`].

// #![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
// #![deny(clippy::pedantic)]

mod adjacency;
mod error;
mod heuristic;
mod observer;
mod propagator;
mod solver;
mod wave;

pub use adjacency::{Adjacency, AdjacencyLists, AdjacencyRule};
pub use error::{Contradiction, InvalidInput};
pub use heuristic::{
    EntropyLocation, LexicalLocation, LexicalPattern, LocationHeuristic, PatternHeuristic,
    WeightedPattern,
};
pub use observer::{Observer, ProgressObserver};
pub use propagator::{propagate, propagate_from};
pub use solver::{SolveOptions, solve};
pub use wave::{Wave, WaveSnapshot};
