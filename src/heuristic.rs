use fixedbitset::FixedBitSet;
use ndarray::Array2;
use rand::{distr::weighted::WeightedIndex, prelude::*};

use crate::wave::Wave;

/// Selects the next cell for the search driver to observe.
pub trait LocationHeuristic {
    /// Pick an unresolved cell, or `None` when every cell is resolved.
    fn choose(&mut self, wave: &Wave) -> Option<(usize, usize)>;
}

/// Selects which pattern to commit at the chosen cell.
pub trait PatternHeuristic {
    /// Pick one of the still-possible patterns, or `None` if none remain.
    fn choose(&mut self, possible: &FixedBitSet) -> Option<usize>;
}

/// The fewest-possibilities cell, ties broken in row-major order
/// (lowest `x`, then lowest `y`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalLocation;

impl LocationHeuristic for LexicalLocation {
    fn choose(&mut self, wave: &Wave) -> Option<(usize, usize)> {
        let mut best: Option<((usize, usize), usize)> = None;
        for x in 0..wave.width() {
            for y in 0..wave.height() {
                let count = wave.count_at(x, y);
                if count > 1 && best.is_none_or(|(_, smallest)| count < smallest) {
                    best = Some(((x, y), count));
                }
            }
        }
        best.map(|(cell, _)| cell)
    }
}

/// Minimises `preferences[cell] + count_at(cell)` over unresolved cells,
/// ties broken in row-major order.
///
/// The preference grid is an additive bias on top of the raw possibility
/// count; resolved cells are excluded outright.
#[derive(Debug, Clone)]
pub struct EntropyLocation {
    preferences: Array2<f64>,
}

impl EntropyLocation {
    /// `preferences` must have the wave's `(width, height)` shape.
    pub fn new(preferences: Array2<f64>) -> Self {
        Self { preferences }
    }
}

impl LocationHeuristic for EntropyLocation {
    fn choose(&mut self, wave: &Wave) -> Option<(usize, usize)> {
        debug_assert_eq!(
            self.preferences.dim(),
            (wave.width(), wave.height()),
            "preference grid must match the wave shape"
        );
        let mut best: Option<((usize, usize), f64)> = None;
        for x in 0..wave.width() {
            for y in 0..wave.height() {
                let count = wave.count_at(x, y);
                if count <= 1 {
                    continue;
                }
                let weight = self.preferences[(x, y)] + count as f64;
                if best.is_none_or(|(_, smallest)| weight < smallest) {
                    best = Some(((x, y), weight));
                }
            }
        }
        best.map(|(cell, _)| cell)
    }
}

/// The smallest still-possible pattern index.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalPattern;

impl PatternHeuristic for LexicalPattern {
    fn choose(&mut self, possible: &FixedBitSet) -> Option<usize> {
        possible.ones().next()
    }
}

/// A frequency-weighted random choice among the possible patterns.
///
/// Falls back to a uniform draw when any candidate weight is zero, since a
/// zero weight breaks the weighted distribution.
#[derive(Debug, Clone)]
pub struct WeightedPattern<R: Rng> {
    weights: Vec<usize>,
    rng: R,
}

impl<R: Rng> WeightedPattern<R> {
    /// `weights[p]` is the relative frequency of pattern `p`; patterns beyond
    /// the vector count as weight zero.
    pub fn new(weights: Vec<usize>, rng: R) -> Self {
        Self { weights, rng }
    }
}

impl<R: Rng> PatternHeuristic for WeightedPattern<R> {
    fn choose(&mut self, possible: &FixedBitSet) -> Option<usize> {
        let options: Vec<usize> = possible.ones().collect();
        if options.is_empty() {
            return None;
        }
        let weights: Vec<usize> = options
            .iter()
            .map(|&pattern| self.weights.get(pattern).copied().unwrap_or(0))
            .collect();

        if weights.iter().any(|&weight| weight == 0) {
            return Some(options[self.rng.random_range(0..options.len())]);
        }
        let dist = WeightedIndex::new(&weights).unwrap();
        Some(options[dist.sample(&mut self.rng)])
    }
}
