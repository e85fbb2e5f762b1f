use anyhow::Result;
use fixedbitset::FixedBitSet;
use ndarray::Array2;

use crate::error::InvalidInput;

/// The possibility state over (pattern × cell).
///
/// Each cell of the `(width, height)` grid holds the set of patterns still
/// possible there. Per-cell counts and the grid total are cached so the
/// propagator's fixpoint test and the heuristics' scans stay cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    domains: Array2<FixedBitSet>,
    counts: Array2<usize>,
    total: usize,
    num_patterns: usize,
}

/// An owned copy of a [`Wave`]'s full state, taken with [`Wave::snapshot`].
///
/// Snapshots share nothing with the wave they were taken from; restoring one
/// reproduces the captured state bit for bit.
#[derive(Debug, Clone)]
pub struct WaveSnapshot {
    domains: Array2<FixedBitSet>,
    counts: Array2<usize>,
    total: usize,
}

impl Wave {
    /// Create a wave with every pattern possible at every cell.
    ///
    /// If `ground` is given, the bottom row (`y = height - 1`) is pinned to
    /// that single pattern instead.
    pub fn new(
        num_patterns: usize,
        width: usize,
        height: usize,
        ground: Option<usize>,
    ) -> Result<Self> {
        if num_patterns == 0 || width == 0 || height == 0 {
            return Err(InvalidInput::new(format!(
                "wave dimensions must be positive, got {num_patterns} patterns on a {width}x{height} grid"
            ))
            .into());
        }

        let mut full = FixedBitSet::with_capacity(num_patterns);
        full.insert_range(..);
        let mut domains = Array2::from_elem((width, height), full);
        let mut counts = Array2::from_elem((width, height), num_patterns);
        let mut total = num_patterns * width * height;

        if let Some(g) = ground {
            if g >= num_patterns {
                return Err(InvalidInput::new(format!(
                    "ground pattern {g} out of range for {num_patterns} patterns"
                ))
                .into());
            }
            let mut pinned = FixedBitSet::with_capacity(num_patterns);
            pinned.insert(g);
            for x in 0..width {
                domains[(x, height - 1)] = pinned.clone();
                counts[(x, height - 1)] = 1;
            }
            total -= (num_patterns - 1) * width;
        }

        Ok(Self {
            domains,
            counts,
            total,
            num_patterns,
        })
    }

    /// Number of distinct patterns.
    pub fn num_patterns(&self) -> usize {
        self.num_patterns
    }

    /// Grid width.
    pub fn width(&self) -> usize {
        self.domains.dim().0
    }

    /// Grid height.
    pub fn height(&self) -> usize {
        self.domains.dim().1
    }

    /// Whether `pattern` is still possible at `(x, y)`.
    pub fn possible(&self, pattern: usize, x: usize, y: usize) -> bool {
        self.domains[(x, y)].contains(pattern)
    }

    /// The set of patterns still possible at `(x, y)`.
    pub fn domain(&self, x: usize, y: usize) -> &FixedBitSet {
        &self.domains[(x, y)]
    }

    /// Number of patterns still possible at `(x, y)`.
    pub fn count_at(&self, x: usize, y: usize) -> usize {
        self.counts[(x, y)]
    }

    /// Sum of [`Wave::count_at`] over all cells.
    pub fn total_count(&self) -> usize {
        self.total
    }

    /// Number of cells with more than one possible pattern.
    pub fn unresolved_cells(&self) -> usize {
        self.counts.iter().filter(|&&count| count > 1).count()
    }

    /// Whether any cell has no possible pattern left.
    pub fn is_contradicted(&self) -> bool {
        self.counts.iter().any(|&count| count == 0)
    }

    /// Commit `(x, y)` to `pattern`, discarding every other possibility there.
    ///
    /// The caller must ensure `pattern` was still possible at the cell.
    pub fn clear_except(&mut self, x: usize, y: usize, pattern: usize) {
        debug_assert!(
            self.domains[(x, y)].contains(pattern),
            "cannot commit ({x}, {y}) to pattern {pattern}: not possible there"
        );
        self.total -= self.counts[(x, y)];
        let cell = &mut self.domains[(x, y)];
        cell.clear();
        cell.insert(pattern);
        self.counts[(x, y)] = 1;
        self.total += 1;
    }

    /// Mark `pattern` impossible at `(x, y)`. Returns whether it was possible.
    pub fn remove(&mut self, x: usize, y: usize, pattern: usize) -> bool {
        if self.domains[(x, y)].contains(pattern) {
            self.domains[(x, y)].remove(pattern);
            self.counts[(x, y)] -= 1;
            self.total -= 1;
            true
        } else {
            false
        }
    }

    /// The unique pattern at `(x, y)`, or `None` if the cell is unresolved.
    pub fn resolved_pattern(&self, x: usize, y: usize) -> Option<usize> {
        if self.counts[(x, y)] == 1 {
            self.domains[(x, y)].ones().next()
        } else {
            None
        }
    }

    /// The grid of committed patterns, or `None` unless every cell holds
    /// exactly one possibility.
    pub fn resolved_grid(&self) -> Option<Array2<usize>> {
        if self.counts.iter().any(|&count| count != 1) {
            return None;
        }
        Some(Array2::from_shape_fn(self.domains.dim(), |(x, y)| {
            self.domains[(x, y)].ones().next().unwrap()
        }))
    }

    /// Capture the full wave state for later [`Wave::restore`].
    pub fn snapshot(&self) -> WaveSnapshot {
        WaveSnapshot {
            domains: self.domains.clone(),
            counts: self.counts.clone(),
            total: self.total,
        }
    }

    /// Reset the wave to a previously captured state.
    pub fn restore(&mut self, snapshot: &WaveSnapshot) {
        debug_assert_eq!(
            self.domains.dim(),
            snapshot.domains.dim(),
            "snapshot shape must match the wave"
        );
        self.domains.clone_from(&snapshot.domains);
        self.counts.clone_from(&snapshot.counts);
        self.total = snapshot.total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_wave_counts() {
        let wave = Wave::new(3, 10, 20, None).unwrap();
        assert_eq!(wave.total_count(), 3 * 10 * 20);
        assert_eq!(wave.count_at(5, 19), 3);
        assert_eq!(wave.unresolved_cells(), 200);
    }

    #[test]
    fn grounded_wave_pins_bottom_row() {
        let wave = Wave::new(3, 10, 20, Some(2)).unwrap();
        assert_eq!(wave.total_count(), 3 * 10 * 20 - 2 * 10);
        assert!(wave.possible(2, 5, 19));
        assert!(!wave.possible(1, 5, 19));
        assert_eq!(wave.resolved_pattern(5, 19), Some(2));
        assert_eq!(wave.count_at(5, 18), 3);
    }

    #[test]
    fn zero_dimensions_rejected() {
        let error = Wave::new(0, 3, 4, None).unwrap_err();
        assert!(error.is::<InvalidInput>());
        assert!(Wave::new(3, 0, 4, None).is_err());
        assert!(Wave::new(3, 3, 0, None).is_err());
    }

    #[test]
    fn ground_out_of_range_rejected() {
        let error = Wave::new(3, 4, 4, Some(3)).unwrap_err();
        assert!(error.is::<InvalidInput>());
    }

    #[test]
    fn clear_except_and_remove_track_counts() {
        let mut wave = Wave::new(4, 2, 2, None).unwrap();
        wave.clear_except(1, 0, 3);
        assert_eq!(wave.count_at(1, 0), 1);
        assert_eq!(wave.total_count(), 13);
        assert_eq!(wave.resolved_pattern(1, 0), Some(3));

        assert!(wave.remove(0, 0, 2));
        assert!(!wave.remove(0, 0, 2));
        assert_eq!(wave.count_at(0, 0), 3);
        assert_eq!(wave.total_count(), 12);
        assert!(!wave.is_contradicted());
    }

    #[test]
    fn emptied_cell_is_contradicted() {
        let mut wave = Wave::new(2, 1, 1, None).unwrap();
        wave.remove(0, 0, 0);
        wave.remove(0, 0, 1);
        assert!(wave.is_contradicted());
        assert_eq!(wave.resolved_grid(), None);
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut wave = Wave::new(5, 3, 4, None).unwrap();
        wave.clear_except(0, 0, 0);
        let original = wave.clone();
        let snapshot = wave.snapshot();

        wave.clear_except(1, 2, 3);
        wave.remove(2, 2, 4);
        wave.remove(2, 3, 1);
        assert_ne!(wave, original);

        wave.restore(&snapshot);
        assert_eq!(wave, original);
    }

    #[test]
    fn resolved_grid_requires_every_cell() {
        let mut wave = Wave::new(2, 2, 1, None).unwrap();
        wave.clear_except(0, 0, 1);
        assert_eq!(wave.resolved_grid(), None);
        wave.clear_except(1, 0, 0);
        let grid = wave.resolved_grid().unwrap();
        assert_eq!(grid[(0, 0)], 1);
        assert_eq!(grid[(1, 0)], 0);
    }
}
