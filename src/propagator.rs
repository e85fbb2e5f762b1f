use anyhow::Result;
use log::{debug, trace};
use std::collections::VecDeque;

use crate::adjacency::Adjacency;
use crate::error::Contradiction;
use crate::wave::Wave;

// A directed arc: which patterns at `target` keep support from `source`,
// where `source` sits at `directions()[direction]` from `target`.
type Arc = ((usize, usize), (usize, usize), usize);

/// Tighten `wave` to its constraint-consistent fixpoint.
///
/// A pattern survives at a cell only while every direction still offers at
/// least one supporting pattern in the corresponding neighbor cell. With
/// `periodic` the grid wraps toroidally; otherwise out-of-bounds neighbors
/// impose no constraint at all. Fails with [`Contradiction`] when a cell
/// runs out of patterns, or when the wave is already contradicted on entry.
///
/// Tightening is monotone and idempotent: the total possibility count never
/// increases, and re-propagating a fixpoint changes nothing.
pub fn propagate(wave: &mut Wave, adjacency: &Adjacency, periodic: bool) -> Result<()> {
    let (width, height) = (wave.width(), wave.height());
    let mut queue = VecDeque::with_capacity(width * height * adjacency.directions().len());
    for x in 0..width {
        for y in 0..height {
            for (direction, &offset) in adjacency.directions().iter().enumerate() {
                if let Some(source) = neighbour((x, y), offset, width, height, periodic) {
                    queue.push_back(((x, y), source, direction));
                }
            }
        }
    }
    run_queue(wave, adjacency, periodic, queue)
}

/// Re-tighten after the domain at `origin` shrank.
///
/// Equivalent to [`propagate`] provided the wave was at a fixpoint before
/// `origin` changed; only arcs supported by `origin` need re-examination, and
/// further removals cascade from there.
pub fn propagate_from(
    wave: &mut Wave,
    adjacency: &Adjacency,
    periodic: bool,
    origin: (usize, usize),
) -> Result<()> {
    let mut queue = VecDeque::new();
    enqueue_dependents(&mut queue, origin, adjacency, wave.width(), wave.height(), periodic);
    run_queue(wave, adjacency, periodic, queue)
}

fn run_queue(
    wave: &mut Wave,
    adjacency: &Adjacency,
    periodic: bool,
    mut queue: VecDeque<Arc>,
) -> Result<()> {
    if wave.is_contradicted() {
        return Err(Contradiction.into());
    }

    while let Some((target, source, direction)) = queue.pop_front() {
        if revise(wave, adjacency, target, source, direction) {
            if wave.count_at(target.0, target.1) == 0 {
                debug!("contradiction at ({}, {})", target.0, target.1);
                return Err(Contradiction.into());
            }
            enqueue_dependents(
                &mut queue,
                target,
                adjacency,
                wave.width(),
                wave.height(),
                periodic,
            );
        }
    }
    Ok(())
}

// Remove the patterns at `target` with no remaining support at `source`.
// Returns whether anything was removed.
fn revise(
    wave: &mut Wave,
    adjacency: &Adjacency,
    target: (usize, usize),
    source: (usize, usize),
    direction: usize,
) -> bool {
    let mut removed = Vec::new();

    // Fast path: a resolved source supports exactly one permission row.
    if wave.count_at(source.0, source.1) == 1 {
        let support = wave.domain(source.0, source.1).ones().next().unwrap();
        for pattern in wave.domain(target.0, target.1).ones() {
            if !adjacency.permits(direction, pattern, support) {
                removed.push(pattern);
            }
        }
    } else {
        for pattern in wave.domain(target.0, target.1).ones() {
            let mask = adjacency.mask(direction, pattern);
            let mut supported = false;
            for support in wave.domain(source.0, source.1).ones() {
                if mask[support] {
                    supported = true;
                    break;
                }
            }
            if !supported {
                removed.push(pattern);
            }
        }
    }

    if removed.is_empty() {
        return false;
    }
    for pattern in removed {
        trace!(
            "removing pattern {pattern} at ({}, {}): no support at ({}, {})",
            target.0,
            target.1,
            source.0,
            source.1
        );
        wave.remove(target.0, target.1, pattern);
    }
    true
}

// Every arc that uses `changed` as its support cell must be re-examined.
// The arc pointing back at the cell just revised is included: per-direction
// rules need not mirror each other, so the reverse constraint can lose
// support too.
fn enqueue_dependents(
    queue: &mut VecDeque<Arc>,
    changed: (usize, usize),
    adjacency: &Adjacency,
    width: usize,
    height: usize,
    periodic: bool,
) {
    for (direction, &(dx, dy)) in adjacency.directions().iter().enumerate() {
        if let Some(target) = neighbour(changed, (-dx, -dy), width, height, periodic) {
            queue.push_back((target, changed, direction));
        }
    }
}

fn neighbour(
    cell: (usize, usize),
    offset: (isize, isize),
    width: usize,
    height: usize,
    periodic: bool,
) -> Option<(usize, usize)> {
    let (dx, dy) = offset;
    if periodic {
        let x = (cell.0 as isize + dx).rem_euclid(width as isize) as usize;
        let y = (cell.1 as isize + dy).rem_euclid(height as isize) as usize;
        Some((x, y))
    } else {
        let x = cell.0.checked_add_signed(dx)?;
        let y = cell.1.checked_add_signed(dy)?;
        (x < width && y < height).then_some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::AdjacencyLists;
    use crate::error::Contradiction;

    // Checkerboard pair 0/1 plus a solid filler 2, all four cardinals.
    fn checkerboard() -> Adjacency {
        let lists = AdjacencyLists::cardinal(vec![vec![1], vec![0], vec![2]]);
        Adjacency::new(3, &lists).unwrap()
    }

    #[test]
    fn pinned_cell_forces_checkerboard() {
        let mut wave = Wave::new(3, 3, 4, None).unwrap();
        wave.clear_except(0, 0, 0);
        propagate(&mut wave, &checkerboard(), false).unwrap();

        for x in 0..3 {
            for y in 0..4 {
                let parity_pattern = (x + y) % 2;
                assert!(wave.possible(parity_pattern, x, y));
                assert!(!wave.possible(1 - parity_pattern, x, y));
                assert!(!wave.possible(2, x, y));
            }
        }
        assert_eq!(wave.total_count(), 12);
    }

    #[test]
    fn full_wave_is_already_a_fixpoint() {
        let mut wave = Wave::new(3, 3, 4, None).unwrap();
        propagate(&mut wave, &checkerboard(), false).unwrap();
        assert_eq!(wave.total_count(), 36);
    }

    #[test]
    fn tightening_is_monotone_and_idempotent() {
        let mut wave = Wave::new(3, 3, 4, None).unwrap();
        wave.clear_except(1, 1, 0);
        let before = wave.total_count();
        propagate(&mut wave, &checkerboard(), false).unwrap();
        assert!(wave.total_count() <= before);

        let fixpoint = wave.clone();
        propagate(&mut wave, &checkerboard(), false).unwrap();
        assert_eq!(wave, fixpoint);
    }

    #[test]
    fn odd_periodic_ring_contradicts_checkerboard() {
        // Wrapping a 3-wide row makes the 0/1 alternation impossible.
        let mut wave = Wave::new(3, 3, 4, None).unwrap();
        wave.clear_except(0, 0, 0);
        let error = propagate(&mut wave, &checkerboard(), true).unwrap_err();
        assert!(error.is::<Contradiction>());
    }

    #[test]
    fn forbidding_one_choice_collapses_periodic_grid() {
        let mut wave = Wave::new(3, 3, 4, None).unwrap();
        wave.remove(0, 0, 0);
        propagate(&mut wave, &checkerboard(), true).unwrap();
        let grid = wave.resolved_grid().unwrap();
        assert!(grid.iter().all(|&pattern| pattern == 2));
    }

    #[test]
    fn non_periodic_border_imposes_no_constraint() {
        // A 1x1 grid has no in-bounds neighbors; nothing may be removed.
        let mut wave = Wave::new(3, 1, 1, None).unwrap();
        propagate(&mut wave, &checkerboard(), false).unwrap();
        assert_eq!(wave.total_count(), 3);
    }

    #[test]
    fn resolved_source_can_empty_a_resolved_target() {
        let mut lists = AdjacencyLists::new();
        lists.push((1, 0), vec![vec![2], vec![2], vec![2]]);
        lists.push((-1, 0), vec![vec![2], vec![2], vec![2]]);
        let adjacency = Adjacency::new(3, &lists).unwrap();

        let mut wave = Wave::new(3, 2, 1, None).unwrap();
        wave.clear_except(0, 0, 0);
        wave.clear_except(1, 0, 1);
        let error = propagate(&mut wave, &adjacency, false).unwrap_err();
        assert!(error.is::<Contradiction>());
    }

    #[test]
    fn empty_direction_set_is_a_no_op() {
        let adjacency = Adjacency::new(3, &AdjacencyLists::new()).unwrap();
        let mut wave = Wave::new(3, 2, 2, None).unwrap();
        wave.clear_except(0, 0, 1);
        propagate(&mut wave, &adjacency, false).unwrap();
        assert_eq!(wave.total_count(), 10);
    }

    #[test]
    fn contradicted_wave_fails_immediately() {
        let adjacency = Adjacency::new(2, &AdjacencyLists::new()).unwrap();
        let mut wave = Wave::new(2, 2, 1, None).unwrap();
        wave.remove(0, 0, 0);
        wave.remove(0, 0, 1);
        let error = propagate(&mut wave, &adjacency, false).unwrap_err();
        assert!(error.is::<Contradiction>());
    }

    #[test]
    fn incremental_matches_full_propagation() {
        let adjacency = checkerboard();
        let mut full = Wave::new(3, 4, 4, None).unwrap();
        propagate(&mut full, &adjacency, false).unwrap();
        let mut incremental = full.clone();

        full.clear_except(2, 1, 0);
        incremental.clear_except(2, 1, 0);
        propagate(&mut full, &adjacency, false).unwrap();
        propagate_from(&mut incremental, &adjacency, false, (2, 1)).unwrap();
        assert_eq!(full, incremental);
    }
}
