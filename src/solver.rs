use anyhow::Result;
use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::adjacency::Adjacency;
use crate::error::{Contradiction, InvalidInput};
use crate::heuristic::{LocationHeuristic, PatternHeuristic};
use crate::observer::Observer;
use crate::propagator::{propagate, propagate_from};
use crate::wave::{Wave, WaveSnapshot};

/// Switches for a [`solve`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Treat the grid as a torus: opposite edges are adjacent.
    pub periodic: bool,
    /// Recover from contradictions by undoing and forbidding choices.
    pub backtracking: bool,
}

// One committed choice and the wave it was committed against.
struct Frame {
    snapshot: WaveSnapshot,
    pattern: usize,
    x: usize,
    y: usize,
}

/// Run the observe-propagate-backtrack search to completion.
///
/// Repeatedly tightens the wave to a fixpoint, asks the observer whether the
/// result is still feasible, and either emits the resolved grid or commits
/// the heuristics' next choice and goes round again. A [`Contradiction`]
/// unwinds the choice stack when `options.backtracking` is set: the most
/// recent choice is undone and forbidden, and the search resumes from that
/// level. A forbidden choice is never re-attempted at the same level.
/// Contradictions that precede every surviving choice, or any contradiction
/// with backtracking disabled, surface to the caller.
///
/// The run is deterministic given the heuristics: the driver itself
/// introduces no randomness. Heuristic contract violations (a resolved or
/// out-of-range cell, an impossible pattern) fail with [`InvalidInput`].
pub fn solve<L, P, O>(
    mut wave: Wave,
    adjacency: &Adjacency,
    location: &mut L,
    pattern: &mut P,
    options: SolveOptions,
    observer: &mut O,
) -> Result<Array2<usize>>
where
    L: LocationHeuristic,
    P: PatternHeuristic,
    O: Observer,
{
    if adjacency.num_patterns() != wave.num_patterns() {
        return Err(InvalidInput::new(format!(
            "adjacency describes {} patterns but the wave holds {}",
            adjacency.num_patterns(),
            wave.num_patterns()
        ))
        .into());
    }

    let mut stack: Vec<Frame> = Vec::new();

    if let Err(error) = propagate(&mut wave, adjacency, options.periodic) {
        recover(error, &mut wave, &mut stack, adjacency, options, observer)?;
    }

    loop {
        // The wave sits at a propagation fixpoint here: gate it, test it,
        // and only then spend a choice on it.
        if !observer.check_feasible(&wave) {
            debug!("feasibility hook rejected the wave");
            let rejection = Contradiction.into();
            recover(rejection, &mut wave, &mut stack, adjacency, options, observer)?;
            continue;
        }
        if let Some(grid) = wave.resolved_grid() {
            return Ok(grid);
        }

        let Some((x, y)) = location.choose(&wave) else {
            return Err(
                InvalidInput::new("location heuristic found no cell in an unresolved wave").into(),
            );
        };
        if x >= wave.width() || y >= wave.height() || wave.count_at(x, y) <= 1 {
            return Err(InvalidInput::new(format!(
                "location heuristic chose a resolved cell ({x}, {y})"
            ))
            .into());
        }
        let Some(chosen) = pattern.choose(wave.domain(x, y)) else {
            return Err(InvalidInput::new(format!(
                "pattern heuristic offered nothing at ({x}, {y})"
            ))
            .into());
        };
        if !wave.possible(chosen, x, y) {
            return Err(InvalidInput::new(format!(
                "pattern heuristic chose impossible pattern {chosen} at ({x}, {y})"
            ))
            .into());
        }

        observer.on_choice(chosen, x, y);
        debug!("committing pattern {chosen} at ({x}, {y})");
        let snapshot = wave.snapshot();
        wave.clear_except(x, y, chosen);
        stack.push(Frame {
            snapshot,
            pattern: chosen,
            x,
            y,
        });

        if let Err(error) = propagate_from(&mut wave, adjacency, options.periodic, (x, y)) {
            recover(error, &mut wave, &mut stack, adjacency, options, observer)?;
        }
    }
}

// Undo choices until propagation succeeds again. Surfaces `error` unchanged
// when backtracking is off, the error is not a contradiction, or no choice
// remains to undo.
fn recover<O: Observer>(
    error: anyhow::Error,
    wave: &mut Wave,
    stack: &mut Vec<Frame>,
    adjacency: &Adjacency,
    options: SolveOptions,
    observer: &mut O,
) -> Result<()> {
    if !options.backtracking || !error.is::<Contradiction>() {
        return Err(error);
    }
    let mut error = error;
    loop {
        let Some(frame) = stack.pop() else {
            return Err(error);
        };
        observer.on_backtrack();
        debug!(
            "backtracking: forbidding pattern {} at ({}, {})",
            frame.pattern, frame.x, frame.y
        );
        wave.restore(&frame.snapshot);
        wave.remove(frame.x, frame.y, frame.pattern);
        match propagate_from(wave, adjacency, options.periodic, (frame.x, frame.y)) {
            Ok(()) => return Ok(()),
            Err(next) if next.is::<Contradiction>() => error = next,
            Err(next) => return Err(next),
        }
    }
}
