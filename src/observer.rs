use indicatif::{ProgressBar, ProgressStyle};

use crate::wave::Wave;

/// Event hooks invoked synchronously by the search driver.
///
/// Every method has a no-op default, so implementors override only what they
/// care about. Panics from hooks are not caught; callers own their hooks'
/// error discipline.
pub trait Observer {
    /// Called with the chosen pattern and cell, just before it is committed.
    fn on_choice(&mut self, _pattern: usize, _x: usize, _y: usize) {}

    /// Called after a contradiction is caught and before the offending
    /// choice is forbidden.
    fn on_backtrack(&mut self) {}

    /// Consulted once per search frame, with the wave at a propagation
    /// fixpoint. Returning `false` rejects the wave as a contradiction.
    fn check_feasible(&mut self, _wave: &Wave) -> bool {
        true
    }
}

/// The null observer.
impl Observer for () {}

/// Renders search progress as a terminal bar, with the running backtrack
/// count in the message slot.
pub struct ProgressObserver {
    progress_bar: ProgressBar,
    backtrack_count: usize,
}

impl ProgressObserver {
    /// Create a bar sized to the number of cells still to collapse,
    /// typically [`Wave::unresolved_cells`].
    pub fn new(cells_to_collapse: usize) -> Self {
        let pb = ProgressBar::new(cells_to_collapse as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} cells (Backtracked: {msg})",
            )
            .unwrap()
            .progress_chars("##-"),
        );
        pb.set_message("0");
        Self {
            progress_bar: pb,
            backtrack_count: 0,
        }
    }

    /// Number of backtracks seen so far.
    pub fn backtrack_count(&self) -> usize {
        self.backtrack_count
    }

    /// Finish and clear the bar, reporting the final backtrack tally.
    pub fn finish(self) {
        self.progress_bar.finish_and_clear();
        if self.backtrack_count > 0 {
            println!("Completed with {} backtracking attempts", self.backtrack_count);
        }
    }
}

impl Observer for ProgressObserver {
    fn on_choice(&mut self, _pattern: usize, _x: usize, _y: usize) {
        self.progress_bar.inc(1);
    }

    fn on_backtrack(&mut self) {
        self.backtrack_count += 1;
        self.progress_bar
            .set_message(self.backtrack_count.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_observer_counts_backtracks() {
        let mut observer = ProgressObserver::new(4);
        observer.on_choice(0, 0, 0);
        observer.on_backtrack();
        observer.on_backtrack();
        assert_eq!(observer.backtrack_count(), 2);
        observer.finish();
    }

    #[test]
    fn default_hooks_accept_everything() {
        let wave = Wave::new(2, 2, 2, None).unwrap();
        let mut observer = ();
        assert!(observer.check_feasible(&wave));
        observer.on_choice(1, 0, 0);
        observer.on_backtrack();
    }
}
