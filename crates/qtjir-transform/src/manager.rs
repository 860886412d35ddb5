//! Fixed-point pass scheduling.

use qtjir_core::Graph;
use tracing::debug;

use crate::pass::Pass;

/// Default bound on fixed-point iterations. A design knob, not an
/// invariant -- raising it never changes a pass's semantics, only how
/// long the manager keeps re-running the set looking for more change.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Runs an ordered list of passes to a fixed point.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
    max_iterations: usize,
}

impl PassManager {
    pub fn new() -> Self {
        PassManager {
            passes: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(max_iterations: usize) -> Self {
        PassManager {
            passes: Vec::new(),
            max_iterations,
        }
    }

    pub fn add_pass(&mut self, pass: Box<dyn Pass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Repeats `for each pass: changed |= pass.run(graph)` until a full
    /// sweep makes no change or `max_iterations` is reached. Returns the
    /// number of sweeps actually performed.
    pub fn run(&self, graph: &mut Graph) -> usize {
        let mut iterations = 0;
        loop {
            let mut changed = false;
            for pass in &self.passes {
                let pass_changed = pass.run(graph);
                if pass_changed {
                    debug!(pass = pass.name(), "pass reported a change");
                }
                changed |= pass_changed;
            }
            iterations += 1;
            if !changed || iterations >= self.max_iterations {
                break;
            }
        }
        iterations
    }
}

impl Default for PassManager {
    fn default() -> Self {
        PassManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::GraphBuilder;
    use std::cell::Cell;

    struct CountingPass {
        remaining: Cell<usize>,
    }

    impl Pass for CountingPass {
        fn name(&self) -> &str {
            "counting"
        }

        fn run(&self, _graph: &mut Graph) -> bool {
            let remaining = self.remaining.get();
            if remaining == 0 {
                false
            } else {
                self.remaining.set(remaining - 1);
                true
            }
        }
    }

    #[test]
    fn stops_at_fixed_point_before_max_iterations() {
        let mut manager = PassManager::new();
        manager.add_pass(Box::new(CountingPass { remaining: Cell::new(3) }));
        let mut g = GraphBuilder::new("f").finish();
        let iterations = manager.run(&mut g);
        assert_eq!(iterations, 4);
    }

    #[test]
    fn respects_max_iterations_bound() {
        let manager = PassManager::with_max_iterations(2);
        let mut g = GraphBuilder::new("f").finish();
        struct AlwaysChanges;
        impl Pass for AlwaysChanges {
            fn name(&self) -> &str {
                "always"
            }
            fn run(&self, _graph: &mut Graph) -> bool {
                true
            }
        }
        let mut manager = manager;
        manager.add_pass(Box::new(AlwaysChanges));
        let iterations = manager.run(&mut g);
        assert_eq!(iterations, 2);
    }
}
