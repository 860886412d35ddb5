//! The `Pass` trait every transform-kernel rewrite implements.

use qtjir_core::Graph;

/// A single graph rewrite. `run` mutates `graph` in place and reports
/// whether it changed anything, so the pass manager knows whether to
/// keep iterating.
pub trait Pass {
    fn name(&self) -> &str;
    fn run(&self, graph: &mut Graph) -> bool;
}
