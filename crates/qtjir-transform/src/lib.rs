//! The transform kernel: a generic pattern matcher, the `Pass` trait, a
//! fixed-point `PassManager`, and the five standard rewrite passes
//!.

pub mod manager;
pub mod pass;
pub mod passes;
pub mod pattern;

pub use manager::{PassManager, DEFAULT_MAX_ITERATIONS};
pub use pass::Pass;
pub use pattern::{find_all_matches, Pattern};

/// Builds a `PassManager` loaded with the five standard passes in the
/// order the constant-folding/DCE/CSE/fusion/cancellation pipeline
/// expects: folding and DCE first to shrink the graph, then CSE, then
/// the two domain-specific fusions.
pub fn standard_pass_manager() -> PassManager {
    let mut manager = PassManager::new();
    manager
        .add_pass(Box::new(passes::ConstantFolding))
        .add_pass(Box::new(passes::DeadCodeElimination))
        .add_pass(Box::new(passes::CommonSubexpressionElimination))
        .add_pass(Box::new(passes::TensorFusion))
        .add_pass(Box::new(passes::QuantumCancellation));
    manager
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{GraphBuilder, Opcode};

    #[test]
    fn standard_pipeline_folds_and_eliminates_dead_constants() {
        let mut b = GraphBuilder::new("f");
        let dead = b.create_constant_int(7);
        let a = b.create_constant_int(2);
        let c = b.create_constant_int(3);
        let add = b.build_binary(Opcode::Add, a, c);
        b.create_return(Some(add));
        let mut g = b.finish();
        let _ = dead;

        let manager = standard_pass_manager();
        manager.run(&mut g);

        assert!(g.iter().all(|n| n.data.as_integer() != Some(7)));
    }
}
