//! Graph validation: structural invariants, tenancy-consistency warnings,
//! and domain checks over tensor and quantum nodes.

pub mod diagnostics;
pub mod rules;

use qtjir_core::Graph;

pub use diagnostics::{Diagnostic, Severity};

/// The collected findings from a single validation pass. Never aborts
/// early -- every rule runs and contributes to the diagnostic list.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }
}

/// Runs every standard rule over `graph` and collects all diagnostics.
/// Side-effect free: passes may re-run this after rewriting a graph.
pub fn validate(graph: &Graph) -> ValidationResult {
    let mut diagnostics = Vec::new();
    diagnostics.extend(rules::structural::check_reference_integrity(graph));
    diagnostics.extend(rules::structural::check_id_ordering(graph));
    diagnostics.extend(rules::structural::check_acyclicity(graph));
    diagnostics.extend(rules::tenancy::check_tenancy_consistency(graph));
    diagnostics.extend(rules::tensor::check_matmul_shapes(graph));
    diagnostics.extend(rules::quantum::check_quantum_gates(graph));
    diagnostics.extend(rules::quantum::check_quantum_measurement(graph));
    ValidationResult { diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{GraphBuilder, Opcode};

    #[test]
    fn empty_graph_is_valid() {
        let b = GraphBuilder::new("f");
        let g = b.finish();
        let result = validate(&g);
        assert!(!result.has_errors());
    }

    #[test]
    fn out_of_range_input_is_an_error() {
        let mut b = GraphBuilder::new("f");
        let c = b.create_constant_int(1);
        let mut g = b.finish();
        g.node_mut(c).unwrap().push_input(qtjir_core::NodeId(50));
        let result = validate(&g);
        assert!(result.has_errors());
    }

    #[test]
    fn well_formed_arithmetic_graph_has_no_errors() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        let c = b.create_constant_int(2);
        b.build_binary(Opcode::Add, a, c);
        let g = b.finish();
        let result = validate(&g);
        assert!(!result.has_errors());
    }
}
