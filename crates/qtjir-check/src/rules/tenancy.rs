//! Tenancy-consistency checks. Never escalates to Error.

use qtjir_core::Graph;

use crate::diagnostics::Diagnostic;

pub fn check_tenancy_consistency(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for node in graph.iter() {
        for &input_id in &node.inputs {
            let Some(input) = graph.node(input_id) else {
                continue;
            };
            if input.tenancy != node.tenancy {
                diagnostics.push(Diagnostic::warning(
                    node.id,
                    format!(
                        "node {} ({:?}) consumes input {} ({:?}) -- data transfer node needed",
                        node.id, node.tenancy, input_id, input.tenancy
                    ),
                ));
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{GraphBuilder, Opcode, Tenancy};

    #[test]
    fn mismatched_tenancy_is_a_warning_not_error() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        b.current_tenancy = Tenancy::NpuTensor;
        let b_id = b.create_constant_int(2);
        let add = b.build_binary(Opcode::Add, a, b_id);
        let g = b.finish();
        let diags = check_tenancy_consistency(&g);
        assert!(!diags.is_empty());
        assert!(diags.iter().all(|d| d.severity == crate::diagnostics::Severity::Warning));
        let _ = add;
    }

    #[test]
    fn uniform_tenancy_is_silent() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        let b_id = b.create_constant_int(2);
        b.build_binary(Opcode::Add, a, b_id);
        let g = b.finish();
        assert!(check_tenancy_consistency(&g).is_empty());
    }
}
