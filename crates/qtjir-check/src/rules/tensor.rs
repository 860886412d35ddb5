//! Matmul shape checks.

use qtjir_core::{Graph, Opcode};

use crate::diagnostics::Diagnostic;

pub fn check_matmul_shapes(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for node in graph.iter() {
        if node.op != Opcode::TensorMatmul {
            continue;
        }
        let Some(&lhs_id) = node.inputs.get(0) else { continue };
        let Some(&rhs_id) = node.inputs.get(1) else { continue };
        let lhs_meta = graph.node(lhs_id).and_then(|n| n.tensor_metadata.as_ref());
        let rhs_meta = graph.node(rhs_id).and_then(|n| n.tensor_metadata.as_ref());

        match (lhs_meta, rhs_meta) {
            (Some(lhs), Some(rhs)) => {
                if lhs.rank() != 2 || rhs.rank() != 2 {
                    diagnostics.push(Diagnostic::error(
                        node.id,
                        format!(
                            "matmul at node {} requires rank-2 operands, got ranks {} and {}",
                            node.id, lhs.rank(), rhs.rank()
                        ),
                    ));
                } else if lhs.shape[1] != rhs.shape[0] {
                    diagnostics.push(Diagnostic::error(
                        node.id,
                        format!(
                            "matmul at node {} has incompatible inner dimensions: {} vs {}",
                            node.id, lhs.shape[1], rhs.shape[0]
                        ),
                    ));
                }
            }
            _ => {
                diagnostics.push(Diagnostic::warning(
                    node.id,
                    format!("matmul at node {} is missing tensor metadata on an operand", node.id),
                ));
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{DType, GraphBuilder, Layout, TensorMetadata};

    fn meta(shape: Vec<usize>) -> TensorMetadata {
        TensorMetadata::new(shape, DType::F32, Layout::RowMajor)
    }

    #[test]
    fn missing_metadata_is_warning() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        let c = b.create_constant_int(2);
        b.build_tensor_op(Opcode::TensorMatmul, &[a, c]);
        let g = b.finish();
        let diags = check_matmul_shapes(&g);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, crate::diagnostics::Severity::Warning);
    }

    #[test]
    fn mismatched_inner_dims_is_error() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        b.set_tensor_metadata(a, meta(vec![2, 3]));
        let c = b.create_constant_int(2);
        b.set_tensor_metadata(c, meta(vec![4, 5]));
        b.build_tensor_op(Opcode::TensorMatmul, &[a, c]);
        let g = b.finish();
        let diags = check_matmul_shapes(&g);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, crate::diagnostics::Severity::Error);
    }

    #[test]
    fn compatible_shapes_pass() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        b.set_tensor_metadata(a, meta(vec![2, 3]));
        let c = b.create_constant_int(2);
        b.set_tensor_metadata(c, meta(vec![3, 4]));
        b.build_tensor_op(Opcode::TensorMatmul, &[a, c]);
        let g = b.finish();
        assert!(check_matmul_shapes(&g).is_empty());
    }
}
