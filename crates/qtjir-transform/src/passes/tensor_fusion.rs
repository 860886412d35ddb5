//! Fuses `Tensor_Relu(Tensor_Matmul(A,B))` into a single fused node when
//! both operations share NPU-tensor tenancy.

use qtjir_core::{Graph, Opcode, Tenancy};

use crate::pass::Pass;

pub struct TensorFusion;

impl Pass for TensorFusion {
    fn name(&self) -> &str {
        "tensor_fusion"
    }

    fn run(&self, graph: &mut Graph) -> bool {
        let candidates: Vec<_> = graph
            .iter()
            .filter(|relu| relu.op == Opcode::TensorRelu && relu.tenancy == Tenancy::NpuTensor)
            .filter_map(|relu| {
                let matmul_id = *relu.inputs.first()?;
                let matmul = graph.node(matmul_id)?;
                if matmul.op == Opcode::TensorMatmul && matmul.tenancy == Tenancy::NpuTensor {
                    let inputs: Vec<_> = matmul.inputs.iter().copied().collect();
                    Some((relu.id, inputs, matmul.tensor_metadata.clone()))
                } else {
                    None
                }
            })
            .collect();

        let mut changed = false;
        for (relu_id, matmul_inputs, metadata) in candidates {
            if let Some(node) = graph.node_mut(relu_id) {
                node.op = Opcode::TensorFusedMatmulRelu;
                node.inputs = matmul_inputs.into_iter().collect();
                node.tensor_metadata = metadata;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{DType, GraphBuilder, Layout, TensorMetadata};

    #[test]
    fn fuses_matmul_then_relu_on_npu_tenancy() {
        let mut b = GraphBuilder::new("f");
        b.current_tenancy = Tenancy::NpuTensor;
        let a = b.create_constant_int(1);
        let w = b.create_constant_int(2);
        let matmul = b.build_tensor_op(Opcode::TensorMatmul, &[a, w]);
        b.set_tensor_metadata(matmul, TensorMetadata::new(vec![2, 2], DType::F32, Layout::RowMajor));
        let relu = b.build_tensor_op(Opcode::TensorRelu, &[matmul]);
        let mut g = b.finish();

        let changed = TensorFusion.run(&mut g);
        assert!(changed);
        let node = g.node(relu).unwrap();
        assert_eq!(node.op, Opcode::TensorFusedMatmulRelu);
        assert_eq!(&node.inputs[..], &[a, w]);
        assert_eq!(node.tensor_metadata.as_ref().unwrap().shape, vec![2, 2]);
    }

    #[test]
    fn leaves_mismatched_tenancy_alone() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        let w = b.create_constant_int(2);
        let matmul = b.build_tensor_op(Opcode::TensorMatmul, &[a, w]);
        let relu = b.build_tensor_op(Opcode::TensorRelu, &[matmul]);
        let mut g = b.finish();

        assert!(!TensorFusion.run(&mut g));
        assert_eq!(g.node(relu).unwrap().op, Opcode::TensorRelu);
    }
}
