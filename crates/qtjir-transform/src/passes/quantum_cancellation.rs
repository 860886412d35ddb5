//! Cancels back-to-back self-inverse quantum gates acting on the same
//! qubits: `Quantum_Gate(g, Quantum_Gate(g, X))` rewires every user of the
//! outer gate to `X`.

use std::collections::HashMap;

use qtjir_core::{Graph, NodeId, Opcode};

use crate::pass::Pass;

pub struct QuantumCancellation;

impl Pass for QuantumCancellation {
    fn name(&self) -> &str {
        "quantum_cancellation"
    }

    fn run(&self, graph: &mut Graph) -> bool {
        let mut bypass: HashMap<NodeId, NodeId> = HashMap::new();

        for outer in graph.iter().filter(|n| n.op == Opcode::QuantumGate) {
            let Some(outer_meta) = outer.quantum_metadata.as_ref() else {
                continue;
            };
            if !outer_meta.gate_type.is_self_inverse() {
                continue;
            }
            let Some(&inner_id) = outer.inputs.first() else {
                continue;
            };
            let Some(inner) = graph.node(inner_id) else {
                continue;
            };
            if inner.op != Opcode::QuantumGate {
                continue;
            }
            let Some(inner_meta) = inner.quantum_metadata.as_ref() else {
                continue;
            };
            if inner_meta.gate_type != outer_meta.gate_type || inner_meta.qubits != outer_meta.qubits {
                continue;
            }
            let Some(&bypass_target) = inner.inputs.first() else {
                continue;
            };
            bypass.insert(outer.id, bypass_target);
        }

        if bypass.is_empty() {
            return false;
        }

        let mut changed = false;
        for node in graph.iter_mut() {
            for input in node.inputs.iter_mut() {
                if let Some(&target) = bypass.get(input) {
                    *input = target;
                    changed = true;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{GateType, GraphBuilder, QuantumMetadata, Tenancy};

    #[test]
    fn cancels_double_hadamard_on_same_qubit() {
        let mut b = GraphBuilder::new("f");
        b.current_tenancy = Tenancy::QpuQuantum;
        let qubit = b.create_constant_int(0);
        let inner = b.build_quantum_gate(QuantumMetadata::new(GateType::Hadamard, vec![0], vec![]), &[qubit]);
        let outer = b.build_quantum_gate(QuantumMetadata::new(GateType::Hadamard, vec![0], vec![]), &[inner]);
        let user = b.build_unary(Opcode::OptionalSome, outer);
        let mut g = b.finish();

        let changed = QuantumCancellation.run(&mut g);
        assert!(changed);
        assert_eq!(g.node(user).unwrap().inputs[0], qubit);
    }

    #[test]
    fn does_not_cancel_rotation_gates() {
        let mut b = GraphBuilder::new("f");
        b.current_tenancy = Tenancy::QpuQuantum;
        let qubit = b.create_constant_int(0);
        let inner = b.build_quantum_gate(QuantumMetadata::new(GateType::Rx, vec![0], vec![0.5]), &[qubit]);
        let outer = b.build_quantum_gate(QuantumMetadata::new(GateType::Rx, vec![0], vec![0.5]), &[inner]);
        let mut g = b.finish();

        assert!(!QuantumCancellation.run(&mut g));
        let _ = outer;
    }

    #[test]
    fn does_not_cancel_different_qubits() {
        let mut b = GraphBuilder::new("f");
        b.current_tenancy = Tenancy::QpuQuantum;
        let qubit = b.create_constant_int(0);
        let inner = b.build_quantum_gate(QuantumMetadata::new(GateType::Hadamard, vec![0], vec![]), &[qubit]);
        let outer = b.build_quantum_gate(QuantumMetadata::new(GateType::Hadamard, vec![1], vec![]), &[inner]);
        let mut g = b.finish();

        assert!(!QuantumCancellation.run(&mut g));
        let _ = outer;
    }
}
