//! Quantum gate and measurement checks.

use qtjir_core::{Graph, Opcode, Tenancy};

use crate::diagnostics::Diagnostic;

/// Above this qubit index, a gate or measurement draws a Warning rather
/// than rejection -- large indices are plausible but worth flagging.
const QUBIT_INDEX_WARNING_THRESHOLD: usize = 50;

pub fn check_quantum_gates(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for node in graph.iter() {
        if node.op != Opcode::QuantumGate {
            continue;
        }
        let Some(meta) = node.quantum_metadata.as_ref() else {
            diagnostics.push(Diagnostic::error(
                node.id,
                format!("quantum gate at node {} is missing quantum_metadata", node.id),
            ));
            continue;
        };

        let expected_arity = meta.gate_type.arity();
        if meta.qubits.len() != expected_arity {
            diagnostics.push(Diagnostic::error(
                node.id,
                format!(
                    "gate {:?} at node {} expects {expected_arity} qubits, got {}",
                    meta.gate_type, node.id, meta.qubits.len()
                ),
            ));
        }

        if meta.gate_type.is_rotation() {
            if meta.parameters.len() != 1 || !meta.parameters[0].is_finite() {
                diagnostics.push(Diagnostic::error(
                    node.id,
                    format!("rotation gate at node {} requires exactly one finite parameter", node.id),
                ));
            }
        } else if !meta.parameters.is_empty() {
            diagnostics.push(Diagnostic::warning(
                node.id,
                format!("non-rotation gate at node {} carries unused parameters", node.id),
            ));
        }

        if meta.has_duplicate_qubits() {
            diagnostics.push(Diagnostic::error(
                node.id,
                format!("gate at node {} acts on a qubit index more than once", node.id),
            ));
        }

        if node.tenancy != Tenancy::QpuQuantum {
            diagnostics.push(Diagnostic::warning(
                node.id,
                format!("quantum gate at node {} is not on QPU-quantum tenancy", node.id),
            ));
        }

        if meta.qubits.iter().any(|&q| q > QUBIT_INDEX_WARNING_THRESHOLD) {
            diagnostics.push(Diagnostic::warning(
                node.id,
                format!("quantum gate at node {} references an unusually high qubit index", node.id),
            ));
        }
    }
    diagnostics
}

pub fn check_quantum_measurement(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for node in graph.iter() {
        if node.op != Opcode::QuantumMeasure {
            continue;
        }
        match node.quantum_metadata.as_ref() {
            Some(meta) if meta.qubits.is_empty() => {
                diagnostics.push(Diagnostic::error(
                    node.id,
                    format!("measurement at node {} has no qubits", node.id),
                ));
            }
            None => {
                diagnostics.push(Diagnostic::error(
                    node.id,
                    format!("measurement at node {} is missing quantum_metadata", node.id),
                ));
            }
            Some(_) => {}
        }
        if node.tenancy != Tenancy::QpuQuantum {
            diagnostics.push(Diagnostic::warning(
                node.id,
                format!("measurement at node {} is not on QPU-quantum tenancy", node.id),
            ));
        }
    }
    diagnostics
}
