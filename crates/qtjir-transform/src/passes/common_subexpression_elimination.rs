//! Rewires duplicate pure computations onto their first occurrence.
//! `Constant`, `Call`, and `Return` are never deduplicated; commutativity
//! is not exploited.

use std::collections::HashMap;

use qtjir_core::{NodeData, NodeId, Opcode};
use qtjir_core::Graph;

use crate::pass::Pass;

pub struct CommonSubexpressionElimination;

fn is_excluded(op: &Opcode) -> bool {
    matches!(op, Opcode::Constant | Opcode::Call | Opcode::Return)
}

impl Pass for CommonSubexpressionElimination {
    fn name(&self) -> &str {
        "common_subexpression_elimination"
    }

    fn run(&self, graph: &mut Graph) -> bool {
        let mut canonical: Vec<(NodeId, Opcode, NodeData, Vec<NodeId>)> = Vec::new();
        let mut replace: HashMap<NodeId, NodeId> = HashMap::new();

        for node in graph.iter() {
            if is_excluded(&node.op) {
                continue;
            }
            let resolved_inputs: Vec<NodeId> = node
                .inputs
                .iter()
                .map(|i| *replace.get(i).unwrap_or(i))
                .collect();

            let duplicate_of = canonical
                .iter()
                .find(|(_, op, data, inputs)| *op == node.op && *data == node.data && *inputs == resolved_inputs)
                .map(|(canon_id, ..)| *canon_id);

            match duplicate_of {
                Some(canon_id) => {
                    replace.insert(node.id, canon_id);
                }
                None => {
                    canonical.push((node.id, node.op.clone(), node.data.clone(), resolved_inputs));
                }
            }
        }

        if replace.is_empty() {
            return false;
        }

        let mut changed = false;
        for node in graph.iter_mut() {
            for input in node.inputs.iter_mut() {
                if let Some(&target) = replace.get(input) {
                    if *input != target {
                        *input = target;
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::GraphBuilder;

    #[test]
    fn rewires_duplicate_addition_to_first_occurrence() {
        let mut b = GraphBuilder::new("f");
        let x = b.create_constant_int(1);
        let y = b.create_constant_int(2);
        let add1 = b.build_binary(Opcode::Add, x, y);
        let add2 = b.build_binary(Opcode::Add, x, y);
        let user = b.build_binary(Opcode::Mul, add2, add2);
        let mut g = b.finish();

        let changed = CommonSubexpressionElimination.run(&mut g);
        assert!(changed);
        assert_eq!(&g.node(user).unwrap().inputs[..], &[add1, add1]);
    }

    #[test]
    fn never_deduplicates_calls() {
        let mut b = GraphBuilder::new("f");
        let arg = b.create_constant_int(1);
        let call1 = b.create_call("rand", &[arg]);
        let call2 = b.create_call("rand", &[arg]);
        let user = b.build_binary(Opcode::Add, call1, call2);
        let mut g = b.finish();

        CommonSubexpressionElimination.run(&mut g);
        assert_eq!(&g.node(user).unwrap().inputs[..], &[call1, call2]);
    }

    #[test]
    fn does_not_exploit_commutativity() {
        let mut b = GraphBuilder::new("f");
        let x = b.create_constant_int(1);
        let y = b.create_constant_int(2);
        let forward = b.build_binary(Opcode::Add, x, y);
        let reversed = b.build_binary(Opcode::Add, y, x);
        let user = b.build_binary(Opcode::Mul, reversed, reversed);
        let mut g = b.finish();

        CommonSubexpressionElimination.run(&mut g);
        assert_eq!(&g.node(user).unwrap().inputs[..], &[reversed, reversed]);
        let _ = forward;
    }

    #[test]
    fn no_duplicates_reports_no_change() {
        let mut b = GraphBuilder::new("f");
        let x = b.create_constant_int(1);
        let y = b.create_constant_int(2);
        b.build_binary(Opcode::Add, x, y);
        let mut g = b.finish();
        assert!(!CommonSubexpressionElimination.run(&mut g));
    }
}
