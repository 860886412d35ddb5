//! Folds binary-arithmetic nodes whose operands are both integer constants.

use qtjir_core::{Graph, NodeData, Opcode};

use crate::pass::Pass;

pub struct ConstantFolding;

fn fold(op: &Opcode, lhs: i64, rhs: i64) -> Option<i64> {
    match op {
        Opcode::Add => Some(lhs.wrapping_add(rhs)),
        Opcode::Sub => Some(lhs.wrapping_sub(rhs)),
        Opcode::Mul => Some(lhs.wrapping_mul(rhs)),
        Opcode::Div => {
            if rhs == 0 {
                None
            } else {
                Some(lhs.wrapping_div(rhs))
            }
        }
        Opcode::Mod => {
            if rhs == 0 {
                None
            } else {
                Some(lhs.wrapping_rem(rhs))
            }
        }
        Opcode::Pow => {
            if rhs < 0 {
                None
            } else {
                Some(lhs.wrapping_pow(rhs as u32))
            }
        }
        _ => None,
    }
}

impl Pass for ConstantFolding {
    fn name(&self) -> &str {
        "constant_folding"
    }

    fn run(&self, graph: &mut Graph) -> bool {
        let mut changed = false;
        let candidates: Vec<_> = graph
            .iter()
            .filter(|n| n.op.is_binary_arith() && n.inputs.len() == 2)
            .map(|n| (n.id, n.op.clone(), n.inputs[0], n.inputs[1]))
            .collect();

        for (id, op, lhs_id, rhs_id) in candidates {
            let lhs = graph.node(lhs_id).and_then(|n| {
                (n.op == Opcode::Constant).then(|| n.data.as_integer()).flatten()
            });
            let rhs = graph.node(rhs_id).and_then(|n| {
                (n.op == Opcode::Constant).then(|| n.data.as_integer()).flatten()
            });

            let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
                continue;
            };

            let Some(folded) = fold(&op, lhs, rhs) else {
                continue;
            };

            if let Some(node) = graph.node_mut(id) {
                node.op = Opcode::Constant;
                node.data = NodeData::Integer(folded);
                node.inputs.clear();
                changed = true;
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
    fn folds_integer_addition() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(2);
        let c = b.create_constant_int(3);
        let add = b.build_binary(Opcode::Add, a, c);
        let mut g = b.finish();

        let changed = ConstantFolding.run(&mut g);
        assert!(changed);
        let node = g.node(add).unwrap();
        assert_eq!(node.op, Opcode::Constant);
        assert_eq!(node.data.as_integer(), Some(5));
        assert!(node.inputs.is_empty());
    }

    #[test]
    fn skips_division_by_zero() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(10);
        let c = b.create_constant_int(0);
        let div = b.build_binary(Opcode::Div, a, c);
        let mut g = b.finish();

        let changed = ConstantFolding.run(&mut g);
        assert!(!changed);
        assert_eq!(g.node(div).unwrap().op, Opcode::Div);
    }

    #[test]
    fn ignores_non_constant_operands() {
        let mut b = GraphBuilder::new("f");
        let arg = b.build_argument(0);
        let c = b.create_constant_int(1);
        let add = b.build_binary(Opcode::Add, arg, c);
        let mut g = b.finish();

        assert!(!ConstantFolding.run(&mut g));
        assert_eq!(g.node(add).unwrap().op, Opcode::Add);
    }

    #[test]
    fn reaches_fixed_point_after_one_pass() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(2);
        let c = b.create_constant_int(3);
        let add = b.build_binary(Opcode::Add, a, c);
        let mut g = b.finish();

        assert!(ConstantFolding.run(&mut g));
        assert!(!ConstantFolding.run(&mut g));
        let _ = add;
    }
}
