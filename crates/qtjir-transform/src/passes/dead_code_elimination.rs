//! Removes nodes unreachable from any `Return` or `Call`, renumbering the
//! survivors by rewriting every reference through an old-id -> new-id map,
//! rather than leaving holes in the ID space.

use std::collections::HashMap;

use qtjir_core::{Graph, NodeId, Opcode};

use crate::pass::Pass;

pub struct DeadCodeElimination;

fn mark_live(graph: &Graph) -> Vec<bool> {
    let mut live = vec![false; graph.node_count()];
    let mut stack: Vec<NodeId> = graph
        .iter()
        .filter(|n| matches!(n.op, Opcode::Return | Opcode::Call))
        .map(|n| n.id)
        .collect();

    while let Some(id) = stack.pop() {
        if live[id.index()] {
            continue;
        }
        live[id.index()] = true;
        if let Some(node) = graph.node(id) {
            for &input in &node.inputs {
                if !live[input.index()] {
                    stack.push(input);
                }
            }
        }
    }
    live
}

impl Pass for DeadCodeElimination {
    fn name(&self) -> &str {
        "dead_code_elimination"
    }

    fn run(&self, graph: &mut Graph) -> bool {
        let live = mark_live(graph);
        let original_count = graph.node_count();
        let live_count = live.iter().filter(|&&l| l).count();
        if live_count == original_count {
            return false;
        }

        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        let mut new_nodes = Vec::with_capacity(live_count);
        for node in graph.iter() {
            if live[node.id.index()] {
                let new_id = NodeId(new_nodes.len() as u32);
                remap.insert(node.id, new_id);
                new_nodes.push(node.clone());
            }
        }

        for node in &mut new_nodes {
            node.id = remap[&node.id];
            for input in node.inputs.iter_mut() {
                *input = remap[input];
            }
        }

        graph.replace_nodes(new_nodes);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::GraphBuilder;

    #[test]
    fn removes_unused_constant() {
        let mut b = GraphBuilder::new("f");
        let dead = b.create_constant_int(99);
        let kept = b.create_constant_int(1);
        b.create_return(Some(kept));
        let mut g = b.finish();
        let before = g.node_count();

        let changed = DeadCodeElimination.run(&mut g);
        assert!(changed);
        assert!(g.node_count() < before);
        let _ = dead;
    }

    #[test]
    fn renumbers_survivors_and_rewrites_references() {
        let mut b = GraphBuilder::new("f");
        b.create_constant_int(99); // dead, index 0
        let kept_a = b.create_constant_int(1); // index 1
        let kept_b = b.create_constant_int(2); // index 2
        let add = b.build_binary(Opcode::Add, kept_a, kept_b);
        b.create_return(Some(add));
        let mut g = b.finish();

        DeadCodeElimination.run(&mut g);

        for (i, n) in g.iter().enumerate() {
            assert_eq!(n.id.index(), i);
            for input in &n.inputs {
                assert!(input.index() < i, "input must precede its user after renumbering");
            }
        }
    }

    #[test]
    fn call_is_a_side_effect_root_even_unused() {
        let mut b = GraphBuilder::new("f");
        let arg = b.create_constant_int(1);
        b.create_call("print", &[arg]);
        b.create_return(None);
        let mut g = b.finish();
        let before = g.node_count();
        DeadCodeElimination.run(&mut g);
        assert_eq!(g.node_count(), before);
    }

    #[test]
    fn fully_live_graph_reports_no_change() {
        let mut b = GraphBuilder::new("f");
        let a = b.create_constant_int(1);
        b.create_return(Some(a));
        let mut g = b.finish();
        assert!(!DeadCodeElimination.run(&mut g));
    }
}
