//! Defer-stack emission rules.

use crate::context::{LoweringContext, ScopeKind};

/// Registers `defer <call>` in the current scope's LIFO list.
pub fn register_defer(ctx: &mut LoweringContext, runtime_name: impl Into<String>, captured_args: Vec<qtjir_core::NodeId>) {
    ctx.scopes
        .last_mut()
        .expect("a scope must be active before deferring")
        .defers
        .push(crate::context::DeferredCall {
            runtime_name: runtime_name.into(),
            captured_args,
        });
}

/// Emits one scope's deferred actions in LIFO order as `Call` nodes,
/// without popping the scope -- callers decide when to pop.
pub fn emit_defers_for_scope(ctx: &mut LoweringContext, scope_index: usize) {
    let defers = ctx.scopes[scope_index].defers.clone();
    for deferred in defers.iter().rev() {
        ctx.builder.create_call(deferred.runtime_name.clone(), &deferred.captured_args);
    }
}

/// Emits every scope's defers from innermost to function root, without
/// popping any layer -- the `return`/`fail` emission rule.
pub fn emit_all_defers_to_function_root(ctx: &mut LoweringContext) {
    let indices: Vec<usize> = (0..ctx.scopes.len()).rev().collect();
    for index in indices {
        emit_defers_for_scope(ctx, index);
    }
}

/// Emits defers for every scope above (but not including) the nearest
/// enclosing `Loop` -- the break/continue rule.
pub fn emit_defers_above_nearest_loop(ctx: &mut LoweringContext) {
    for index in ctx.scopes_above_nearest_loop() {
        emit_defers_for_scope(ctx, index);
    }
}

/// Pops the current scope, emitting its defers first.
pub fn pop_scope_with_defers(ctx: &mut LoweringContext) {
    let top = ctx.scopes.len() - 1;
    emit_defers_for_scope(ctx, top);
    ctx.pop_scope();
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtjir_core::{NodeId, Opcode};

    #[test]
    fn defers_run_in_lifo_order() {
        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        let a = ctx.builder.create_constant_int(1);
        register_defer(&mut ctx, "close_a", vec![a]);
        let b = ctx.builder.create_constant_int(2);
        register_defer(&mut ctx, "close_b", vec![b]);

        let before = ctx.builder.node_count();
        pop_scope_with_defers(&mut ctx);
        let graph = ctx.builder.graph();

        let calls: Vec<_> = graph
            .iter()
            .skip(before)
            .filter(|n| n.op == Opcode::Call)
            .map(|n| n.data.as_str().unwrap().to_string())
            .collect();
        assert_eq!(calls, vec!["close_b", "close_a"]);
    }

    #[test]
    fn defers_above_loop_skip_the_loop_scope_itself() {
        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        ctx.push_scope(ScopeKind::Loop);
        register_defer(&mut ctx, "loop_level", vec![]);
        ctx.push_scope(ScopeKind::Block);
        register_defer(&mut ctx, "block_level", vec![]);

        let before = ctx.builder.node_count();
        emit_defers_above_nearest_loop(&mut ctx);
        let graph = ctx.builder.graph();
        let calls: Vec<_> = graph
            .iter()
            .skip(before)
            .filter(|n| n.op == Opcode::Call)
            .map(|n| n.data.as_str().unwrap().to_string())
            .collect();
        assert_eq!(calls, vec!["block_level"]);
        let _ = NodeId(0);
    }
}
