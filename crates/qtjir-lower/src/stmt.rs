//! Statement and control-flow lowering.

use qtjir_core::{NodeId, Opcode};

use crate::ast::{AstId, AstNodeKind, AstSnapshot};
use crate::context::{LoweringContext, PendingPatch, ScopeKind};
use crate::error::LowerError;
use crate::expr::{lower_expression, lower_lvalue};
use crate::scopes::{emit_all_defers_to_function_root, emit_defers_above_nearest_loop, pop_scope_with_defers, register_defer};

fn token_text<'a>(ast: &'a dyn AstSnapshot, token_id: u32) -> Option<&'a str> {
    let token = ast.get_token(token_id)?;
    ast.intern_lookup(token.interned_string_id?)
}

/// Lowers every child of a `block_stmt` in order.
pub fn lower_block(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, block_ast: AstId) -> Result<(), LowerError> {
    for child in ast.get_children(block_ast) {
        lower_statement(ctx, ast, child)?;
    }
    Ok(())
}

/// Dispatches a single statement node.
pub fn lower_statement(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let node = ast.get_node(ast_id).ok_or(LowerError::InvalidNode(ast_id))?;

    match node.kind {
        AstNodeKind::ExprStmt => {
            let &inner = ast.get_children(ast_id).first().ok_or(LowerError::MissingOperand(ast_id))?;
            lower_expression(ctx, ast, inner)?;
        }
        AstNodeKind::BlockStmt => lower_block(ctx, ast, ast_id)?,
        AstNodeKind::ReturnStmt => lower_return(ctx, ast, ast_id)?,
        AstNodeKind::DeferStmt => lower_defer(ctx, ast, ast_id)?,
        AstNodeKind::BreakStmt => lower_break(ctx, ast_id)?,
        AstNodeKind::ContinueStmt => lower_continue(ctx, ast_id)?,
        AstNodeKind::LetStmt => lower_let(ctx, ast, ast_id, false)?,
        AstNodeKind::VarStmt => lower_let(ctx, ast, ast_id, true)?,
        AstNodeKind::IfStmt => lower_if(ctx, ast, ast_id)?,
        AstNodeKind::WhileStmt => lower_while(ctx, ast, ast_id)?,
        AstNodeKind::ForStmt => lower_for(ctx, ast, ast_id)?,
        AstNodeKind::MatchStmt => lower_match(ctx, ast, ast_id)?,
        AstNodeKind::PostfixWhen => lower_postfix_when(ctx, ast, ast_id)?,
        AstNodeKind::FailStmt => lower_fail(ctx, ast, ast_id)?,
        _ => return Err(LowerError::InvalidNode(ast_id)),
    }
    Ok(())
}

fn lower_return(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(ast_id);
    let value = match children.first() {
        Some(&expr_ast) => Some(lower_expression(ctx, ast, expr_ast)?),
        None => None,
    };
    emit_all_defers_to_function_root(ctx);
    ctx.builder.create_return(value);
    Ok(())
}

fn lower_defer(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let &call_ast = ast.get_children(ast_id).first().ok_or(LowerError::MissingOperand(ast_id))?;
    let call_node = ast.get_node(call_ast).ok_or(LowerError::InvalidNode(call_ast))?;
    if call_node.kind != AstNodeKind::CallExpr {
        return Err(LowerError::InvalidCall("defer target must be a call expression".to_string()));
    }
    let call_children = ast.get_children(call_ast);
    let &callee_ast = call_children.first().ok_or(LowerError::MissingOperand(call_ast))?;
    let runtime_name = crate::expr::resolve_callee_path(ast, callee_ast)?;
    let mut args = Vec::new();
    for &arg_ast in &call_children[1..] {
        args.push(lower_expression(ctx, ast, arg_ast)?);
    }
    register_defer(ctx, runtime_name, args);
    Ok(())
}

fn lower_break(ctx: &mut LoweringContext, ast_id: AstId) -> Result<(), LowerError> {
    emit_defers_above_nearest_loop(ctx);
    let jump = ctx.builder.build_jump_placeholder();
    let _ = ast_id;
    ctx.register_pending_break(PendingPatch { node: jump, input_index: 0 });
    Ok(())
}

fn lower_continue(ctx: &mut LoweringContext, ast_id: AstId) -> Result<(), LowerError> {
    emit_defers_above_nearest_loop(ctx);
    let jump = ctx.builder.build_jump_placeholder();
    let _ = ast_id;
    ctx.register_pending_continue(PendingPatch { node: jump, input_index: 0 });
    Ok(())
}

fn lower_fail(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let &expr_ast = ast.get_children(ast_id).first().ok_or(LowerError::MissingOperand(ast_id))?;
    let error_value = lower_expression(ctx, ast, expr_ast)?;
    let error_union = ctx.builder.build_error_fail_construct(error_value);
    emit_all_defers_to_function_root(ctx);
    ctx.builder.create_return(Some(error_union));
    Ok(())
}

fn parameter_name<'a>(ast: &'a dyn AstSnapshot, decl_ast: AstId) -> Option<&'a str> {
    let node = ast.get_node(decl_ast)?;
    token_text(ast, node.first_token)
}

/// `let`/`var`. Children: `[name_node, init_expr]`; an
/// optional trailing type-annotation child marks an optional-typed
/// binding.
fn lower_let(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId, is_var: bool) -> Result<(), LowerError> {
    let children = ast.get_children(ast_id);
    let &name_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let name = parameter_name(ast, name_ast).ok_or(LowerError::InvalidNode(name_ast))?.to_string();

    let is_optional = children
        .get(2)
        .and_then(|&t| ast.get_node(t))
        .map(|n| n.kind == AstNodeKind::OptionalType)
        .unwrap_or(false);

    let raw_value = match children.get(1) {
        Some(&init_ast) => lower_expression(ctx, ast, init_ast)?,
        None => ctx.builder.create_constant_int(0),
    };

    let value = if is_optional {
        let is_null = ast.get_node(children[1])
            .map(|n| n.kind == AstNodeKind::NullLiteral)
            .unwrap_or(false);
        if is_null {
            let none = ctx.builder.build_optional_none();
            ctx.optional_values.insert(none);
            none
        } else {
            let some = ctx.builder.build_optional_some(raw_value);
            ctx.optional_values.insert(some);
            some
        }
    } else {
        raw_value
    };

    if is_var {
        let is_struct_init = children
            .get(1)
            .and_then(|&init_ast| ast.get_node(init_ast))
            .map(|n| n.kind == AstNodeKind::StructLiteral)
            .unwrap_or(false);

        let alloca = if is_struct_init {
            ctx.builder.build_struct_alloca(name.clone(), &[])
        } else {
            ctx.builder.build_alloca(name.clone())
        };
        ctx.builder.build_store(value, alloca);
        ctx.bind(name, alloca);
    } else {
        ctx.bind(name, value);
    }
    Ok(())
}

/// `if`.
fn lower_if(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(ast_id);
    let &cond_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let &then_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;
    let else_ast = children.get(2).copied();

    let cond = lower_expression(ctx, ast, cond_ast)?;
    let branch = ctx.builder.build_branch_placeholder(cond);

    let then_label = ctx.builder.build_label();
    ctx.push_scope(ScopeKind::Block);
    lower_statement(ctx, ast, then_ast)?;
    let then_terminated = ctx.last_node_is_terminator();
    let then_jump = if then_terminated { None } else { Some(ctx.builder.build_jump_placeholder()) };
    pop_scope_with_defers(ctx);

    let else_label = ctx.builder.build_label();
    let else_jump = match else_ast {
        Some(else_body) => {
            ctx.push_scope(ScopeKind::Block);
            lower_statement(ctx, ast, else_body)?;
            let else_terminated = ctx.last_node_is_terminator();
            let jump = if else_terminated { None } else { Some(ctx.builder.build_jump_placeholder()) };
            pop_scope_with_defers(ctx);
            jump
        }
        None => None,
    };

    ctx.builder.patch_input(branch, 1, then_label);
    ctx.builder.patch_input(branch, 2, else_label);

    if then_jump.is_some() || else_jump.is_some() || else_ast.is_none() {
        let merge_label = ctx.builder.build_label();
        if let Some(j) = then_jump {
            ctx.builder.patch_input(j, 0, merge_label);
        }
        if let Some(j) = else_jump {
            ctx.builder.patch_input(j, 0, merge_label);
        }
    }
    Ok(())
}

/// `while`.
fn lower_while(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(ast_id);
    let &cond_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let &body_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;

    let header_label = ctx.builder.build_label();
    let cond = lower_expression(ctx, ast, cond_ast)?;
    let branch = ctx.builder.build_branch_placeholder(cond);

    let body_label = ctx.builder.build_label();
    ctx.push_scope(ScopeKind::Loop);
    let depth = ctx.loop_depth - 1;
    lower_statement(ctx, ast, body_ast)?;
    if !ctx.last_node_is_terminator() {
        ctx.builder.build_jump(header_label);
    }
    pop_scope_with_defers(ctx);

    let exit_label = ctx.builder.build_label();
    ctx.builder.patch_input(branch, 1, body_label);
    ctx.builder.patch_input(branch, 2, exit_label);

    for patch in ctx.take_pending_breaks(depth) {
        ctx.apply_patch(patch, exit_label);
    }
    for patch in ctx.take_pending_continues(depth) {
        ctx.apply_patch(patch, header_label);
    }
    Ok(())
}

/// `for` over a range or slice. Detects shape by inspecting
/// the iterable child's AST kind.
fn lower_for(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(ast_id);
    let &var_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let &iterable_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;
    let &body_ast = children.get(2).ok_or(LowerError::MissingOperand(ast_id))?;

    let var_name = parameter_name(ast, var_ast).ok_or(LowerError::InvalidNode(var_ast))?.to_string();
    let iterable_node = ast.get_node(iterable_ast).ok_or(LowerError::InvalidNode(iterable_ast))?;

    match iterable_node.kind {
        AstNodeKind::RangeInclusiveExpr | AstNodeKind::RangeExclusiveExpr => {
            lower_for_range(ctx, ast, iterable_ast, var_name, body_ast)
        }
        _ => lower_for_slice(ctx, ast, iterable_ast, var_name, body_ast),
    }
}

fn lower_for_range(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, range_ast: AstId, var_name: String, body_ast: AstId) -> Result<(), LowerError> {
    let range_node = ast.get_node(range_ast).ok_or(LowerError::InvalidNode(range_ast))?;
    let inclusive = range_node.kind == AstNodeKind::RangeInclusiveExpr;
    let range_children = ast.get_children(range_ast);
    let &start_ast = range_children.first().ok_or(LowerError::MissingOperand(range_ast))?;
    let &end_ast = range_children.get(1).ok_or(LowerError::MissingOperand(range_ast))?;

    let start = lower_expression(ctx, ast, start_ast)?;
    let end = lower_expression(ctx, ast, end_ast)?;

    let header_label = ctx.builder.build_label();
    let phi = ctx.builder.build_phi(&[start]);
    let var_alloca = ctx.builder.build_alloca(var_name.clone());
    ctx.builder.build_store(phi, var_alloca);

    let cmp_op = if inclusive { Opcode::LessEqual } else { Opcode::Less };
    let cond = ctx.builder.build_binary(cmp_op, phi, end);
    let branch = ctx.builder.build_branch_placeholder(cond);

    let body_label = ctx.builder.build_label();
    ctx.push_scope(ScopeKind::Loop);
    let depth = ctx.loop_depth - 1;
    ctx.bind(var_name, var_alloca);
    lower_statement(ctx, ast, body_ast)?;
    pop_scope_with_defers(ctx);

    let latch_label = ctx.builder.build_label();
    let one = ctx.builder.create_constant_int(1);
    let incremented = ctx.builder.build_binary(Opcode::Add, phi, one);
    ctx.builder.add_input(phi, incremented);
    ctx.builder.build_jump(header_label);

    let exit_label = ctx.builder.build_label();
    ctx.builder.patch_input(branch, 1, body_label);
    ctx.builder.patch_input(branch, 2, exit_label);

    for patch in ctx.take_pending_breaks(depth) {
        ctx.apply_patch(patch, exit_label);
    }
    for patch in ctx.take_pending_continues(depth) {
        ctx.apply_patch(patch, latch_label);
    }
    Ok(())
}

fn lower_for_slice(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, slice_ast: AstId, var_name: String, body_ast: AstId) -> Result<(), LowerError> {
    let slice_value = lower_expression(ctx, ast, slice_ast)?;
    let len = ctx.builder.build_slice_len(slice_value);
    let zero = ctx.builder.create_constant_int(0);

    let header_label = ctx.builder.build_label();
    let phi = ctx.builder.build_phi(&[zero]);
    let cond = ctx.builder.build_binary(Opcode::Less, phi, len);
    let branch = ctx.builder.build_branch_placeholder(cond);

    let body_label = ctx.builder.build_label();
    let element = ctx.builder.build_slice_index(slice_value, phi);
    let var_alloca = ctx.builder.build_alloca(var_name.clone());
    ctx.builder.build_store(element, var_alloca);

    ctx.push_scope(ScopeKind::Loop);
    let depth = ctx.loop_depth - 1;
    ctx.bind(var_name, var_alloca);
    lower_statement(ctx, ast, body_ast)?;
    pop_scope_with_defers(ctx);

    let latch_label = ctx.builder.build_label();
    let one = ctx.builder.create_constant_int(1);
    let incremented = ctx.builder.build_binary(Opcode::Add, phi, one);
    ctx.builder.add_input(phi, incremented);
    ctx.builder.build_jump(header_label);

    let exit_label = ctx.builder.build_label();
    ctx.builder.patch_input(branch, 1, body_label);
    ctx.builder.patch_input(branch, 2, exit_label);

    for patch in ctx.take_pending_breaks(depth) {
        ctx.apply_patch(patch, exit_label);
    }
    for patch in ctx.take_pending_continues(depth) {
        ctx.apply_patch(patch, latch_label);
    }
    Ok(())
}

/// `match`. Children alternate `[pattern, guard?, body]`
/// per arm; a trailing wildcard arm's pattern child is absent.
fn lower_match(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(ast_id);
    let &subject_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let subject = lower_expression(ctx, ast, subject_ast)?;

    let arm_asts = &children[1..];
    let mut end_jumps = Vec::new();
    let mut next_arm_branch: Option<NodeId> = None;

    for (index, &arm_ast) in arm_asts.iter().enumerate() {
        if let Some(branch) = next_arm_branch.take() {
            let label = ctx.builder.build_label();
            ctx.builder.patch_input(branch, 2, label);
        }

        let arm_children = ast.get_children(arm_ast);
        let &pattern_ast = arm_children.first().ok_or(LowerError::MissingOperand(arm_ast))?;
        let &body_ast = arm_children.last().ok_or(LowerError::MissingOperand(arm_ast))?;
        let is_wildcard = ast
            .get_node(pattern_ast)
            .map(|n| n.kind == AstNodeKind::Identifier && token_text(ast, n.first_token) == Some("_"))
            .unwrap_or(false);
        let is_last = index == arm_asts.len() - 1;

        if is_wildcard || is_last {
            ctx.push_scope(ScopeKind::Block);
            lower_statement(ctx, ast, body_ast)?;
            if !ctx.last_node_is_terminator() {
                end_jumps.push(ctx.builder.build_jump_placeholder());
            }
            pop_scope_with_defers(ctx);
        } else {
            let pattern_value = lower_expression(ctx, ast, pattern_ast)?;
            let cond = ctx.builder.build_binary(Opcode::Equal, subject, pattern_value);
            let guard_cond = if arm_children.len() > 2 {
                let &guard_ast = arm_children.get(1).unwrap();
                let guard = lower_expression(ctx, ast, guard_ast)?;
                ctx.builder.build_binary(Opcode::BitAnd, cond, guard)
            } else {
                cond
            };

            let branch = ctx.builder.build_branch_placeholder(guard_cond);
            let body_label = ctx.builder.build_label();
            ctx.builder.patch_input(branch, 1, body_label);

            ctx.push_scope(ScopeKind::Block);
            lower_statement(ctx, ast, body_ast)?;
            if !ctx.last_node_is_terminator() {
                end_jumps.push(ctx.builder.build_jump_placeholder());
            }
            pop_scope_with_defers(ctx);

            next_arm_branch = Some(branch);
        }
    }

    if let Some(branch) = next_arm_branch {
        let label = ctx.builder.build_label();
        ctx.builder.patch_input(branch, 2, label);
    }

    let end_label = ctx.builder.build_label();
    for jump in end_jumps {
        ctx.builder.patch_input(jump, 0, end_label);
    }
    Ok(())
}

/// `stmt when cond` desugars to `if cond { stmt }`.
fn lower_postfix_when(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(ast_id);
    let &stmt_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let &cond_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;

    let cond = lower_expression(ctx, ast, cond_ast)?;
    let branch = ctx.builder.build_branch_placeholder(cond);

    let body_label = ctx.builder.build_label();
    ctx.push_scope(ScopeKind::Block);
    lower_statement(ctx, ast, stmt_ast)?;
    let jump = if ctx.last_node_is_terminator() { None } else { Some(ctx.builder.build_jump_placeholder()) };
    pop_scope_with_defers(ctx);

    let merge_label = ctx.builder.build_label();
    ctx.builder.patch_input(branch, 1, body_label);
    ctx.builder.patch_input(branch, 2, merge_label);
    if let Some(j) = jump {
        ctx.builder.patch_input(j, 0, merge_label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::fixtures::FakeAst;
    use crate::ast::TokenKind;

    fn int_literal(ast: &mut FakeAst, text: &str) -> AstId {
        let id = ast.intern(text);
        let tok = ast.push_token(TokenKind::Other, (0, text.len() as u32), Some(id));
        ast.push_node(AstNodeKind::IntegerLiteral, tok, tok, vec![])
    }

    #[test]
    fn if_without_else_patches_merge_label_on_branch() {
        let mut ast = FakeAst::new();
        let cond = int_literal(&mut ast, "1");
        let then_body = ast.push_node(AstNodeKind::BlockStmt, 0, 0, vec![]);
        let if_stmt = ast.push_node(AstNodeKind::IfStmt, 0, 0, vec![cond, then_body]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        lower_statement(&mut ctx, &ast, if_stmt).unwrap();

        let graph = ctx.builder.graph();
        let branches: Vec<_> = graph.iter().filter(|n| n.op == Opcode::Branch).collect();
        assert_eq!(branches.len(), 1);
    }

    #[test]
    fn while_loop_patches_break_to_exit_label() {
        let mut ast = FakeAst::new();
        let cond = int_literal(&mut ast, "1");
        let break_stmt = ast.push_node(AstNodeKind::BreakStmt, 0, 0, vec![]);
        let body = ast.push_node(AstNodeKind::BlockStmt, 0, 0, vec![break_stmt]);
        let while_stmt = ast.push_node(AstNodeKind::WhileStmt, 0, 0, vec![cond, body]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        lower_statement(&mut ctx, &ast, while_stmt).unwrap();

        assert!(ctx.take_pending_breaks(0).is_empty());
    }

    #[test]
    fn let_binds_name_directly_without_an_alloca() {
        let mut ast = FakeAst::new();
        let name_id = ast.intern("x");
        let name_tok = ast.push_token(TokenKind::Other, (0, 1), Some(name_id));
        let name_node = ast.push_node(AstNodeKind::Identifier, name_tok, name_tok, vec![]);
        let init = int_literal(&mut ast, "5");
        let let_stmt = ast.push_node(AstNodeKind::LetStmt, 0, 0, vec![name_node, init]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        lower_statement(&mut ctx, &ast, let_stmt).unwrap();

        let bound = ctx.lookup("x").unwrap();
        assert_eq!(ctx.builder.graph().node(bound).unwrap().op, Opcode::Constant);
    }

    #[test]
    fn var_binds_name_to_an_alloca() {
        let mut ast = FakeAst::new();
        let name_id = ast.intern("y");
        let name_tok = ast.push_token(TokenKind::Other, (0, 1), Some(name_id));
        let name_node = ast.push_node(AstNodeKind::Identifier, name_tok, name_tok, vec![]);
        let init = int_literal(&mut ast, "5");
        let var_stmt = ast.push_node(AstNodeKind::VarStmt, 0, 0, vec![name_node, init]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        lower_statement(&mut ctx, &ast, var_stmt).unwrap();

        let bound = ctx.lookup("y").unwrap();
        assert!(matches!(ctx.builder.graph().node(bound).unwrap().op, Opcode::Alloca { .. }));
    }

    #[test]
    fn fail_emits_error_fail_construct_and_return() {
        let mut ast = FakeAst::new();
        let err_val = int_literal(&mut ast, "3");
        let fail_stmt = ast.push_node(AstNodeKind::FailStmt, 0, 0, vec![err_val]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        lower_statement(&mut ctx, &ast, fail_stmt).unwrap();

        let graph = ctx.builder.graph();
        assert!(graph.iter().any(|n| n.op == Opcode::ErrorFailConstruct));
        assert!(graph.iter().any(|n| n.op == Opcode::Return));
    }
}
