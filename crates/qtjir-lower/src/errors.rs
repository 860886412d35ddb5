//! `catch`/`try` lowering.

use qtjir_core::{NodeId, Opcode};

use crate::ast::{AstId, AstNodeKind, AstSnapshot};
use crate::context::LoweringContext;
use crate::error::LowerError;
use crate::scopes::emit_all_defers_to_function_root;

/// `expr catch |err| { block }`. Children: `[expr, handler_block]`.
pub fn lower_catch(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<NodeId, LowerError> {
    let children = ast.get_children(ast_id);
    let &expr_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;
    let &handler_ast = children.get(1).ok_or(LowerError::MissingOperand(ast_id))?;

    let error_union = crate::expr::lower_expression(ctx, ast, expr_ast)?;
    ctx.error_union_values.insert(error_union);
    let is_error = ctx.builder.build_error_union_is_error(error_union);

    let branch = ctx.builder.build_branch_placeholder(is_error);
    let err_label = ctx.builder.build_label();
    ctx.push_scope(crate::context::ScopeKind::Block);
    let err_value = lower_statement_block(ctx, ast, handler_ast)?;
    let err_terminated = ctx.last_node_is_terminator();
    let err_jump = if err_terminated { None } else { Some(ctx.builder.build_jump_placeholder()) };
    ctx.pop_scope();

    let ok_label = ctx.builder.build_label();
    let ok_value = ctx.builder.build_error_union_unwrap(error_union);
    let ok_terminated = ctx.last_node_is_terminator();
    let ok_jump = if ok_terminated { None } else { Some(ctx.builder.build_jump_placeholder()) };

    ctx.builder.patch_input(branch, 1, err_label);
    ctx.builder.patch_input(branch, 2, ok_label);

    match (err_jump, ok_jump) {
        (None, None) => Ok(ok_value),
        (Some(ej), None) => {
            let merge = ctx.builder.build_label();
            ctx.builder.patch_input(ej, 0, merge);
            Ok(ok_value)
        }
        (None, Some(oj)) => {
            let merge = ctx.builder.build_label();
            ctx.builder.patch_input(oj, 0, merge);
            Ok(err_value.unwrap_or(ok_value))
        }
        (Some(ej), Some(oj)) => {
            let merge = ctx.builder.build_label();
            ctx.builder.patch_input(ej, 0, merge);
            ctx.builder.patch_input(oj, 0, merge);
            let err_default = err_value.unwrap_or_else(|| ctx.builder.create_constant_int(0));
            Ok(ctx.builder.build_phi(&[err_default, ok_value]))
        }
    }
}

/// `expr?`. Propagates the error union outward on failure.
pub fn lower_try(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, ast_id: AstId) -> Result<NodeId, LowerError> {
    let children = ast.get_children(ast_id);
    let &expr_ast = children.first().ok_or(LowerError::MissingOperand(ast_id))?;

    let error_union = crate::expr::lower_expression(ctx, ast, expr_ast)?;
    ctx.error_union_values.insert(error_union);
    let is_error = ctx.builder.build_error_union_is_error(error_union);

    let branch = ctx.builder.build_branch_placeholder(is_error);
    let propagate_label = ctx.builder.build_label();
    emit_all_defers_to_function_root(ctx);
    ctx.builder.create_return(Some(error_union));

    let ok_label = ctx.builder.build_label();
    let unwrapped = ctx.builder.build_error_union_unwrap(error_union);

    ctx.builder.patch_input(branch, 1, propagate_label);
    ctx.builder.patch_input(branch, 2, ok_label);

    Ok(unwrapped)
}

/// Lowers a `block_stmt`'s children as statements, returning the value of
/// a trailing `expr_stmt` if the block ends with one (used by `catch`
/// handler blocks, which may produce a value for the merge `Phi`).
fn lower_statement_block(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, block_ast: AstId) -> Result<Option<NodeId>, LowerError> {
    let children = ast.get_children(block_ast);
    let mut last_expr_value = None;
    for &child in &children {
        let node = ast.get_node(child).ok_or(LowerError::InvalidNode(child))?;
        if node.kind == AstNodeKind::ExprStmt {
            let &inner = ast.get_children(child).first().ok_or(LowerError::MissingOperand(child))?;
            last_expr_value = Some(crate::expr::lower_expression(ctx, ast, inner)?);
        } else {
            crate::stmt::lower_statement(ctx, ast, child)?;
            last_expr_value = None;
        }
    }
    Ok(last_expr_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::fixtures::FakeAst;
    use crate::ast::TokenKind;
    use crate::context::ScopeKind;

    #[test]
    fn try_emits_propagate_and_ok_labels() {
        let mut ast = FakeAst::new();
        let text_id = ast.intern("eu");
        let tok = ast.push_token(TokenKind::Other, (0, 2), Some(text_id));
        let ident = ast.push_node(AstNodeKind::Identifier, tok, tok, vec![]);
        let try_expr = ast.push_node(AstNodeKind::TryExpr, tok, tok, vec![ident]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        let eu = ctx.builder.create_constant_int(0);
        ctx.bind("eu", eu);

        let result = lower_try(&mut ctx, &ast, try_expr).unwrap();
        assert_eq!(ctx.builder.graph().node(result).unwrap().op, Opcode::ErrorUnionUnwrap);
    }

    #[test]
    fn catch_with_both_arms_falling_through_produces_a_phi() {
        let mut ast = FakeAst::new();
        let text_id = ast.intern("eu");
        let tok = ast.push_token(TokenKind::Other, (0, 2), Some(text_id));
        let ident = ast.push_node(AstNodeKind::Identifier, tok, tok, vec![]);
        let handler_block = ast.push_node(AstNodeKind::BlockStmt, tok, tok, vec![]);
        let catch_expr = ast.push_node(AstNodeKind::CatchExpr, tok, tok, vec![ident, handler_block]);

        let mut ctx = LoweringContext::new(0, "f");
        ctx.push_scope(ScopeKind::Function);
        let eu = ctx.builder.create_constant_int(0);
        ctx.bind("eu", eu);

        let result = lower_catch(&mut ctx, &ast, catch_expr).unwrap();
        assert_eq!(ctx.builder.graph().node(result).unwrap().op, Opcode::Phi);
    }
}
