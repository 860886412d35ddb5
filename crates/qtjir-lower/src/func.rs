//! Function and test lowering entry points, plus the
//! epilogue fallback.

use qtjir_core::{Capture, Graph, Opcode, Parameter, ERROR_UNION_RETURN_TYPE};

use crate::ast::{AstId, AstNodeKind, AstSnapshot};
use crate::context::{LoweringContext, ScopeKind};
use crate::error::LowerError;
use crate::scopes::pop_scope_with_defers;
use crate::stmt::lower_block;

fn token_text<'a>(ast: &'a dyn AstSnapshot, token_id: u32) -> Option<&'a str> {
    let token = ast.get_token(token_id)?;
    ast.intern_lookup(token.interned_string_id?)
}

fn identifier_text<'a>(ast: &'a dyn AstSnapshot, ast_id: AstId) -> Option<&'a str> {
    let node = ast.get_node(ast_id)?;
    token_text(ast, node.first_token)
}

/// Discovers `{name, type_name}` from a `parameter` node's children, if
/// present; defaults the type to `"i32"` when absent.
fn read_parameter(ast: &dyn AstSnapshot, param_ast: AstId) -> Option<Parameter> {
    let node = ast.get_node(param_ast)?;
    let name = token_text(ast, node.first_token)?.to_string();
    let children = ast.get_children(param_ast);
    let type_name = children
        .first()
        .and_then(|&t| ast.get_node(t))
        .and_then(|n| token_text(ast, n.first_token))
        .unwrap_or("i32")
        .to_string();
    Some(Parameter { name, type_name })
}

/// Lowers a `func_decl` into a complete `Graph`.
pub fn lower_function(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, func_ast: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(func_ast);
    let &name_ast = children.first().ok_or(LowerError::MissingOperand(func_ast))?;
    let name = identifier_text(ast, name_ast).ok_or(LowerError::InvalidNode(name_ast))?.to_string();

    let parameters: Vec<Parameter> = children
        .iter()
        .skip(1)
        .filter(|&&child| ast.get_node(child).map(|n| n.kind == AstNodeKind::Parameter).unwrap_or(false))
        .filter_map(|&child| read_parameter(ast, child))
        .collect();

    let return_type_node = children
        .iter()
        .find(|&&child| ast.get_node(child).map(|n| n.kind == AstNodeKind::ErrorUnionType).unwrap_or(false));
    let is_error_union_return = return_type_node.is_some();

    let body_ast = children
        .iter()
        .rev()
        .find(|&&child| ast.get_node(child).map(|n| n.kind == AstNodeKind::BlockStmt).unwrap_or(false))
        .copied()
        .ok_or(LowerError::MissingOperand(func_ast))?;

    ctx.push_scope(ScopeKind::Function);

    for (index, parameter) in parameters.iter().enumerate() {
        let argument = ctx.builder.build_argument(index as u32);
        let alloca = ctx.builder.build_alloca(parameter.name.clone());
        ctx.builder.build_store(argument, alloca);
        ctx.bind(parameter.name.clone(), alloca);
    }

    ctx.push_scope(ScopeKind::Block);

    let body_children = ast.get_children(body_ast);
    let (init_stmts, trailing_expr_stmt) = match body_children.split_last() {
        Some((&last, rest)) if ast.get_node(last).map(|n| n.kind == AstNodeKind::ExprStmt).unwrap_or(false) => (rest, Some(last)),
        _ => (&body_children[..], None),
    };

    for &stmt_ast in init_stmts {
        crate::stmt::lower_statement(ctx, ast, stmt_ast)?;
    }

    if let Some(expr_stmt) = trailing_expr_stmt {
        let &inner = ast.get_children(expr_stmt).first().ok_or(LowerError::MissingOperand(expr_stmt))?;
        let value = crate::expr::lower_expression(ctx, ast, inner)?;
        if is_error_union_return {
            let wrapped = ctx.builder.build_error_union_construct(value);
            pop_scope_with_defers(ctx);
            ctx.builder.create_return(Some(wrapped));
            pop_scope_with_defers(ctx);
            finish_graph(ctx, name, parameters, is_error_union_return);
            return Ok(());
        }
    }

    pop_scope_with_defers(ctx);

    if !ctx.last_node_is_terminator() {
        emit_epilogue(ctx, is_error_union_return);
    }

    pop_scope_with_defers(ctx);
    finish_graph(ctx, name, parameters, is_error_union_return);
    Ok(())
}

/// Tests lower identically to functions except the graph name carries a
/// `"test:"` prefix and always ends `Return 0` regardless of body shape
///.
pub fn lower_test(ctx: &mut LoweringContext, ast: &dyn AstSnapshot, test_ast: AstId) -> Result<(), LowerError> {
    let children = ast.get_children(test_ast);
    let &name_ast = children.first().ok_or(LowerError::MissingOperand(test_ast))?;
    let literal_name = identifier_text(ast, name_ast).unwrap_or("unnamed").to_string();

    let body_ast = children
        .iter()
        .rev()
        .find(|&&child| ast.get_node(child).map(|n| n.kind == AstNodeKind::BlockStmt).unwrap_or(false))
        .copied()
        .ok_or(LowerError::MissingOperand(test_ast))?;

    ctx.push_scope(ScopeKind::Function);
    ctx.push_scope(ScopeKind::Block);
    lower_block(ctx, ast, body_ast)?;
    pop_scope_with_defers(ctx);

    if !ctx.last_node_is_terminator() {
        let zero = ctx.builder.create_constant_int(0);
        ctx.builder.create_return(Some(zero));
    }

    pop_scope_with_defers(ctx);
    finish_graph(ctx, format!("test:{literal_name}"), Vec::new(), false);
    Ok(())
}

/// Epilogue fallback: functions that fall off the end without
/// an explicit `return` get `Return 0` (or its error-union wrapping).
fn emit_epilogue(ctx: &mut LoweringContext, is_error_union_return: bool) {
    let zero = ctx.builder.create_constant_int(0);
    let value = if is_error_union_return {
        ctx.builder.build_error_union_construct(zero)
    } else {
        zero
    };
    ctx.builder.create_return(Some(value));
}

fn finish_graph(ctx: &mut LoweringContext, name: impl Into<String>, parameters: Vec<Parameter>, is_error_union_return: bool) {
    let mut graph = std::mem::replace(&mut ctx.builder, qtjir_core::GraphBuilder::new("")).finish();
    graph.function_name = name.into();
    graph.parameters = parameters;
    graph.captures = Vec::<Capture>::new();
    if is_error_union_return {
        graph.return_type = ERROR_UNION_RETURN_TYPE.to_string();
    }
    ctx.finished_graphs.push(graph);
}

pub fn graph_has_terminal_return(graph: &Graph) -> bool {
    graph.iter().last().map(|n| n.op == Opcode::Return).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::fixtures::FakeAst;
    use crate::ast::TokenKind;

    fn simple_function(ast: &mut FakeAst) -> AstId {
        let name_id = ast.intern("main");
        let name_tok = ast.push_token(TokenKind::Other, (0, 4), Some(name_id));
        let name_node = ast.push_node(AstNodeKind::Identifier, name_tok, name_tok, vec![]);

        let lit_id = ast.intern("0");
        let lit_tok = ast.push_token(TokenKind::Other, (0, 1), Some(lit_id));
        let lit = ast.push_node(AstNodeKind::IntegerLiteral, lit_tok, lit_tok, vec![]);
        let return_stmt = ast.push_node(AstNodeKind::ReturnStmt, lit_tok, lit_tok, vec![lit]);
        let body = ast.push_node(AstNodeKind::BlockStmt, name_tok, lit_tok, vec![return_stmt]);

        ast.push_node(AstNodeKind::FuncDecl, name_tok, lit_tok, vec![name_node, body])
    }

    #[test]
    fn lowers_a_function_with_explicit_return() {
        let mut ast = FakeAst::new();
        let func = simple_function(&mut ast);

        let mut ctx = LoweringContext::new(0, "placeholder");
        lower_function(&mut ctx, &ast, func).unwrap();

        assert_eq!(ctx.finished_graphs.len(), 1);
        assert_eq!(ctx.finished_graphs[0].function_name, "main");
        assert!(graph_has_terminal_return(&ctx.finished_graphs[0]));
    }

    #[test]
    fn falls_through_to_epilogue_when_body_has_no_return() {
        let mut ast = FakeAst::new();
        let name_id = ast.intern("f");
        let name_tok = ast.push_token(TokenKind::Other, (0, 1), Some(name_id));
        let name_node = ast.push_node(AstNodeKind::Identifier, name_tok, name_tok, vec![]);
        let body = ast.push_node(AstNodeKind::BlockStmt, name_tok, name_tok, vec![]);
        let func = ast.push_node(AstNodeKind::FuncDecl, name_tok, name_tok, vec![name_node, body]);

        let mut ctx = LoweringContext::new(0, "placeholder");
        lower_function(&mut ctx, &ast, func).unwrap();

        assert!(graph_has_terminal_return(&ctx.finished_graphs[0]));
    }

    #[test]
    fn test_decl_always_ends_with_return_zero() {
        let mut ast = FakeAst::new();
        let name_id = ast.intern("adds_correctly");
        let name_tok = ast.push_token(TokenKind::Other, (0, 1), Some(name_id));
        let name_node = ast.push_node(AstNodeKind::Identifier, name_tok, name_tok, vec![]);
        let body = ast.push_node(AstNodeKind::BlockStmt, name_tok, name_tok, vec![]);
        let test_decl = ast.push_node(AstNodeKind::TestDecl, name_tok, name_tok, vec![name_node, body]);

        let mut ctx = LoweringContext::new(0, "placeholder");
        lower_test(&mut ctx, &ast, test_decl).unwrap();

        let graph = &ctx.finished_graphs[0];
        assert_eq!(graph.function_name, "test:adds_correctly");
        let last = graph.iter().last().unwrap();
        assert_eq!(last.op, Opcode::Return);
    }
}
