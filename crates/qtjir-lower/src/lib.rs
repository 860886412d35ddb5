//! AST-to-QTJIR lowering.
//!
//! `lower_unit` runs the two-pass contract: ingest every foreign-module
//! `use` declaration first, then lower every `func_decl`/`test_decl` into
//! its own graph. Lowering itself fails fast (`LowerError` via `?`); a
//! malformed unit aborts the whole unit rather than producing a partial
//! result the caller might mistake for a complete one.

pub mod ast;
pub mod context;
pub mod error;
pub mod errors;
pub mod expr;
pub mod extern_ingest;
pub mod foreign;
pub mod func;
pub mod scopes;
pub mod stmt;

use std::path::Path;

use qtjir_core::{ExternRegistry, Graph};
use tracing::{debug, info};

pub use ast::{AstId, AstSnapshot, UnitId};
pub use context::LoweringContext;
pub use error::LowerError;
pub use foreign::{CLikeSignatureParser, ForeignModuleParser};

use ast::AstNodeKind;

/// The two products of lowering a compilation unit.
#[derive(Debug, Default)]
pub struct LowerResult {
    pub graphs: Vec<Graph>,
    pub extern_registry: ExternRegistry,
}

/// Lowers a full compilation unit using the built-in C-like foreign
/// signature parser.
pub fn lower_unit(ast: &dyn AstSnapshot, unit_id: UnitId, source_dir: Option<&Path>) -> Result<LowerResult, LowerError> {
    lower_unit_with_parser(ast, unit_id, source_dir, &CLikeSignatureParser)
}

/// Lowers a full compilation unit, taking an explicit foreign-module
/// parser so callers can plug in a real frontend's grammar.
pub fn lower_unit_with_parser(
    ast: &dyn AstSnapshot,
    unit_id: UnitId,
    source_dir: Option<&Path>,
    parser: &dyn ForeignModuleParser,
) -> Result<LowerResult, LowerError> {
    let unit = ast.get_unit(unit_id).ok_or(LowerError::UnitNotFound(unit_id))?;
    let top_level = ast.get_children(unit.root);

    let mut extern_registry = ExternRegistry::new();
    for &child in &top_level {
        if ast.get_node(child).map(|n| n.kind == AstNodeKind::UseZig).unwrap_or(false) {
            extern_ingest::ingest_use_node(ast, child, source_dir, parser, &mut extern_registry);
        }
    }
    debug!(extern_count = extern_registry.len(), "foreign-module ingestion complete");

    let mut graphs = Vec::new();
    for &child in &top_level {
        let Some(node) = ast.get_node(child) else { continue };
        match node.kind {
            AstNodeKind::FuncDecl => {
                let mut ctx = LoweringContext::new(unit_id, "").with_externs(extern_registry.clone());
                func::lower_function(&mut ctx, ast, child)?;
                info!(count = ctx.finished_graphs.len(), "lowered func_decl");
                graphs.extend(ctx.finished_graphs);
            }
            AstNodeKind::TestDecl => {
                let mut ctx = LoweringContext::new(unit_id, "").with_externs(extern_registry.clone());
                func::lower_test(&mut ctx, ast, child)?;
                info!(count = ctx.finished_graphs.len(), "lowered test_decl");
                graphs.extend(ctx.finished_graphs);
            }
            _ => {}
        }
    }

    Ok(LowerResult { graphs, extern_registry })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::fixtures::FakeAst;
    use ast::TokenKind;

    #[test]
    fn lowers_a_unit_with_one_function_and_one_test() {
        let mut fake = FakeAst::new();

        let fn_name_id = fake.intern("main");
        let fn_name_tok = fake.push_token(TokenKind::Other, (0, 4), Some(fn_name_id));
        let fn_name_node = fake.push_node(AstNodeKind::Identifier, fn_name_tok, fn_name_tok, vec![]);
        let fn_body = fake.push_node(AstNodeKind::BlockStmt, fn_name_tok, fn_name_tok, vec![]);
        let func_decl = fake.push_node(AstNodeKind::FuncDecl, fn_name_tok, fn_name_tok, vec![fn_name_node, fn_body]);

        let test_name_id = fake.intern("trivial");
        let test_name_tok = fake.push_token(TokenKind::Other, (0, 1), Some(test_name_id));
        let test_name_node = fake.push_node(AstNodeKind::Identifier, test_name_tok, test_name_tok, vec![]);
        let test_body = fake.push_node(AstNodeKind::BlockStmt, test_name_tok, test_name_tok, vec![]);
        let test_decl = fake.push_node(AstNodeKind::TestDecl, test_name_tok, test_name_tok, vec![test_name_node, test_body]);

        let root = fake.push_node(AstNodeKind::BlockStmt, fn_name_tok, test_name_tok, vec![func_decl, test_decl]);
        fake.set_root(root);

        let result = lower_unit(&fake, 0, None).unwrap();
        assert_eq!(result.graphs.len(), 2);
        assert_eq!(result.graphs[0].function_name, "main");
        assert_eq!(result.graphs[1].function_name, "test:trivial");
    }

    #[test]
    fn missing_unit_is_an_error() {
        let fake = FakeAst::new();
        assert!(lower_unit(&fake, 0, None).is_err());
    }
}
