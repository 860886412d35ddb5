//! Foreign-module ingestion, the lowerer-side half of `use zig "<path>"`
//!. Renamed generically since QTJIR itself is frontend-
//! agnostic about which source language the foreign module is written in.

use std::path::{Path, PathBuf};

use qtjir_core::{ExternFunction, ExternRegistry};
use tracing::warn;

use crate::ast::{AstId, AstNodeKind, AstSnapshot};
use crate::foreign::ForeignModuleParser;

/// Byte cap on a single foreign-module read.
pub const MAX_FOREIGN_SOURCE_BYTES: u64 = 10 * 1024 * 1024;

/// Resolves a `use_zig` node's path literal relative to `source_dir`
/// (when given), and ingests the referenced module into `registry`.
/// I/O failures are logged and skipped, not propagated as hard errors --
/// a missing foreign module should not abort lowering every other
/// function in the unit.
pub fn ingest_use_node(
    ast: &dyn AstSnapshot,
    use_ast: AstId,
    source_dir: Option<&Path>,
    parser: &dyn ForeignModuleParser,
    registry: &mut ExternRegistry,
) {
    let Some(node) = ast.get_node(use_ast) else { return };
    if node.kind != AstNodeKind::UseZig {
        return;
    }
    let Some(relative_path) = path_literal(ast, use_ast) else {
        warn!("use declaration at node {use_ast} has no resolvable path literal");
        return;
    };

    let joined: PathBuf = match source_dir {
        Some(dir) => dir.join(&relative_path),
        None => PathBuf::from(&relative_path),
    };
    let absolute = match joined.canonicalize() {
        Ok(path) => path,
        Err(err) => {
            warn!("skipping unreadable foreign module '{}': {err}", joined.display());
            return;
        }
    };
    let absolute_str = absolute.to_string_lossy().to_string();

    if registry.has_ingested(&absolute_str) {
        return;
    }

    let source = match read_capped(&absolute, MAX_FOREIGN_SOURCE_BYTES) {
        Ok(source) => source,
        Err(err) => {
            warn!("skipping unreadable foreign module '{absolute_str}': {err}");
            return;
        }
    };

    for sig in parser.parse(&absolute_str, &source) {
        registry.register(ExternFunction {
            name: sig.name,
            param_types: sig.param_types,
            return_type: sig.return_type,
            source_path: absolute_str.clone(),
        });
    }
    registry.mark_ingested(absolute_str);
}

fn path_literal(ast: &dyn AstSnapshot, use_ast: AstId) -> Option<String> {
    let &string_child = ast.get_children(use_ast).first()?;
    let string_node = ast.get_node(string_child)?;
    let token = ast.get_token(string_node.first_token)?;
    let raw = ast.intern_lookup(token.interned_string_id?)?;
    Some(crate::expr::decode_string_literal(raw))
}

fn read_capped(path: &Path, cap: u64) -> std::io::Result<String> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut buffer = Vec::new();
    file.take(cap).read_to_end(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::fixtures::FakeAst;
    use crate::ast::TokenKind;
    use crate::foreign::CLikeSignatureParser;

    #[test]
    fn ingesting_a_missing_path_is_a_no_op_not_an_error() {
        let mut ast = FakeAst::new();
        let path_id = ast.intern("\"does_not_exist.ext\"");
        let path_tok = ast.push_token(TokenKind::Other, (0, 1), Some(path_id));
        let path_node = ast.push_node(AstNodeKind::StringLiteral, path_tok, path_tok, vec![]);
        let use_node = ast.push_node(AstNodeKind::UseZig, path_tok, path_tok, vec![path_node]);

        let mut registry = ExternRegistry::new();
        let parser = CLikeSignatureParser;
        ingest_use_node(&ast, use_node, None, &parser, &mut registry);
        assert!(registry.is_empty());
    }

    #[test]
    fn ingests_a_real_file_and_registers_its_signatures() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("math.ext"), "fn add_i32(i32, i32) -> i32;").unwrap();

        let mut ast = FakeAst::new();
        let path_id = ast.intern("\"math.ext\"");
        let path_tok = ast.push_token(TokenKind::Other, (0, 1), Some(path_id));
        let path_node = ast.push_node(AstNodeKind::StringLiteral, path_tok, path_tok, vec![]);
        let use_node = ast.push_node(AstNodeKind::UseZig, path_tok, path_tok, vec![path_node]);

        let mut registry = ExternRegistry::new();
        let parser = CLikeSignatureParser;
        ingest_use_node(&ast, use_node, Some(temp_dir.path()), &parser, &mut registry);

        assert!(registry.lookup("add_i32").is_some());
    }

    #[test]
    fn already_ingested_absolute_path_is_skipped_silently() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("math.ext"), "fn add_i32(i32, i32) -> i32;").unwrap();

        let mut ast = FakeAst::new();
        let path_id = ast.intern("\"math.ext\"");
        let path_tok = ast.push_token(TokenKind::Other, (0, 1), Some(path_id));
        let path_node = ast.push_node(AstNodeKind::StringLiteral, path_tok, path_tok, vec![]);
        let use_node = ast.push_node(AstNodeKind::UseZig, path_tok, path_tok, vec![path_node]);

        let mut registry = ExternRegistry::new();
        let parser = CLikeSignatureParser;
        ingest_use_node(&ast, use_node, Some(temp_dir.path()), &parser, &mut registry);
        assert_eq!(registry.len(), 1);

        std::fs::write(temp_dir.path().join("math.ext"), "fn add_i32(i32, i32, i32) -> i32;").unwrap();
        ingest_use_node(&ast, use_node, Some(temp_dir.path()), &parser, &mut registry);
        assert_eq!(registry.lookup("add_i32").unwrap().param_types.len(), 2);
    }
}
