//! The read-only AST snapshot the lowerer consumes.
//!
//! Modeled as a trait rather than a concrete parser: the lowerer never
//! owns or mutates the frontend's syntax tree, it only ever queries it.
//! `fixtures::FakeAst` is the minimal in-crate implementation tests build
//! by hand, the way a compiler's lowering tests hand-build a tiny tree
//! instead of invoking a full parser.

/// The closed set of AST node kinds the lowerer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AstNodeKind {
    FuncDecl,
    TestDecl,
    UseZig,
    BlockStmt,
    ExprStmt,
    ReturnStmt,
    DeferStmt,
    BreakStmt,
    ContinueStmt,
    LetStmt,
    VarStmt,
    IfStmt,
    WhileStmt,
    ForStmt,
    MatchStmt,
    PostfixWhen,
    FailStmt,
    IntegerLiteral,
    FloatLiteral,
    BoolLiteral,
    StringLiteral,
    CharLiteral,
    NullLiteral,
    Identifier,
    CallExpr,
    UnaryExpr,
    BinaryExpr,
    ArrayLiteral,
    IndexExpr,
    SliceInclusiveExpr,
    SliceExclusiveExpr,
    FieldExpr,
    StructLiteral,
    RangeInclusiveExpr,
    RangeExclusiveExpr,
    CatchExpr,
    TryExpr,
    Parameter,
    ErrorDecl,
    PrimitiveType,
    OptionalType,
    ErrorUnionType,
}

/// The closed set of lexical token kinds the binary-operator scanner and
/// literal parsers need to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    Amp,
    Pipe,
    Caret,
    ShiftLeft,
    ShiftRight,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    AndAnd,
    OrOr,
    KeywordAnd,
    KeywordOr,
    At,
    Tilde,
    Bang,
    LeftParen,
    RightParen,
    Whitespace,
    Comment,
    Newline,
    Other,
}

pub type AstId = u32;
pub type TokenId = u32;
pub type UnitId = u32;
pub type StringId = u32;

/// Span/kind summary for a single AST node.
#[derive(Debug, Clone, Copy)]
pub struct AstNode {
    pub kind: AstNodeKind,
    pub first_token: TokenId,
    pub last_token: TokenId,
    pub child_range: (u32, u32),
}

/// Span/kind summary for a single lexical token.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: (u32, u32),
    pub interned_string_id: Option<StringId>,
}

/// A parsed compilation unit handle.
#[derive(Debug, Clone, Copy)]
pub struct UnitHandle {
    pub root: AstId,
}

/// Read-only query surface over a parsed source file.
pub trait AstSnapshot {
    fn get_unit(&self, unit_id: UnitId) -> Option<UnitHandle>;
    fn get_node(&self, ast_id: AstId) -> Option<AstNode>;
    fn get_children(&self, ast_id: AstId) -> Vec<AstId>;
    fn get_token(&self, token_id: TokenId) -> Option<Token>;
    fn intern_lookup(&self, string_id: StringId) -> Option<&str>;
    fn source_bytes(&self, unit_id: UnitId) -> &[u8];
}

pub mod fixtures {
    use super::*;

    /// A hand-buildable AST for unit tests. Not a parser: callers push
    /// nodes and children explicitly in the shape they want to exercise.
    #[derive(Debug, Default)]
    pub struct FakeAst {
        nodes: Vec<AstNode>,
        children: Vec<Vec<AstId>>,
        tokens: Vec<Token>,
        strings: Vec<String>,
        source: Vec<u8>,
        unit_root: Option<AstId>,
    }

    impl FakeAst {
        pub fn new() -> Self {
            FakeAst::default()
        }

        pub fn set_source(&mut self, source: impl Into<String>) {
            self.source = source.into().into_bytes();
        }

        pub fn intern(&mut self, s: impl Into<String>) -> StringId {
            self.strings.push(s.into());
            (self.strings.len() - 1) as StringId
        }

        pub fn push_token(&mut self, kind: TokenKind, span: (u32, u32), interned: Option<StringId>) -> TokenId {
            self.tokens.push(Token {
                kind,
                span,
                interned_string_id: interned,
            });
            (self.tokens.len() - 1) as TokenId
        }

        pub fn push_node(&mut self, kind: AstNodeKind, first_token: TokenId, last_token: TokenId, children: Vec<AstId>) -> AstId {
            let id = self.nodes.len() as AstId;
            let child_start = self.flatten_children(&children);
            self.nodes.push(AstNode {
                kind,
                first_token,
                last_token,
                child_range: (child_start, child_start + children.len() as u32),
            });
            self.children.push(children);
            id
        }

        fn flatten_children(&self, _children: &[AstId]) -> u32 {
            self.children.iter().map(Vec::len).sum::<usize>() as u32
        }

        pub fn set_root(&mut self, root: AstId) {
            self.unit_root = Some(root);
        }
    }

    impl AstSnapshot for FakeAst {
        fn get_unit(&self, _unit_id: UnitId) -> Option<UnitHandle> {
            self.unit_root.map(|root| UnitHandle { root })
        }

        fn get_node(&self, ast_id: AstId) -> Option<AstNode> {
            self.nodes.get(ast_id as usize).copied()
        }

        fn get_children(&self, ast_id: AstId) -> Vec<AstId> {
            self.children.get(ast_id as usize).cloned().unwrap_or_default()
        }

        fn get_token(&self, token_id: TokenId) -> Option<Token> {
            self.tokens.get(token_id as usize).copied()
        }

        fn intern_lookup(&self, string_id: StringId) -> Option<&str> {
            self.strings.get(string_id as usize).map(String::as_str)
        }

        fn source_bytes(&self, _unit_id: UnitId) -> &[u8] {
            &self.source
        }
    }

}

#[cfg(test)]
mod tests {
    use super::fixtures::FakeAst;
    use super::*;

    #[test]
    fn fake_ast_round_trips_a_node_and_its_children() {
        let mut ast = FakeAst::new();
        let lit = ast.push_node(AstNodeKind::IntegerLiteral, 0, 0, vec![]);
        let block = ast.push_node(AstNodeKind::BlockStmt, 0, 1, vec![lit]);
        ast.set_root(block);

        assert_eq!(ast.get_unit(0).unwrap().root, block);
        assert_eq!(ast.get_children(block), vec![lit]);
        assert_eq!(ast.get_node(lit).unwrap().kind, AstNodeKind::IntegerLiteral);
    }

    #[test]
    fn interned_strings_are_retrievable() {
        let mut ast = FakeAst::new();
        let id = ast.intern("hello");
        assert_eq!(ast.intern_lookup(id), Some("hello"));
    }
}
