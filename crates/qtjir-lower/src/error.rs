//! Lowering error types. Lowering fails fast on the first
//! unrecoverable error -- every lowering function returns `Result` and
//! propagates via `?` rather than collecting a diagnostic list the way
//! the validator does.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LowerError {
    #[error("invalid token at id {0}")]
    InvalidToken(u32),

    #[error("invalid or unrecognized AST node at id {0}")]
    InvalidNode(u32),

    #[error("invalid call expression: {0}")]
    InvalidCall(String),

    #[error("unsupported call: '{0}' is not a builtin, extern, or known user function")]
    UnsupportedCall(String),

    #[error("invalid binary expression between tokens {lhs_last} and {rhs_first}")]
    InvalidBinaryExpr { lhs_last: u32, rhs_first: u32 },

    #[error("undefined variable: '{0}'")]
    UndefinedVariable(String),

    #[error("missing operand in expression at node {0}")]
    MissingOperand(u32),

    #[error("missing argument in call to '{0}'")]
    MissingArgument(String),

    #[error("l-value not supported for this expression kind")]
    UnsupportedLvalue,

    #[error("unit {0} has no registered root")]
    UnitNotFound(u32),
}
