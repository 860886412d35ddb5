//! Codegen error types covering all emission failure modes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("node {0} has no recorded value at the point it is consumed")]
    MissingOperand(u32),

    #[error("branch/jump target at node {0} is not a known label")]
    MissingLabel(u32),

    #[error("error-union function '{0}' fell through to its epilogue without an explicit return")]
    MissingReturn(String),

    #[error("graph references undefined node {0}")]
    InvalidGraph(u32),

    #[error("LLVM API error: {0}")]
    Llvm(String),

    #[error("module verification failed: {0}")]
    VerificationFailed(String),
}
