//! Core error types for qtjir-core.

use thiserror::Error;

use crate::id::NodeId;

/// Errors produced by the graph core: builder misuse, registry lookups,
/// and malformed foreign signatures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node index was not found in the graph.
    #[error("node not found: NodeId({0})")]
    NodeNotFound(NodeId),

    /// A foreign signature used a type string outside the closed
    /// `i1, i32, i64, float, double, ptr, void` vocabulary.
    #[error("unrecognized LLVM type name: '{0}'")]
    UnrecognizedTypeName(String),

    /// `replace_nodes` was called with a vector that does not satisfy
    /// `node.id == index` for every element.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}
