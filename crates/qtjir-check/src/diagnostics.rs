//! Diagnostic records produced by validation rules.

use qtjir_core::NodeId;
use serde::{Deserialize, Serialize};

/// Severity of a single diagnostic. Only `Error` makes a graph invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// One validation finding, tied to the node that triggered it.
///
/// Every rule reports through this single shape so `validate` can collect
/// findings from every rule without aborting on the first problem.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{severity:?}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub node: Option<NodeId>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(node: impl Into<Option<NodeId>>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn warning(node: impl Into<Option<NodeId>>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn note(node: impl Into<Option<NodeId>>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Note,
            node: node.into(),
            message: message.into(),
        }
    }
}
