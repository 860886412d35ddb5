//! The immediate payload carried by a node.
//!
//! A node carries at most one scalar-ish payload: an integer, a float, a
//! boolean, a graph-owned string, or nothing. Strings are always owned by
//! the graph -- no borrowed lifetimes leak out of a `Graph`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Unused,
}

impl Default for NodeData {
    fn default() -> Self {
        NodeData::Unused
    }
}

impl NodeData {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            NodeData::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            NodeData::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NodeData::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeData::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unused() {
        assert_eq!(NodeData::default(), NodeData::Unused);
    }

    #[test]
    fn accessors() {
        assert_eq!(NodeData::Integer(5).as_integer(), Some(5));
        assert_eq!(NodeData::Float(1.5).as_float(), Some(1.5));
        assert_eq!(NodeData::Bool(true).as_bool(), Some(true));
        assert_eq!(NodeData::Str("x".into()).as_str(), Some("x"));
        assert_eq!(NodeData::Unused.as_integer(), None);
    }
}
