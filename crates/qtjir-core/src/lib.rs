//! Graph core: the owned QTJIR node/graph data model, the append-only
//! builder, and the two static registries consulted during lowering.

pub mod builder;
pub mod data;
pub mod error;
pub mod graph;
pub mod id;
pub mod level;
pub mod metadata;
pub mod node;
pub mod opcode;
pub mod registry;
pub mod tenancy;

pub use builder::GraphBuilder;
pub use data::NodeData;
pub use error::CoreError;
pub use graph::{Capture, Graph, Parameter, ERROR_UNION_RETURN_TYPE};
pub use id::NodeId;
pub use level::Level;
pub use metadata::{DType, Layout, QuantumMetadata, TensorMetadata};
pub use node::{InputList, Node};
pub use opcode::{GateType, Opcode};
pub use registry::{BuiltinEntry, BuiltinRegistry, ExternFunction, ExternRegistry, LlvmTypeName, ReturnKind};
pub use tenancy::Tenancy;
