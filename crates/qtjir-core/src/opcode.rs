//! The closed opcode vocabulary of the QTJIR graph.
//!
//! Every node carries exactly one `Opcode`. The set is closed and
//! exhaustively matched everywhere downstream (validator, passes, emitter)
//! -- no string-tagged dynamic dispatch, per the "sum types" design note.
//!
//! Only `Argument` and `Alloca` carry an inline parameter
//! (`Argument(index)`, `Alloca(name)`). Every other per-node parameter (field names, callee/runtime names, branch
//! and jump targets, variant indices, closure env slot indices) lives either
//! in the node's ordered `inputs` list (when it is itself a node reference,
//! e.g. branch targets are the IDs of `Label` nodes) or in `NodeData`
//! (when it is a literal, e.g. a field name or callee string). Gate kind
//! lives in `QuantumMetadata`, never on the opcode itself.

use serde::{Deserialize, Serialize};

/// Data flow, control flow, and domain-specific operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Opcode {
    // -- Data flow --
    Constant,
    Argument { index: u32 },
    Alloca { name: String },
    Load,
    Store,
    Phi,
    Index,
    Slice,
    SliceIndex,
    SliceLen,
    Range,
    ArrayConstruct,
    StructConstruct,
    StructAlloca,
    FieldAccess,
    FieldStore,

    // -- Optionals --
    OptionalNone,
    OptionalSome,
    OptionalUnwrap,
    OptionalIsSome,

    // -- Error unions --
    ErrorUnionConstruct,
    ErrorFailConstruct,
    ErrorUnionIsError,
    ErrorUnionUnwrap,
    ErrorUnionGetError,

    // -- Tagged unions & closures --
    UnionConstruct,
    UnionTagCheck,
    UnionPayloadExtract,
    FnRef,
    ClosureCreate,
    ClosureCall,
    ClosureEnvLoad,
    ClosureEnvStore,

    // -- Control flow --
    Call,
    Return,
    Branch,
    Jump,
    Label,

    // -- Arithmetic --
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // -- Comparison --
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // -- Bitwise --
    BitAnd,
    BitOr,
    Xor,
    Shl,
    Shr,
    BitNot,

    // -- Tensor --
    TensorMatmul,
    TensorConv,
    TensorReduce,
    TensorScalarMul,
    TensorContract,
    TensorRelu,
    TensorSoftmax,
    TensorFusedMatmulRelu,
    TensorFusedMatmulAdd,
    SsmScan,
    SsmSelectiveScan,

    // -- Quantum --
    QuantumGate,
    QuantumMeasure,

    // -- Concurrency --
    Await,
    Spawn,
    NurseryBegin,
    NurseryEnd,
    AsyncCall,
    ChannelCreate,
    ChannelSend,
    ChannelRecv,
    ChannelClose,
    ChannelTryRecv,
    ChannelTrySend,
    ChannelIsClosed,
    SelectBegin,
    SelectArm,
    SelectEnd,
    UsingBegin,
    UsingEnd,

    // -- Dispatch --
    TraitMethodCall,
    VtableLookup,
    VtableConstruct,
    ImplMethodRef,
}

impl Opcode {
    /// `true` for the opcodes the emitter treats as basic-block terminators.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Return | Opcode::Branch | Opcode::Jump)
    }

    /// `true` for `Label`, which opens a new basic block during emission.
    pub fn is_label(&self) -> bool {
        matches!(self, Opcode::Label)
    }

    /// `true` for the opcodes constant folding operates on -- folding is
    /// limited to integer binary arithmetic.
    pub fn is_binary_arith(&self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod | Opcode::Pow
        )
    }
}

/// Quantum gate kinds. Arity is a pure function of the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateType {
    Hadamard,
    PauliX,
    PauliY,
    PauliZ,
    Cnot,
    Cz,
    Swap,
    Toffoli,
    Fredkin,
    Rx,
    Ry,
    Rz,
}

impl GateType {
    /// Required qubit count for this gate kind.
    pub fn arity(self) -> usize {
        match self {
            GateType::Hadamard
            | GateType::PauliX
            | GateType::PauliY
            | GateType::PauliZ
            | GateType::Rx
            | GateType::Ry
            | GateType::Rz => 1,
            GateType::Cnot | GateType::Cz | GateType::Swap => 2,
            GateType::Toffoli | GateType::Fredkin => 3,
        }
    }

    /// `true` for gates requiring exactly one finite rotation parameter.
    pub fn is_rotation(self) -> bool {
        matches!(self, GateType::Rx | GateType::Ry | GateType::Rz)
    }

    /// `true` for gates in the known self-inverse set (used by the gate
    /// cancellation pass).
    pub fn is_self_inverse(self) -> bool {
        matches!(
            self,
            GateType::Hadamard
                | GateType::PauliX
                | GateType::PauliY
                | GateType::PauliZ
                | GateType::Cnot
                | GateType::Cz
                | GateType::Swap
                | GateType::Toffoli
                | GateType::Fredkin
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_arity_single_qubit() {
        assert_eq!(GateType::Hadamard.arity(), 1);
        assert_eq!(GateType::Rx.arity(), 1);
    }

    #[test]
    fn gate_arity_two_qubit() {
        assert_eq!(GateType::Cnot.arity(), 2);
        assert_eq!(GateType::Swap.arity(), 2);
    }

    #[test]
    fn gate_arity_three_qubit() {
        assert_eq!(GateType::Toffoli.arity(), 3);
        assert_eq!(GateType::Fredkin.arity(), 3);
    }

    #[test]
    fn rotation_gates_are_rx_ry_rz_only() {
        assert!(GateType::Rx.is_rotation());
        assert!(GateType::Ry.is_rotation());
        assert!(GateType::Rz.is_rotation());
        assert!(!GateType::Hadamard.is_rotation());
        assert!(!GateType::Cnot.is_rotation());
    }

    #[test]
    fn self_inverse_set_matches_spec() {
        for g in [
            GateType::Hadamard,
            GateType::PauliX,
            GateType::PauliY,
            GateType::PauliZ,
            GateType::Cnot,
            GateType::Cz,
            GateType::Swap,
            GateType::Toffoli,
            GateType::Fredkin,
        ] {
            assert!(g.is_self_inverse(), "{g:?} should be self-inverse");
        }
        assert!(!GateType::Rx.is_self_inverse());
    }

    #[test]
    fn is_terminator() {
        assert!(Opcode::Return.is_terminator());
        assert!(Opcode::Jump.is_terminator());
        assert!(Opcode::Branch.is_terminator());
        assert!(!Opcode::Add.is_terminator());
    }

    #[test]
    fn is_binary_arith() {
        assert!(Opcode::Add.is_binary_arith());
        assert!(Opcode::Pow.is_binary_arith());
        assert!(!Opcode::Equal.is_binary_arith());
    }

    #[test]
    fn serde_roundtrip() {
        let op = Opcode::QuantumGate;
        let json = serde_json::to_string(&op).unwrap();
        let back: Opcode = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
