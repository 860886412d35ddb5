pub mod common_subexpression_elimination;
pub mod constant_folding;
pub mod dead_code_elimination;
pub mod quantum_cancellation;
pub mod tensor_fusion;

pub use common_subexpression_elimination::CommonSubexpressionElimination;
pub use constant_folding::ConstantFolding;
pub use dead_code_elimination::DeadCodeElimination;
pub use quantum_cancellation::QuantumCancellation;
pub use tensor_fusion::TensorFusion;
