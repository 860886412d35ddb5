//! Seed scenarios built directly with `GraphBuilder`, for smoke-testing
//! the validator/transform/codegen pipeline without a frontend.

use qtjir_core::{Graph, GraphBuilder, Opcode};

use crate::error::CliError;

/// Every scenario name accepted by `qtjir demo <scenario>`.
pub const SCENARIOS: &[&str] = &["hello", "arith", "branch", "tensor"];

pub fn build(scenario: &str) -> Result<Vec<Graph>, CliError> {
    if !SCENARIOS.contains(&scenario) {
        return Err(CliError::UnknownScenario(scenario.to_string()));
    }
    match scenario {
        "hello" => Ok(vec![hello()]),
        "arith" => Ok(vec![arith()]),
        "branch" => Ok(vec![branch()]),
        "tensor" => Ok(vec![tensor()]),
        _ => unreachable!("checked against SCENARIOS above"),
    }
}

/// `print(7); return 0;`
fn hello() -> Graph {
    let mut builder = GraphBuilder::new("main");
    let n = builder.create_constant_int(7);
    builder.create_call("print", &[n]);
    builder.create_return(None);
    builder.finish()
}

/// A redundant constant plus a real computation, left for the standard
/// pass pipeline to fold and sweep.
fn arith() -> Graph {
    let mut builder = GraphBuilder::new("main");
    let _dead = builder.create_constant_int(99);
    let a = builder.create_constant_int(6);
    let b = builder.create_constant_int(7);
    let product = builder.build_binary(Opcode::Mul, a, b);
    builder.create_call("print", &[product]);
    builder.create_return(Some(product));
    builder.finish()
}

/// `if true { 1 } else { 2 }` merged through a `Phi`.
fn branch() -> Graph {
    let mut builder = GraphBuilder::new("main");
    let cond = builder.create_constant_bool(true);
    let br = builder.build_branch_placeholder(cond);

    let true_label = builder.build_label();
    let true_value = builder.create_constant_int(1);
    let true_jump = builder.build_jump_placeholder();

    let false_label = builder.build_label();
    let false_value = builder.create_constant_int(2);
    let false_jump = builder.build_jump_placeholder();

    let merge_label = builder.build_label();
    let phi = builder.build_phi(&[true_value, false_value]);
    builder.create_return(Some(phi));

    builder.patch_input(br, 1, true_label);
    builder.patch_input(br, 2, false_label);
    builder.patch_input(true_jump, 0, merge_label);
    builder.patch_input(false_jump, 0, merge_label);

    builder.finish()
}

/// A tensor matmul feeding the accelerator-tenancy stub path.
fn tensor() -> Graph {
    let mut builder = GraphBuilder::new("main");
    let a = builder.create_constant_int(1);
    let b = builder.create_constant_int(2);
    let matmul = builder.build_tensor_op(Opcode::TensorMatmul, &[a, b]);
    builder.create_return(Some(matmul));
    builder.finish()
}
