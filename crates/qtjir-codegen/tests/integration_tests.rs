//! Emits hand-built graphs straight through `GraphBuilder` and asserts on
//! fragments of the resulting LLVM IR text. These are deliberately small:
//! the point is end-to-end coverage of the emission procedure, not a
//! faithful stand-in for a real frontend.

use qtjir_core::{ExternRegistry, GraphBuilder, Opcode, Parameter};

fn emit_one(builder: GraphBuilder) -> String {
    let graph = builder.finish();
    let externs = ExternRegistry::new();
    qtjir_codegen::emit(&[graph], &externs).expect("emission should succeed").to_string()
}

#[test]
fn empty_main_gets_a_synthesized_epilogue() {
    let builder = GraphBuilder::new("main");
    let ir = emit_one(builder);
    assert!(ir.contains("define i32 @main()"));
    assert!(ir.contains("ret i32 0"));
}

#[test]
fn return_42_emits_a_constant_return() {
    let mut builder = GraphBuilder::new("main");
    let c = builder.create_constant_int(42);
    builder.create_return(Some(c));
    let ir = emit_one(builder);
    assert!(ir.contains("ret i32 42"));
}

#[test]
fn print_dispatches_on_argument_type() {
    let mut builder = GraphBuilder::new("main");
    let n = builder.create_constant_int(7);
    builder.create_call("print", &[n]);
    builder.create_return(None);
    let ir = emit_one(builder);
    assert!(ir.contains("qtjir_rt_print_int"));
}

#[test]
fn assert_false_branches_to_a_trap_block() {
    let mut builder = GraphBuilder::new("main");
    let cond = builder.create_constant_bool(false);
    builder.create_call("assert", &[cond]);
    builder.create_return(None);
    let ir = emit_one(builder);
    assert!(ir.contains("qtjir_rt_assert_fail"));
    assert!(ir.contains("unreachable"));
}

#[test]
fn branch_and_phi_merge_two_predecessors() {
    let mut builder = GraphBuilder::new("main");
    let cond = builder.create_constant_bool(true);
    let branch = builder.build_branch_placeholder(cond);

    let true_label = builder.build_label();
    let true_value = builder.create_constant_int(1);
    let true_jump = builder.build_jump_placeholder();

    let false_label = builder.build_label();
    let false_value = builder.create_constant_int(2);
    let false_jump = builder.build_jump_placeholder();

    let merge_label = builder.build_label();
    let phi = builder.build_phi(&[true_value, false_value]);
    builder.create_return(Some(phi));

    builder.patch_input(branch, 1, true_label);
    builder.patch_input(branch, 2, false_label);
    builder.patch_input(true_jump, 0, merge_label);
    builder.patch_input(false_jump, 0, merge_label);

    let ir = emit_one(builder);
    assert!(ir.contains("phi i32"));
    assert!(ir.contains("br i1"));
}

#[test]
fn error_union_function_without_explicit_return_is_rejected() {
    let mut builder = GraphBuilder::new("maybe_fail");
    builder.create_constant_int(1);
    let graph = {
        let mut g = builder.finish();
        g.return_type = qtjir_core::ERROR_UNION_RETURN_TYPE.to_string();
        g
    };
    let externs = ExternRegistry::new();
    let result = qtjir_codegen::emit(&[graph], &externs);
    assert!(result.is_err());
}

#[test]
fn error_union_function_with_explicit_return_succeeds() {
    let mut builder = GraphBuilder::new("maybe_ok");
    let ok = builder.create_constant_int(9);
    let wrapped = builder.build_error_union_construct(ok);
    builder.create_return(Some(wrapped));
    let graph = {
        let mut g = builder.finish();
        g.return_type = qtjir_core::ERROR_UNION_RETURN_TYPE.to_string();
        g
    };
    let externs = ExternRegistry::new();
    let ir = qtjir_codegen::emit(&[graph], &externs).expect("should emit").to_string();
    assert!(ir.contains("{ i8, i64 }"));
}

#[test]
fn struct_field_round_trips_through_gep() {
    let mut builder = GraphBuilder::new("main");
    let s = builder.build_struct_alloca("point", &["x".to_string(), "y".to_string()]);
    let value = builder.create_constant_int(5);
    builder.build_field_store(s, "x", value);
    let loaded = builder.build_field_access(s, "x");
    builder.create_return(Some(loaded));
    let ir = emit_one(builder);
    assert!(ir.contains("getelementptr"));
}

#[test]
fn unsupported_tensor_opcode_does_not_fail_the_whole_module() {
    let mut builder = GraphBuilder::new("main");
    let a = builder.create_constant_int(1);
    let b = builder.create_constant_int(2);
    let matmul = builder.build_tensor_op(Opcode::TensorMatmul, &[a, b]);
    builder.create_return(Some(matmul));
    let ir = emit_one(builder);
    assert!(ir.contains("define i32 @main()"));
}

#[test]
fn spawn_with_arguments_synthesizes_a_thunk() {
    let mut callee_builder = GraphBuilder::new("worker");
    let arg = callee_builder.build_argument(0);
    callee_builder.create_return(Some(arg));
    let mut callee_graph = callee_builder.finish();
    callee_graph.parameters = vec![Parameter {
        name: "x".to_string(),
        type_name: "i32".to_string(),
    }];

    let mut main_builder = GraphBuilder::new("main");
    let fn_ref = main_builder.build_fn_ref("worker");
    let arg_value = main_builder.create_constant_int(3);
    main_builder.build_spawn(fn_ref, &[arg_value]);
    main_builder.create_return(None);
    let main_graph = main_builder.finish();

    let externs = ExternRegistry::new();
    let ir = qtjir_codegen::emit(&[callee_graph, main_graph], &externs).expect("should emit").to_string();
    assert!(ir.contains("qtjir_rt_nursery_spawn"));
    assert!(ir.contains("qtjir_spawn_thunk_0"));
}
