//! Mapping from a graph's symbolic return-type string to an LLVM type.
//!
//! QTJIR carries no general type system into codegen -- every scalar is
//! `i32` unless the opcode says otherwise (floats, optionals, error unions,
//! slices). This module only resolves the three shapes a function signature
//! can take: `i32`, `void`, or the tagged `{i8, i64}` struct shared by
//! optionals and error unions.

use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::AddressSpace;

/// The `{i8, i64}` struct backing optionals and error unions: a one-byte
/// tag plus a widened 64-bit payload slot.
pub fn tagged_payload_type<'ctx>(context: &'ctx Context) -> StructType<'ctx> {
    context.struct_type(&[context.i8_type().into(), context.i64_type().into()], false)
}

/// The `{i32*, i64}` struct backing slice values: a data pointer plus a
/// length.
pub fn slice_type<'ctx>(context: &'ctx Context) -> StructType<'ctx> {
    context.struct_type(&[context.ptr_type(AddressSpace::default()).into(), context.i64_type().into()], false)
}

pub enum ReturnLlvmType<'ctx> {
    Void,
    Basic(BasicTypeEnum<'ctx>),
}

/// `"void"` maps to LLVM `void`; `"error_union"` maps to the tagged struct;
/// everything else (including the absent/default case) maps to `i32`.
pub fn return_llvm_type<'ctx>(context: &'ctx Context, return_type: &str) -> ReturnLlvmType<'ctx> {
    match return_type {
        "void" => ReturnLlvmType::Void,
        "error_union" => ReturnLlvmType::Basic(tagged_payload_type(context).into()),
        _ => ReturnLlvmType::Basic(context.i32_type().into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_return_type_is_i32() {
        let context = Context::create();
        match return_llvm_type(&context, "i32") {
            ReturnLlvmType::Basic(t) => assert!(t.is_int_type()),
            ReturnLlvmType::Void => panic!("expected i32"),
        }
    }

    #[test]
    fn void_return_type_maps_to_void() {
        let context = Context::create();
        assert!(matches!(return_llvm_type(&context, "void"), ReturnLlvmType::Void));
    }

    #[test]
    fn error_union_return_type_is_tagged_struct() {
        let context = Context::create();
        match return_llvm_type(&context, "error_union") {
            ReturnLlvmType::Basic(t) => assert!(t.is_struct_type()),
            ReturnLlvmType::Void => panic!("expected struct"),
        }
    }
}
