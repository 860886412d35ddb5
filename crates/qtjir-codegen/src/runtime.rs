//! The fixed runtime ABI: every `qtjir_rt_*` symbol an emitted program may
//! call, declared lazily on first use exactly as the lowerer's
//! [`qtjir_core::BuiltinRegistry`] names them.

use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::FunctionType;
use inkwell::values::FunctionValue;
use inkwell::AddressSpace;

fn ptr_type<'ctx>(context: &'ctx Context) -> inkwell::types::PointerType<'ctx> {
    context.ptr_type(AddressSpace::default())
}

/// Returns the existing declaration if `name` was already declared in this
/// module, otherwise adds a new external declaration.
fn declare<'ctx>(module: &Module<'ctx>, name: &str, build: impl FnOnce() -> FunctionType<'ctx>) -> FunctionValue<'ctx> {
    module.get_function(name).unwrap_or_else(|| module.add_function(name, build(), None))
}

pub fn print<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_print", || context.void_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn println<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_println", || context.void_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn print_int<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_print_int", || context.void_type().fn_type(&[context.i64_type().into()], false))
}

pub fn print_float<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_print_float", || context.void_type().fn_type(&[context.f64_type().into()], false))
}

pub fn panic<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_panic", || context.void_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn assert_fail<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_assert_fail", || context.void_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn pow<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_pow", || {
        context.i32_type().fn_type(&[context.i32_type().into(), context.i32_type().into()], false)
    })
}

pub fn alloc<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_alloc", || ptr_type(context).fn_type(&[context.i64_type().into()], false))
}

pub fn string_data<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_data", || ptr_type(context).fn_type(&[ptr_type(context).into()], false))
}

pub fn string_len<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_len", || context.i32_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn string_create<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_create", || {
        ptr_type(context).fn_type(&[ptr_type(context).into(), context.i64_type().into(), ptr_type(context).into()], false)
    })
}

pub fn string_concat<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_concat", || {
        ptr_type(context).fn_type(&[ptr_type(context).into(), ptr_type(context).into()], false)
    })
}

pub fn string_concat_cstr<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_concat_cstr", || {
        ptr_type(context).fn_type(&[ptr_type(context).into(), ptr_type(context).into()], false)
    })
}

pub fn string_handle_len<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_handle_len", || context.i32_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn string_eq<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_eq", || {
        context.bool_type().fn_type(&[ptr_type(context).into(), ptr_type(context).into()], false)
    })
}

pub fn string_print<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_print", || context.void_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn string_free<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_string_free", || {
        context.void_type().fn_type(&[ptr_type(context).into(), ptr_type(context).into()], false)
    })
}

pub fn read_file<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_read_file", || ptr_type(context).fn_type(&[ptr_type(context).into(), ptr_type(context).into()], false))
}

pub fn write_file<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_write_file", || {
        context.i32_type().fn_type(&[ptr_type(context).into(), ptr_type(context).into(), ptr_type(context).into()], false)
    })
}

pub fn vector_create<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_vector_create", || ptr_type(context).fn_type(&[context.i64_type().into()], false))
}

pub fn vector_push<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_vector_push", || {
        context.i32_type().fn_type(&[ptr_type(context).into(), context.f64_type().into()], false)
    })
}

pub fn vector_get<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_vector_get", || {
        context.f64_type().fn_type(&[ptr_type(context).into(), context.i64_type().into()], false)
    })
}

pub fn vector_len<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_vector_len", || context.i64_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn vector_free<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_vector_free", || context.void_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn default_allocator<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_default_allocator", || ptr_type(context).fn_type(&[], false))
}

pub fn cast_i32_to_i64<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_cast_i32_to_i64", || context.i64_type().fn_type(&[context.i32_type().into()], false))
}

pub fn cast_i32_to_f64<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_cast_i32_to_f64", || context.f64_type().fn_type(&[context.i32_type().into()], false))
}

pub fn make_slice_i32<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_make_slice_i32", || {
        crate::types::slice_type(context).fn_type(&[ptr_type(context).into(), context.i32_type().into(), context.i32_type().into()], false)
    })
}

pub fn make_slice_inclusive_i32<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_make_slice_inclusive_i32", || {
        crate::types::slice_type(context).fn_type(&[ptr_type(context).into(), context.i32_type().into(), context.i32_type().into()], false)
    })
}

pub fn slice_get_i32<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_slice_get_i32", || {
        context.i32_type().fn_type(&[crate::types::slice_type(context).into(), context.i64_type().into()], false)
    })
}

pub fn nursery_create<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_nursery_create", || ptr_type(context).fn_type(&[], false))
}

pub fn nursery_spawn<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_nursery_spawn", || {
        context.i32_type().fn_type(&[ptr_type(context).into(), ptr_type(context).into()], false)
    })
}

pub fn nursery_spawn_noarg<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_nursery_spawn_noarg", || context.i32_type().fn_type(&[ptr_type(context).into()], false))
}

pub fn nursery_await_all<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_nursery_await_all", || context.i64_type().fn_type(&[], false))
}

pub fn array_create<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
    declare(module, "qtjir_rt_array_create", || ptr_type(context).fn_type(&[context.i32_type().into(), ptr_type(context).into()], false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaring_the_same_symbol_twice_reuses_it() {
        let context = Context::create();
        let module = context.create_module("m");
        let a = print(&context, &module);
        let b = print(&context, &module);
        assert_eq!(a, b);
    }

    #[test]
    fn pow_has_two_i32_parameters() {
        let context = Context::create();
        let module = context.create_module("m");
        let f = pow(&context, &module);
        assert_eq!(f.count_params(), 2);
    }
}
