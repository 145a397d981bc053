//! Builds the LLVM IR twin of [`crate::bvlib`] (§4.1, §4.5).
//!
//! The C5 module preparer needs inlinable bodies for the pure, stateless
//! primitives so a per-formula `smt_N` can have `bv_add`/`bv_extract`/etc.
//! inlined straight into its own body instead of paying a call for every
//! node of the expression tree. This module defines exactly that subset,
//! field-for-field matching [`crate::bvlib::bitvector::Bitvector`]'s
//! formulas; every function here is a pure function of its arguments with no
//! access to the arena.
//!
//! Functions that touch process-global state — the arena allocators, the
//! array selector, context init/reset/teardown, and the print routines — are
//! declared here (signature only, no body). A plain `cargo build` binary
//! doesn't export these `#[unsafe(no_mangle)]` symbols into its *dynamic*
//! symbol table, so the JIT can't resolve them by name the way it would
//! against a linked shared object; [`crate::jit::driver`] binds each one
//! explicitly via `ExecutionEngine::add_global_mapping` against the matching
//! [`crate::bvlib::ffi`] function pointer before resolving any `smt_N`.
//! [`super::template::prepare`]'s instruction-count pass skips declarations
//! automatically (LLVM can't count instructions in a function it has no body
//! for), so this split is what gives us "inlinable bodies for
//! arithmetic/logic/compare/extract/concat and call boundaries for context
//! and print routines" for free, the same way
//! `original_source/jit/bvlib_cloner.cpp`'s `if (F.isDeclaration())
//! continue;` does.
//!
//! Every function below that takes or returns a bit-vector does so as two
//! flattened `i64` parameters/a two-word return rather than the logical
//! 3-field struct (§4.4's "ABI detail", [`super::types::BvFields`]) — this
//! is what lets `bva_select`'s declared signature agree with the real
//! `extern "C" fn(*const BvArray, Bitvector) -> Bitvector` it's bound to.

use inkwell::IntPredicate;
use inkwell::context::Context;
use inkwell::intrinsics::Intrinsic;
use inkwell::module::{Linkage, Module};
use inkwell::values::{FunctionValue, IntValue};

use super::error::IrError;
use super::types::{BvFields, RuntimeTypes};

/// Function names defined with a real body in the generated module — the
/// set the always-inline tagging pass in [`super::template`] can ever mark.
pub const DEFINED_FUNCTIONS: &[&str] = &[
    "bv_zero", "bv_one", "bv_bool", "bv_mk", "bv_add", "bv_mul", "bv_ult", "bv_slt", "bv_eq",
    "bv_and", "bv_or", "bv_concat", "bv_extract", "bv_zext", "bv_sext",
];

/// Functions forward-declared only; resolved against the natively linked
/// runtime object at JIT symbol-resolution time (§4.6).
pub const DECLARED_FUNCTIONS: &[&str] = &[
    "bva_select",
    "bva_mk",
    "bva_mk_init",
    "bv_init_context",
    "bv_reset_context",
    "bv_teardown_context",
];

/// Builds a fresh `Module` named `"bvlib_runtime"` containing the IR twin
/// described above. Callers clone this once per formula (§4.5) rather than
/// rebuilding it, since LLVM modules aren't `Clone` in a way that's cheaper
/// than `Module::parse_bitcode_from_buffer` on pre-serialized bitcode — here
/// we just rebuild it fresh from the `Context` each time, which is simpler
/// and, for a module this small, no slower in practice.
pub fn build<'ctx>(context: &'ctx Context) -> Result<Module<'ctx>, IrError> {
    let module = context.create_module("bvlib_runtime");
    let types = RuntimeTypes::get_or_create(context);
    let builder = context.create_builder();

    let ctlz = Intrinsic::find("llvm.ctlz")
        .ok_or(IrError::MissingIntrinsic("llvm.ctlz"))?
        .get_declaration(&module, &[types.i64_ty.into()])
        .ok_or(IrError::MissingIntrinsic("llvm.ctlz"))?;

    build_bv_zero(&module, &builder, &types)?;
    build_bv_one(&module, &builder, &types)?;
    build_bv_bool(&module, &builder, &types)?;
    build_bv_mk(&module, &builder, &types, ctlz)?;
    build_bv_add(&module, &builder, &types)?;
    build_bv_mul(&module, &builder, &types)?;
    build_bv_ult(&module, &builder, &types)?;
    build_bv_slt(&module, &builder, &types)?;
    build_bv_eq(&module, &builder, &types)?;
    build_bv_and(&module, &builder, &types)?;
    build_bv_or(&module, &builder, &types)?;
    build_bv_concat(&module, &builder, &types)?;
    build_bv_extract(&module, &builder, &types)?;
    build_bv_zext(&module, &builder, &types)?;
    build_bv_sext(&module, &builder, &types)?;

    declare_stateful_functions(&module, &types);

    Ok(module)
}

fn declare_stateful_functions<'ctx>(module: &Module<'ctx>, types: &RuntimeTypes<'ctx>) {
    let i32_ty = types.i32_ty;
    let i64_ty = types.i64_ty;
    let ptr_ty = types.ptr_ty;

    // `n: Bitvector` flattened into its two ABI words, matching the native
    // `extern "C" fn bva_select(*const BvArray, Bitvector) -> Bitvector`.
    module.add_function(
        "bva_select",
        types.bv_fn_ty(&[ptr_ty.into(), i64_ty.into(), i64_ty.into()]),
        Some(Linkage::External),
    );
    module.add_function("bva_mk", ptr_ty.fn_type(&[i32_ty.into(), i64_ty.into()], false), Some(Linkage::External));
    module.add_function(
        "bva_mk_init",
        ptr_ty.fn_type(&[i32_ty.into(), i64_ty.into(), ptr_ty.into()], false),
        Some(Linkage::External),
    );
    module.add_function("bv_init_context", types.void_fn_ty(), Some(Linkage::External));
    module.add_function("bv_reset_context", types.void_fn_ty(), Some(Linkage::External));
    module.add_function("bv_teardown_context", types.void_fn_ty(), Some(Linkage::External));
}

/// min(a, b) for two `IntValue`s of the same integer type, built via
/// `icmp ult` + `select` (both operands here are always non-negative
/// `width`/`occupied_width` fields).
fn umin<'ctx>(
    builder: &inkwell::builder::Builder<'ctx>,
    a: IntValue<'ctx>,
    b: IntValue<'ctx>,
) -> Result<IntValue<'ctx>, IrError> {
    let cond = builder.build_int_compare(IntPredicate::ULT, a, b, "umin.cmp")?;
    Ok(builder.build_select(cond, a, b, "umin")?.into_int_value())
}

fn umax<'ctx>(
    builder: &inkwell::builder::Builder<'ctx>,
    a: IntValue<'ctx>,
    b: IntValue<'ctx>,
) -> Result<IntValue<'ctx>, IrError> {
    let cond = builder.build_int_compare(IntPredicate::UGT, a, b, "umax.cmp")?;
    Ok(builder.build_select(cond, a, b, "umax")?.into_int_value())
}

/// `mask_overflow(n, width)`: `(n << (64 - width)) >> (64 - width)`, logical
/// shifts both ways. Valid for `1 <= width <= 64` since the shift amount is
/// always in `0..=63`.
fn mask_overflow<'ctx>(
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
    n: IntValue<'ctx>,
    width: IntValue<'ctx>,
) -> Result<IntValue<'ctx>, IrError> {
    let sixty_four = types.i64_ty.const_int(64, false);
    let shift = builder.build_int_sub(sixty_four, width, "mask.shift")?;
    let shifted = builder.build_left_shift(n, shift, "mask.shl")?;
    Ok(builder.build_right_shift(shifted, shift, false, "mask.lshr")?)
}

fn entry_block<'ctx>(module: &Module<'ctx>, f: FunctionValue<'ctx>) -> inkwell::basic_block::BasicBlock<'ctx> {
    module.get_context().append_basic_block(f, "entry")
}

fn build_bv_zero<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function("bv_zero", types.bv_fn_ty(&[]), Some(Linkage::External));
    builder.position_at_end(entry_block(module, f));
    let zero32 = types.i32_ty.const_int(0, false);
    let one32 = types.i32_ty.const_int(1, false);
    let zero64 = types.i64_ty.const_int(0, false);
    let v = BvFields::pack(builder, types, one32, zero32, zero64)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_one<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function("bv_one", types.bv_fn_ty(&[]), Some(Linkage::External));
    builder.position_at_end(entry_block(module, f));
    let one32 = types.i32_ty.const_int(1, false);
    let one64 = types.i64_ty.const_int(1, false);
    let v = BvFields::pack(builder, types, one32, one32, one64)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_bool<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function("bv_bool", types.bv_fn_ty(&[types.i32_ty.into()]), Some(Linkage::External));
    builder.position_at_end(entry_block(module, f));
    let b = f.get_nth_param(0).unwrap().into_int_value();

    let zero32 = types.i32_ty.const_int(0, false);
    let one32 = types.i32_ty.const_int(1, false);
    let zero64 = types.i64_ty.const_int(0, false);
    let one64 = types.i64_ty.const_int(1, false);
    let zero_bv = BvFields::pack(builder, types, one32, zero32, zero64)?;
    let one_bv = BvFields::pack(builder, types, one32, one32, one64)?;

    let is_nonzero = builder.build_int_compare(IntPredicate::NE, b, zero32, "bool.cmp")?;
    let result = builder.build_select(is_nonzero, one_bv, zero_bv, "bool.sel")?;
    builder.build_return(Some(&result))?;
    Ok(())
}

fn build_bv_mk<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
    ctlz: FunctionValue<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_mk",
        types.bv_fn_ty(&[types.i32_ty.into(), types.i64_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let width = f.get_nth_param(0).unwrap().into_int_value();
    let n = f.get_nth_param(1).unwrap().into_int_value();

    let width64 = builder.build_int_z_extend(width, types.i64_ty, "width64")?;
    let bits = mask_overflow(builder, types, n, width64)?;

    let not_poison = types.bool_ty.const_int(0, false);
    let ctlz_call = builder.build_call(ctlz, &[bits.into(), not_poison.into()], "ctlz")?;
    let leading_zeros = ctlz_call.try_as_basic_value().left().unwrap().into_int_value();
    let sixty_four = types.i64_ty.const_int(64, false);
    let occupied64 = builder.build_int_sub(sixty_four, leading_zeros, "occupied64")?;
    let occupied32 = builder.build_int_truncate(occupied64, types.i32_ty, "occupied32")?;

    let v = BvFields::pack(builder, types, width, occupied32, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_add<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_add",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let a = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let b = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(2).unwrap().into_int_value(),
        f.get_nth_param(3).unwrap().into_int_value(),
    )?;

    let one32 = types.i32_ty.const_int(1, false);
    let max_occ = umax(builder, a.occupied_width, b.occupied_width)?;
    let plus_one = builder.build_int_add(max_occ, one32, "add.occ_plus1")?;
    let occupied = umin(builder, plus_one, a.width)?;

    let sum = builder.build_int_add(a.bits, b.bits, "add.sum")?;
    let width64 = builder.build_int_z_extend(a.width, types.i64_ty, "add.width64")?;
    let bits = mask_overflow(builder, types, sum, width64)?;

    let v = BvFields::pack(builder, types, a.width, occupied, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_mul<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_mul",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let a = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let b = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(2).unwrap().into_int_value(),
        f.get_nth_param(3).unwrap().into_int_value(),
    )?;

    let occ_sum = builder.build_int_add(a.occupied_width, b.occupied_width, "mul.occ_sum")?;
    let occupied = umin(builder, occ_sum, a.width)?;

    let prod = builder.build_int_mul(a.bits, b.bits, "mul.prod")?;
    let width64 = builder.build_int_z_extend(a.width, types.i64_ty, "mul.width64")?;
    let bits = mask_overflow(builder, types, prod, width64)?;

    let v = BvFields::pack(builder, types, a.width, occupied, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_compare<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
    name: &str,
    body: impl FnOnce(&inkwell::builder::Builder<'ctx>, BvFields<'ctx>, BvFields<'ctx>) -> Result<IntValue<'ctx>, IrError>,
) -> Result<(), IrError> {
    let f = module.add_function(
        name,
        types
            .i32_ty
            .fn_type(&[types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into()], false),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let a = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let b = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(2).unwrap().into_int_value(),
        f.get_nth_param(3).unwrap().into_int_value(),
    )?;
    let result_bool = body(builder, a, b)?;
    let result = builder.build_int_z_extend(result_bool, types.i32_ty, "cmp.zext")?;
    builder.build_return(Some(&result))?;
    Ok(())
}

fn build_bv_ult<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    build_compare(module, builder, types, "bv_ult", |builder, a, b| {
        Ok(builder.build_int_compare(IntPredicate::ULT, a.bits, b.bits, "ult")?)
    })
}

fn build_bv_eq<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    build_compare(module, builder, types, "bv_eq", |builder, a, b| {
        Ok(builder.build_int_compare(IntPredicate::EQ, a.bits, b.bits, "eq")?)
    })
}

fn build_bv_slt<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    build_compare(module, builder, types, "bv_slt", |builder, a, b| {
        let one64 = types.i64_ty.const_int(1, false);
        let a_width_m1 = builder.build_int_z_extend(a.width, types.i64_ty, "slt.awm1")?;
        let a_width_m1 = builder.build_int_sub(a_width_m1, one64, "slt.awm1b")?;
        let b_width_m1 = builder.build_int_z_extend(b.width, types.i64_ty, "slt.bwm1")?;
        let b_width_m1 = builder.build_int_sub(b_width_m1, one64, "slt.bwm1b")?;

        let a_shifted = builder.build_right_shift(a.bits, a_width_m1, false, "slt.ashift")?;
        let a_sign = builder.build_and(a_shifted, one64, "slt.asign")?;
        let b_shifted = builder.build_right_shift(b.bits, b_width_m1, false, "slt.bshift")?;
        let b_sign = builder.build_and(b_shifted, one64, "slt.bsign")?;

        let cmp = builder.build_int_compare(IntPredicate::ULT, a.bits, b.bits, "slt.cmp")?;
        let zero64 = types.i64_ty.const_int(0, false);
        let a_sign_bool = builder.build_int_compare(IntPredicate::NE, a_sign, zero64, "slt.asignbool")?;
        let signs_differ = builder.build_int_compare(IntPredicate::NE, a_sign, b_sign, "slt.signsdiffer")?;

        Ok(builder.build_select(signs_differ, a_sign_bool, cmp, "slt.sel")?.into_int_value())
    })
}

fn build_bv_and<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_and",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let a = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let b = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(2).unwrap().into_int_value(),
        f.get_nth_param(3).unwrap().into_int_value(),
    )?;
    let occupied = umin(builder, a.occupied_width, b.occupied_width)?;
    let bits = builder.build_and(a.bits, b.bits, "and.bits")?;
    let v = BvFields::pack(builder, types, a.width, occupied, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_or<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_or",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let a = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let b = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(2).unwrap().into_int_value(),
        f.get_nth_param(3).unwrap().into_int_value(),
    )?;
    let occupied = umax(builder, a.occupied_width, b.occupied_width)?;
    let bits = builder.build_or(a.bits, b.bits, "or.bits")?;
    let v = BvFields::pack(builder, types, a.width, occupied, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

/// `lower = a, upper = b`, matching [`crate::bvlib::bitvector::Bitvector::concat`].
fn build_bv_concat<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_concat",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into(), types.i64_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let a = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let b = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(2).unwrap().into_int_value(),
        f.get_nth_param(3).unwrap().into_int_value(),
    )?;

    let width = builder.build_int_add(a.width, b.width, "concat.width")?;
    let occ_if_b_nonzero = builder.build_int_add(a.width, b.occupied_width, "concat.occ_b")?;
    let zero64 = types.i64_ty.const_int(0, false);
    let b_nonzero = builder.build_int_compare(IntPredicate::NE, b.bits, zero64, "concat.bnonzero")?;
    let occupied = builder.build_select(b_nonzero, occ_if_b_nonzero, a.occupied_width, "concat.occ")?.into_int_value();

    let a_width64 = builder.build_int_z_extend(a.width, types.i64_ty, "concat.awidth64")?;
    let b_shifted = builder.build_left_shift(b.bits, a_width64, "concat.bshift")?;
    let bits = builder.build_or(b_shifted, a.bits, "concat.bits")?;

    let v = BvFields::pack(builder, types, width, occupied, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_extract<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_extract",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i32_ty.into(), types.i32_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let a = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let from = f.get_nth_param(2).unwrap().into_int_value();
    let to = f.get_nth_param(3).unwrap().into_int_value();

    let one32 = types.i32_ty.const_int(1, false);
    let new_width = builder.build_int_sub(to, from, "extract.diff")?;
    let new_width = builder.build_int_add(new_width, one32, "extract.width")?;

    let occ_max_from = umax(builder, a.occupied_width, from)?;
    let occ_diff = builder.build_int_sub(occ_max_from, from, "extract.occdiff")?;
    let occupied = umin(builder, new_width, occ_diff)?;

    let sixty_four = types.i64_ty.const_int(64, false);
    let one64 = types.i64_ty.const_int(1, false);
    let to64 = builder.build_int_z_extend(to, types.i64_ty, "extract.to64")?;
    let from64 = builder.build_int_z_extend(from, types.i64_ty, "extract.from64")?;
    let to_plus_1 = builder.build_int_add(to64, one64, "extract.top1")?;
    let lsh = builder.build_int_sub(sixty_four, to_plus_1, "extract.lsh")?;
    let rsh = builder.build_int_add(lsh, from64, "extract.rsh")?;

    let shifted = builder.build_left_shift(a.bits, lsh, "extract.shl")?;
    let bits = builder.build_right_shift(shifted, rsh, false, "extract.lshr")?;

    let v = BvFields::pack(builder, types, new_width, occupied, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_zext<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_zext",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i32_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let n = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let width = f.get_nth_param(2).unwrap().into_int_value();
    let v = BvFields::pack(builder, types, width, n.occupied_width, n.bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

fn build_bv_sext<'ctx>(
    module: &Module<'ctx>,
    builder: &inkwell::builder::Builder<'ctx>,
    types: &RuntimeTypes<'ctx>,
) -> Result<(), IrError> {
    let f = module.add_function(
        "bv_sext",
        types.bv_fn_ty(&[types.i64_ty.into(), types.i64_ty.into(), types.i32_ty.into()]),
        Some(Linkage::External),
    );
    builder.position_at_end(entry_block(module, f));
    let n = BvFields::from_words(
        builder,
        types,
        f.get_nth_param(0).unwrap().into_int_value(),
        f.get_nth_param(1).unwrap().into_int_value(),
    )?;
    let width = f.get_nth_param(2).unwrap().into_int_value();

    let one64 = types.i64_ty.const_int(1, false);
    let n_width64 = builder.build_int_z_extend(n.width, types.i64_ty, "sext.nwidth64")?;
    let shift_m1 = builder.build_int_sub(n_width64, one64, "sext.shiftm1")?;
    let shifted = builder.build_right_shift(n.bits, shift_m1, false, "sext.padshift")?;
    let pad_bit = builder.build_and(shifted, one64, "sext.padbit")?;
    let zero64 = types.i64_ty.const_int(0, false);
    let pad_is_one = builder.build_int_compare(IntPredicate::NE, pad_bit, zero64, "sext.padisone")?;

    let all_ones = types.i64_ty.const_int(u64::MAX, false);
    let mask_base = builder.build_right_shift(all_ones, n_width64, false, "sext.maskbase")?;
    let mask = builder.build_left_shift(mask_base, n_width64, "sext.mask")?;
    let mask_sel = builder.build_select(pad_is_one, mask, zero64, "sext.masksel")?.into_int_value();
    let ored = builder.build_or(n.bits, mask_sel, "sext.ored")?;

    let width64 = builder.build_int_z_extend(width, types.i64_ty, "sext.width64")?;
    let bits = mask_overflow(builder, types, ored, width64)?;
    let occupied = builder.build_select(pad_is_one, width, n.occupied_width, "sext.occsel")?.into_int_value();

    let v = BvFields::pack(builder, types, width, occupied, bits)?;
    builder.build_return(Some(&v))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_error_and_defines_the_expected_functions() {
        let context = Context::create();
        let module = build(&context).expect("runtime module should build");

        for name in DEFINED_FUNCTIONS {
            let f = module.get_function(name).unwrap_or_else(|| panic!("missing function {name}"));
            assert!(f.get_first_basic_block().is_some(), "{name} should have a body");
        }
        for name in DECLARED_FUNCTIONS {
            let f = module.get_function(name).unwrap_or_else(|| panic!("missing declaration {name}"));
            assert!(f.get_first_basic_block().is_none(), "{name} should be a declaration only");
        }
    }
}
