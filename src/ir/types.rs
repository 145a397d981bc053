//! Shared LLVM type/value helpers used by both the runtime template builder
//! ([`super::runtime`]) and the expression lowerer (`crate::lower`).
//!
//! The bit-vector struct layout mirrors `original_source/jit/bvlib/bvlib.h`'s
//! `struct bitvector_t { bv_width width; bv_width occupied_width; WordPtrUnion
//! bits; }` (`bv_width` = `unsigned`, the union is a single 64-bit word here
//! since this fragment never spills bits into a second word) — but the IR
//! type itself is `{ i64, i64 }`, not the 3-field layout directly: `width`
//! and `occupied_width` are packed into one word (`width` in the low 32
//! bits, `occupied_width` in the high 32) and `bits` is the second word.
//! §4.4's "ABI detail" is what this buys: every call crossing into a runtime
//! function passes/returns exactly two `i64` scalars per bit-vector, which is
//! also what the x86-64 SysV classification of the real 3-field
//! `#[repr(C)]` `Bitvector` produces (two INTEGER eightbytes), so the two
//! representations agree at every call boundary without relying on LLVM's
//! own aggregate-by-value lowering to match rustc's.

use inkwell::AddressSpace;
use inkwell::builder::Builder;
use inkwell::builder::BuilderError;
use inkwell::context::Context;
use inkwell::types::{IntType, PointerType, StructType};
use inkwell::values::{IntValue, StructValue};

/// Names matched against `module.get_struct_type(..)` so the lowerer (C4)
/// and the template builder (C5) agree on layout without sharing a `Context`.
pub const BITVECTOR_TY_NAME: &str = "struct.bitvector_t";
pub const BV_ARRAY_TY_NAME: &str = "struct.bv_array_t";

pub struct RuntimeTypes<'ctx> {
    pub i32_ty: IntType<'ctx>,
    pub i64_ty: IntType<'ctx>,
    pub bool_ty: IntType<'ctx>,
    pub bitvector_ty: StructType<'ctx>,
    pub bv_array_ty: StructType<'ctx>,
    pub ptr_ty: PointerType<'ctx>,
    pub void_ty: inkwell::types::VoidType<'ctx>,
}

impl<'ctx> RuntimeTypes<'ctx> {
    /// Looks up (or, if this is a fresh context, creates) the named struct
    /// types so repeated calls against the same `Context` are idempotent.
    pub fn get_or_create(context: &'ctx Context) -> Self {
        let i32_ty = context.i32_type();
        let i64_ty = context.i64_type();
        let bool_ty = context.bool_type();
        let ptr_ty = context.ptr_type(AddressSpace::default());

        let bitvector_ty = context.get_struct_type(BITVECTOR_TY_NAME).unwrap_or_else(|| {
            let ty = context.opaque_struct_type(BITVECTOR_TY_NAME);
            ty.set_body(&[i64_ty.into(), i64_ty.into()], false);
            ty
        });

        let bv_array_ty = context.get_struct_type(BV_ARRAY_TY_NAME).unwrap_or_else(|| {
            let ty = context.opaque_struct_type(BV_ARRAY_TY_NAME);
            // `len` header field only; the trailing `values[]` flexible
            // array member has no fixed IR representation, matching the
            // C99 original — all access beyond `len` goes through
            // `bva_select`, which is never inlined (§4.5) and is resolved
            // against the natively linked runtime instead.
            ty.set_body(&[i64_ty.into()], false);
            ty
        });

        let void_ty = context.void_type();

        Self { i32_ty, i64_ty, bool_ty, bitvector_ty, bv_array_ty, ptr_ty, void_ty }
    }

    pub fn bv_fn_ty(&self, params: &[inkwell::types::BasicMetadataTypeEnum<'ctx>]) -> inkwell::types::FunctionType<'ctx> {
        self.bitvector_ty.fn_type(params, false)
    }

    pub fn void_fn_ty(&self) -> inkwell::types::FunctionType<'ctx> {
        self.void_ty.fn_type(&[], false)
    }
}

/// The three logical fields of a bit-vector, decoded from its two-word ABI
/// representation. This is the lowerer's/runtime builder's internal working
/// form; it never appears as an LLVM value in its own right (there is no
/// 3-field IR struct) — only [`BvFields::words`]' two raw `i64`s cross a call
/// boundary (§4.4's "ABI detail").
pub struct BvFields<'ctx> {
    pub width: IntValue<'ctx>,
    pub occupied_width: IntValue<'ctx>,
    pub bits: IntValue<'ctx>,
}

impl<'ctx> BvFields<'ctx> {
    /// The two raw ABI words of `v` — exactly the two `extract_value` ops
    /// §4.4 calls for, with no further decoding. Callers pass these two
    /// scalars as separate call arguments instead of `v` itself.
    pub fn words(builder: &Builder<'ctx>, v: StructValue<'ctx>) -> Result<(IntValue<'ctx>, IntValue<'ctx>), BuilderError> {
        let word0 = builder.build_extract_value(v, 0, "bv.word0")?.into_int_value();
        let word1 = builder.build_extract_value(v, 1, "bv.word1")?.into_int_value();
        Ok((word0, word1))
    }

    /// Packs two raw ABI words back into the two-word struct value, e.g. for
    /// a call's return value.
    pub fn struct_from_words(
        builder: &Builder<'ctx>,
        types: &RuntimeTypes<'ctx>,
        word0: IntValue<'ctx>,
        word1: IntValue<'ctx>,
    ) -> Result<StructValue<'ctx>, BuilderError> {
        let undef = types.bitvector_ty.get_undef();
        let v1 = builder.build_insert_value(undef, word0, 0, "bv.word0")?;
        let v2 = builder.build_insert_value(v1, word1, 1, "bv.word1")?;
        Ok(v2.into_struct_value())
    }

    /// Decodes a word pair (as received by a runtime function's two flattened
    /// parameters) into the three logical fields.
    pub fn from_words(
        builder: &Builder<'ctx>,
        types: &RuntimeTypes<'ctx>,
        word0: IntValue<'ctx>,
        word1: IntValue<'ctx>,
    ) -> Result<Self, BuilderError> {
        let width = builder.build_int_truncate(word0, types.i32_ty, "bv.width")?;
        let thirty_two = types.i64_ty.const_int(32, false);
        let occ64 = builder.build_right_shift(word0, thirty_two, false, "bv.occ64")?;
        let occupied_width = builder.build_int_truncate(occ64, types.i32_ty, "bv.occ")?;
        Ok(Self { width, occupied_width, bits: word1 })
    }

    /// Encodes the three logical fields into a word pair, for a runtime
    /// function's return value.
    pub fn to_words(
        builder: &Builder<'ctx>,
        types: &RuntimeTypes<'ctx>,
        width: IntValue<'ctx>,
        occupied_width: IntValue<'ctx>,
        bits: IntValue<'ctx>,
    ) -> Result<(IntValue<'ctx>, IntValue<'ctx>), BuilderError> {
        let width64 = builder.build_int_z_extend(width, types.i64_ty, "bv.width64")?;
        let occ64 = builder.build_int_z_extend(occupied_width, types.i64_ty, "bv.occ64")?;
        let thirty_two = types.i64_ty.const_int(32, false);
        let occ_shifted = builder.build_left_shift(occ64, thirty_two, "bv.occshift")?;
        let word0 = builder.build_or(width64, occ_shifted, "bv.word0")?;
        Ok((word0, bits))
    }

    /// Unpacks a bit-vector struct value directly into its three logical
    /// fields (two `extract_value`s followed by the word decode above).
    pub fn unpack(builder: &Builder<'ctx>, types: &RuntimeTypes<'ctx>, v: StructValue<'ctx>) -> Result<Self, BuilderError> {
        let (word0, word1) = Self::words(builder, v)?;
        Self::from_words(builder, types, word0, word1)
    }

    /// Packs the three logical fields into a bit-vector struct value.
    pub fn pack(
        builder: &Builder<'ctx>,
        types: &RuntimeTypes<'ctx>,
        width: IntValue<'ctx>,
        occupied_width: IntValue<'ctx>,
        bits: IntValue<'ctx>,
    ) -> Result<StructValue<'ctx>, BuilderError> {
        let (word0, word1) = Self::to_words(builder, types, width, occupied_width, bits)?;
        Self::struct_from_words(builder, types, word0, word1)
    }
}
