//! The lowerer's operand-stack value — a two-word bit-vector pair, an
//! array pointer, or a scalar integer used for indices/widths that never
//! round-trip through the BV runtime (§4.4's "ABI detail").

use inkwell::values::{IntValue, PointerValue, StructValue};

use super::error::LowerError;

#[derive(Debug, Clone, Copy)]
pub enum LoweredValue<'ctx> {
    Bv(StructValue<'ctx>),
    I32(IntValue<'ctx>),
    ArrayPtr(PointerValue<'ctx>),
}

impl<'ctx> LoweredValue<'ctx> {
    pub fn as_bv(self) -> Result<StructValue<'ctx>, LowerError> {
        match self {
            LoweredValue::Bv(v) => Ok(v),
            _ => Err(LowerError::ExpectedBitvector),
        }
    }

    pub fn as_array_ptr(self) -> Result<PointerValue<'ctx>, LowerError> {
        match self {
            LoweredValue::ArrayPtr(p) => Ok(p),
            _ => Err(LowerError::ExpectedArray),
        }
    }

    pub fn as_i32(self) -> Result<IntValue<'ctx>, LowerError> {
        match self {
            LoweredValue::I32(v) => Ok(v),
            _ => Err(LowerError::ExpectedScalar),
        }
    }
}
