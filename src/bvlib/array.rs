//! Bit-vector arrays: `bv_array` — a header-plus-values record allocated
//! from the bump arena (see [`super::context`]).
//!
//! The C original represents this as a struct with a C99 flexible array
//! member (`bitvector values[]`); we model the same layout with a header
//! struct plus raw-pointer arithmetic over arena memory; the public API
//! only ever hands out the header through a raw `*mut BvArray`, matching
//! the opaque `bv_array*` of the C ABI.

use super::bitvector::Bitvector;

/// Header of a `bv_array`. `values` is never touched directly — accessors
/// below compute the values pointer from `self`'s address, since the values
/// are laid out immediately after this header in arena memory.
#[repr(C)]
pub struct BvArray {
    pub len: u64,
}

impl BvArray {
    /// Number of [`Bitvector`] slots physically present (`len` data slots
    /// plus the always-present sentinel zero slot at index `len`).
    pub const EXTRA_SLOTS: u64 = 1;

    /// Pointer to the first `Bitvector` slot, immediately following the
    /// header. Safety: `self` must point into a live arena allocation made
    /// by [`super::context::Arena::bva_mk`] or `bva_mk_init`.
    pub unsafe fn values_ptr(&self) -> *const Bitvector {
        let header_end = (self as *const BvArray as *const u8).add(std::mem::size_of::<BvArray>());
        header_end.cast::<Bitvector>()
    }

    pub unsafe fn values_mut_ptr(&mut self) -> *mut Bitvector {
        let header_end = (self as *mut BvArray as *mut u8).add(std::mem::size_of::<BvArray>());
        header_end.cast::<Bitvector>()
    }

    /// Safety: same as [`Self::values_ptr`].
    pub unsafe fn values(&self) -> &[Bitvector] {
        unsafe { std::slice::from_raw_parts(self.values_ptr(), (self.len + Self::EXTRA_SLOTS) as usize) }
    }

    /// `bva_select`: out-of-range indices saturate to the sentinel slot at
    /// index `len`, which construction guarantees is always `bv_zero()`.
    ///
    /// Safety: same as [`Self::values_ptr`].
    pub unsafe fn select(&self, idx: Bitvector) -> Bitvector {
        debug_assert!(idx.occupied_width < super::bitvector::WORD_BITS);
        let i = idx.bits.min(self.len);
        unsafe { *self.values_ptr().add(i as usize) }
    }
}

#[cfg(test)]
mod tests {
    use super::super::context::Arena;
    use super::*;

    #[test]
    fn select_saturates_to_sentinel() {
        let mut arena = Arena::new();
        let arr = unsafe { &*arena.bva_mk_init(8, 3, &[10, 20, 30]) };

        unsafe {
            assert_eq!(arr.select(Bitvector::mk(32, 1)).bits, 20);
            assert_eq!(arr.select(Bitvector::mk(32, 99)).bits, 0);
            assert_eq!(arr.select(Bitvector::mk(32, 99)).width, 8);
        }
    }
}
