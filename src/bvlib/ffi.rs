//! The `extern "C"` surface of the BV runtime (C1) — the functions the
//! JIT-emitted `smt_N`/`assert_i` functions actually call, and the same
//! symbols the ahead-of-time-compiled runtime object exports. ABI-compatible
//! with `original_source/jit/bvlib/bvlib.h`.
//!
//! The two-word [`Bitvector`] struct is passed and returned by value; that
//! matches both the C struct-by-value convention the original relies on and
//! the lowerer's expectation (§4.4) that it can unpack a bit-vector into two
//! scalar call arguments.

use super::array::BvArray;
use super::bitvector::Bitvector;
use super::context;

#[unsafe(no_mangle)]
pub extern "C" fn bv_zero() -> Bitvector {
    Bitvector::zero()
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_one() -> Bitvector {
    Bitvector::one()
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_bool(b: i32) -> Bitvector {
    Bitvector::bool_(b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_mk(width: u32, n: u64) -> Bitvector {
    Bitvector::mk(width, n)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_add(a: Bitvector, b: Bitvector) -> Bitvector {
    Bitvector::add(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_mul(a: Bitvector, b: Bitvector) -> Bitvector {
    Bitvector::mul(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_ult(a: Bitvector, b: Bitvector) -> i32 {
    Bitvector::ult(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_slt(a: Bitvector, b: Bitvector) -> i32 {
    Bitvector::slt(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_eq(a: Bitvector, b: Bitvector) -> i32 {
    Bitvector::eq(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_and(a: Bitvector, b: Bitvector) -> Bitvector {
    Bitvector::and(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_or(a: Bitvector, b: Bitvector) -> Bitvector {
    Bitvector::or(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_concat(a: Bitvector, b: Bitvector) -> Bitvector {
    Bitvector::concat(a, b)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_extract(a: Bitvector, from: u32, to: u32) -> Bitvector {
    Bitvector::extract(a, from, to)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_zext(n: Bitvector, width: u32) -> Bitvector {
    Bitvector::zext(n, width)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_sext(n: Bitvector, width: u32) -> Bitvector {
    Bitvector::sext(n, width)
}

/// Safety: `arr` must be a live allocation from the current arena
/// generation (i.e. produced since the last `bv_init_context`/`bv_reset_context`).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bva_select(arr: *const BvArray, n: Bitvector) -> Bitvector {
    debug_assert!(!arr.is_null());
    unsafe { (*arr).select(n) }
}

#[unsafe(no_mangle)]
pub extern "C" fn bva_mk(width: u32, len: u64) -> *mut BvArray {
    context::global().lock().expect("arena mutex poisoned").bva_mk(width, len)
}

/// Safety: `constants` must point to `len` valid, non-null `u64` values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bva_mk_init(width: u32, len: u64, constants: *const u64) -> *mut BvArray {
    debug_assert!(!constants.is_null());
    let slice = unsafe { std::slice::from_raw_parts(constants, len as usize) };
    context::global().lock().expect("arena mutex poisoned").bva_mk_init(width, len, slice)
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_init_context() {
    context::global().lock().expect("arena mutex poisoned").init();
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_reset_context() {
    context::global().lock().expect("arena mutex poisoned").reset();
}

#[unsafe(no_mangle)]
pub extern "C" fn bv_teardown_context() {
    context::global().lock().expect("arena mutex poisoned").teardown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_equality_scenario_s1() {
        bv_init_context();
        let constants_holds: [u64; 8] = [0, 0, 0, 0, 0, 115, 0, 0];
        let arr = unsafe { bva_mk_init(8, 8, constants_holds.as_ptr()) };
        let selected = unsafe { bva_select(arr, Bitvector::mk(32, 5)) };
        assert_eq!(bv_eq(Bitvector::mk(8, 115), selected), 1);

        let constants_fails: [u64; 8] = [0; 8];
        let arr2 = unsafe { bva_mk_init(8, 8, constants_fails.as_ptr()) };
        let selected2 = unsafe { bva_select(arr2, Bitvector::mk(32, 5)) };
        assert_eq!(bv_eq(Bitvector::mk(8, 115), selected2), 0);
        bv_teardown_context();
    }
}
