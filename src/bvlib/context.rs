//! The bump-allocator arena (C2) backing every `bv_array`.
//!
//! Grounded on `original_source/jit/bvlib/bvlib.cpp`'s anonymous `BVContext`:
//! a single 16 MiB pool, word-aligned bump pointer, `init`/`reset`/`teardown`.
//! The original exposes this as process-global mutable state behind a
//! function-local `static`; we keep the "process-global" contract (§3, §9)
//! but make the global handle explicit and `Mutex`-guarded so that reaching
//! it from safe Rust is sound to *construct*, even though the spec still
//! requires single-threaded *use* (concurrent mutation remains a Non-goal).

use std::sync::{Mutex, OnceLock};

use super::array::BvArray;
use super::bitvector::Bitvector;

/// 16 MiB, matching `BVContext::PoolBytes = 1 << 24` in the original.
const POOL_BYTES: usize = 1 << 24;
const WORD_BYTES: usize = std::mem::size_of::<u64>();

#[derive(thiserror::Error, Debug)]
pub enum ArenaError {
    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },
    #[error("arena used before init()")]
    NotInitialized,
}

pub struct Arena {
    mem: Option<Box<[u8]>>,
    next: usize,
}

impl Arena {
    pub fn new() -> Self {
        let mut arena = Self { mem: None, next: 0 };
        arena.init();
        arena
    }

    pub fn init(&mut self) {
        self.mem = Some(vec![0u8; POOL_BYTES].into_boxed_slice());
        self.next = 0;
    }

    /// Zeroes only the used prefix and rewinds the bump pointer — per §9,
    /// implementations must not assume a fresh reset clears memory beyond
    /// the prior high-water mark.
    pub fn reset(&mut self) {
        let used = self.next;
        if let Some(mem) = self.mem.as_mut() {
            mem[..used].fill(0);
        }
        self.next = 0;
    }

    pub fn teardown(&mut self) {
        self.mem = None;
        self.next = 0;
    }

    fn remaining_bytes(&self) -> usize {
        self.mem.as_ref().map_or(0, |m| m.len() - self.next)
    }

    /// Bump-allocates `n` words (rounding up to a word boundary), returning
    /// a pointer into arena memory. Precondition violation (arena
    /// exhaustion) is fatal, mirroring the runtime's "no recoverable
    /// errors" policy (§4.1, §7) — it panics rather than returning `Result`.
    pub fn alloc_words(&mut self, n: usize) -> *mut u8 {
        self.alloc_bytes(n * WORD_BYTES)
    }

    pub fn alloc_bytes(&mut self, n: usize) -> *mut u8 {
        let to_bump = n + n % WORD_BYTES;
        let remaining = self.remaining_bytes();
        if to_bump > remaining {
            panic!("{}", ArenaError::Exhausted { requested: to_bump, remaining });
        }

        let mem = self.mem.as_mut().expect("arena used before init()");
        let ptr = unsafe { mem.as_mut_ptr().add(self.next) };
        self.next += to_bump;
        ptr
    }

    /// `bva_mk`: allocates a header plus `len` zero-valued bit-vectors (plus
    /// the sentinel slot) of the given element width.
    pub fn bva_mk(&mut self, width: u32, len: u64) -> *mut BvArray {
        let words_to_alloc = (len + 4) as usize;
        let bytes = self.alloc_words(words_to_alloc);
        let arr = bytes.cast::<BvArray>();
        unsafe {
            (*arr).len = len;
            let values = (*arr).values_mut_ptr();
            for i in 0..=len {
                (*values.add(i as usize)) = Bitvector { width, occupied_width: 0, bits: 0 };
            }
        }
        arr
    }

    /// `bva_mk_init`: same as [`Self::bva_mk`], then initializes each slot
    /// via `bv_mk(width, constants[i])`; the sentinel slot is always
    /// `bv_zero()`.
    pub fn bva_mk_init(&mut self, width: u32, len: u64, constants: &[u64]) -> *mut BvArray {
        debug_assert_eq!(constants.len() as u64, len);

        let words_to_alloc = (len + 4) as usize;
        let bytes = self.alloc_words(words_to_alloc);
        let arr = bytes.cast::<BvArray>();
        unsafe {
            (*arr).len = len;
            let values = (*arr).values_mut_ptr();
            for (i, &c) in constants.iter().enumerate() {
                let bv = if c != 0 {
                    Bitvector::mk(width, c)
                } else {
                    Bitvector { width, occupied_width: 0, bits: 0 }
                };
                *values.add(i) = bv;
            }
            *values.add(len as usize) = Bitvector::zero();
        }
        arr
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-global arena handle, mirroring `BVContext::get()`'s function-local
/// static singleton.
static GLOBAL_ARENA: OnceLock<Mutex<Arena>> = OnceLock::new();

pub fn global() -> &'static Mutex<Arena> {
    GLOBAL_ARENA.get_or_init(|| Mutex::new(Arena::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zeroes_only_used_prefix() {
        let mut arena = Arena::new();
        let _first = arena.bva_mk_init(8, 2, &[5, 6]);
        let high_water = arena.next;
        arena.reset();
        assert_eq!(arena.next, 0);
        assert!(arena.mem.as_ref().unwrap()[..high_water].iter().all(|&b| b == 0));
    }

    #[test]
    fn teardown_releases_the_pool() {
        let mut arena = Arena::new();
        arena.teardown();
        assert!(arena.mem.is_none());
    }
}
