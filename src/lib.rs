//! A JIT specializer for quantifier-free SMT bit-vector/array formulas
//! (QF_AUFBV): reads an SMT-LIB2 source file plus its embedded assignment
//! comments, lowers every assertion to LLVM IR against a small bit-vector
//! runtime, JITs it, and reports which assignments model the conjunction.

pub mod bvlib;
pub mod ir;
pub mod jit;
pub mod lower;
pub mod smtlib;

pub use bvlib::{Arena, BvArray, Bitvector};
pub use jit::{AssignmentOutcome, DriverConfig, FormulaReport, JitError, run_file};
