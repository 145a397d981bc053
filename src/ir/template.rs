//! The module preparer (C5, §4.5): turns the freshly built runtime module
//! into the per-formula template the lowerer's `smt_N` gets emitted into.
//!
//! Grounded on `original_source/jit/bvlib_cloner.{hpp,cpp}`: clone the
//! runtime module, tag small pure functions always-inline, promote their
//! linkage to external in the clone's source (so the always-inliner pass is
//! legal to run on them at all — LLVM won't inline across a linkage that
//! forbids it) and then demote the clone itself to internal/weak-any so the
//! post-inline remains carry no duplicate external definition once linked
//! alongside the real runtime object.

use inkwell::attributes::{Attribute, AttributeLoc};
use inkwell::module::{Linkage, Module};
use inkwell::values::FunctionValue;

use super::error::IrError;

/// A function with `<= INLINE_THRESHOLD` IR instructions (or named
/// `bv_mk`) is tagged `alwaysinline`. This mirrors the `28` constant in
/// `bvlib_cloner.cpp`; the exact number is load-bearing only in that it must
/// comfortably cover every primitive in [`super::runtime`] while still
/// excluding anything that grows a real branch-heavy body later.
const INLINE_THRESHOLD: u32 = 28;

/// Prepares a freshly built runtime module (from [`super::runtime::build`])
/// as a template ready to receive a per-formula lowering. Called once per
/// formula — each `smt_N` gets its own clone of the *same* starting point,
/// so preparation happens before any assertion-specific functions are added.
pub fn prepare(module: &Module<'_>) -> Result<(), IrError> {
    let always_inline = always_inline_attribute(module);

    for function in module.get_functions() {
        if function.get_first_basic_block().is_none() {
            // Declaration only (arena/array/context/print routines) — no
            // body means no instruction count, and it stays a call boundary
            // into the natively linked runtime object.
            continue;
        }

        let count = instruction_count(function);
        let name = function.get_name().to_string_lossy().into_owned();
        if count <= INLINE_THRESHOLD || name == "bv_mk" {
            function.add_attribute(AttributeLoc::Function, always_inline);
        }

        // The clone needs external linkage while the always-inliner module
        // pass runs (LLVM's inliner requires a definition with linkage that
        // permits inlining at each call site); callers demote the whole
        // module afterward via [`demote_definitions`].
        function.set_linkage(Linkage::External);
    }

    Ok(())
}

/// After inlining has run, demote every definition in the template clone to
/// `WeakAny` so that, once this module is linked against the real runtime
/// object (and every other formula's own clone), one strong definition wins
/// without a duplicate-symbol error — mirroring `bvlib_cloner.cpp`'s
/// post-inline linkage demotion.
pub fn demote_definitions(module: &Module<'_>) {
    for function in module.get_functions() {
        if function.get_first_basic_block().is_some() {
            function.set_linkage(Linkage::WeakAny);
        }
    }
}

fn always_inline_attribute<'ctx>(module: &Module<'ctx>) -> Attribute {
    let context = module.get_context();
    let kind_id = Attribute::get_named_enum_kind_id("alwaysinline");
    context.create_enum_attribute(kind_id, 0)
}

/// Static IR instruction count across every basic block — the same metric
/// `llvm::Function::getInstructionCount()` reports, which is what the
/// original cloner thresholds against.
fn instruction_count(function: FunctionValue<'_>) -> u32 {
    let mut count = 0u32;
    let mut bb = function.get_first_basic_block();
    while let Some(block) = bb {
        let mut instr = block.get_first_instruction();
        while let Some(inst) = instr {
            count += 1;
            instr = inst.get_next_instruction();
        }
        bb = block.get_next_basic_block();
    }
    count
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;

    use super::*;
    use crate::ir::runtime;

    #[test]
    fn small_primitives_get_tagged_always_inline() {
        let context = Context::create();
        let module = runtime::build(&context).unwrap();
        prepare(&module).unwrap();

        let bv_add = module.get_function("bv_add").unwrap();
        let kind_id = Attribute::get_named_enum_kind_id("alwaysinline");
        assert!(bv_add.get_enum_attribute(AttributeLoc::Function, kind_id).is_some());
    }

    #[test]
    fn declarations_are_left_untagged() {
        let context = Context::create();
        let module = runtime::build(&context).unwrap();
        prepare(&module).unwrap();

        let select_fn = module.get_function("bva_select").unwrap();
        let kind_id = Attribute::get_named_enum_kind_id("alwaysinline");
        assert!(select_fn.get_enum_attribute(AttributeLoc::Function, kind_id).is_none());
    }
}
