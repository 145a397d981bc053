//! The JIT driver (C6): owns the per-file pipeline from parsed source to
//! invoked native code.

use std::path::Path;

use inkwell::OptimizationLevel;
use inkwell::context::Context;
use inkwell::execution_engine::ExecutionEngine;
use inkwell::passes::PassManager;
use inkwell::targets::{InitializationConfig, Target};

use crate::bvlib::array::BvArray;
use crate::bvlib::ffi;
use crate::ir::types::RuntimeTypes;
use crate::ir::{runtime, template};
use crate::lower::lower_formula;
use crate::smtlib::{self, ParsedInput};

use super::config::DriverConfig;
use super::error::JitError;
use super::report::{AssignmentOutcome, FormulaReport};

/// Runs one input file end to end: parse, build and prepare a runtime
/// template, lower, JIT, validate and invoke every assignment.
#[tracing::instrument(level = "debug", skip(config), fields(path = %path.display()))]
pub fn run_file(path: &Path, config: &DriverConfig) -> Result<FormulaReport, JitError> {
    let source = std::fs::read_to_string(path).map_err(|source| JitError::ReadInput { path: path.to_path_buf(), source })?;
    let parsed = smtlib::parse(&source)?;

    Target::initialize_native(&InitializationConfig::default())
        .map_err(JitError::EngineCreation)?;

    let context = Context::create();
    let module = runtime::build(&context)?;
    template::prepare(&module)?;

    let builder = context.create_builder();
    let types = RuntimeTypes::get_or_create(&context);
    let smt_fn = lower_formula(&module, &builder, &types, &parsed)?;
    let smt_name = smt_fn.get_name().to_string_lossy().into_owned();

    module.verify().map_err(|e| JitError::Ir(crate::ir::error::IrError::Verification(e.to_string())))?;

    if config.save_temps {
        save_temp_module(&module, config, &format!("{smt_name}.pre-opt.ll"));
    }

    let opt_level = if config.no_opt { OptimizationLevel::None } else { OptimizationLevel::Default };
    let execution_engine = module
        .create_jit_execution_engine(opt_level)
        .map_err(|e| JitError::EngineCreation(e.to_string()))?;

    bind_runtime_symbols(&module, &execution_engine)?;

    if !config.no_opt {
        run_optimization_pipeline(&module, &smt_name);
    }

    if config.save_temps {
        save_temp_module(&module, config, &format!("{smt_name}.post-opt.ll"));
    }

    let smt_fn_ptr = resolve_smt_fn(&execution_engine, &smt_name)?;

    ffi::bv_init_context();
    let outcomes = evaluate_assignments(&parsed, smt_fn_ptr, config);
    ffi::bv_teardown_context();

    Ok(FormulaReport {
        file: path.display().to_string(),
        assertion_count: parsed.assertions.len(),
        array_decl_count: parsed.array_decls.len(),
        outcomes,
    })
}

/// Binds every declaration-only symbol in [`runtime::DECLARED_FUNCTIONS`] to
/// its natively compiled implementation in [`crate::bvlib::ffi`].
///
/// A plain `cargo build` binary doesn't put `#[unsafe(no_mangle)] extern "C"`
/// symbols in its *dynamic* symbol table (no `-rdynamic`), so the JIT's
/// default `dlsym`-style in-process symbol resolution can't find them on its
/// own; `add_global_mapping` registers the address explicitly instead.
fn bind_runtime_symbols(module: &inkwell::module::Module<'_>, execution_engine: &ExecutionEngine<'_>) -> Result<(), JitError> {
    let mappings: &[(&str, usize)] = &[
        ("bva_select", ffi::bva_select as usize),
        ("bva_mk", ffi::bva_mk as usize),
        ("bva_mk_init", ffi::bva_mk_init as usize),
        ("bv_init_context", ffi::bv_init_context as usize),
        ("bv_reset_context", ffi::bv_reset_context as usize),
        ("bv_teardown_context", ffi::bv_teardown_context as usize),
    ];

    for (name, address) in mappings {
        let function = module.get_function(name).ok_or_else(|| JitError::UnresolvedSymbol((*name).to_string()))?;
        execution_engine.add_global_mapping(&function, *address);
    }

    Ok(())
}

type SmtFn = unsafe extern "C" fn(*mut *mut BvArray) -> i32;

fn resolve_smt_fn(execution_engine: &ExecutionEngine<'_>, name: &str) -> Result<SmtFn, JitError> {
    let addr = unsafe { execution_engine.get_function_address(name) }
        .map_err(|_| JitError::UnresolvedSymbol(name.to_string()))?;
    Ok(unsafe { std::mem::transmute::<usize, SmtFn>(addr) })
}

/// §4.6's optimization pipeline: module-level always-inliner, then per
/// `smt_*`-named function, instcombine/GVN/CFG-simplify once each.
fn run_optimization_pipeline(module: &inkwell::module::Module<'_>, smt_name: &str) {
    let module_pm = PassManager::create(());
    module_pm.add_always_inliner_pass();
    module_pm.run_on(module);

    let function_pm = PassManager::create(module);
    function_pm.add_instruction_combining_pass();
    function_pm.add_new_gvn_pass();
    function_pm.add_cfg_simplification_pass();
    function_pm.initialize();

    for function in module.get_functions() {
        let name = function.get_name().to_string_lossy();
        if name.starts_with("smt_") || name == smt_name {
            function_pm.run_on(&function);
        }
    }
}

fn save_temp_module(module: &inkwell::module::Module<'_>, config: &DriverConfig, file_name: &str) {
    let Some(dir) = config.temp_dir.as_ref() else {
        tracing::warn!("--save-temps requested without --temp-dir; skipping");
        return;
    };
    let path = dir.join(file_name);
    if let Err(e) = module.print_to_file(&path) {
        tracing::warn!(error = %e, path = %path.display(), "failed to write temp IR file");
    }
}

#[tracing::instrument(level = "debug", skip(parsed, smt_fn, config))]
fn evaluate_assignments(parsed: &ParsedInput, smt_fn: SmtFn, config: &DriverConfig) -> Vec<AssignmentOutcome> {
    let mut outcomes = Vec::with_capacity(parsed.assignments.len());

    for (index, assignment) in parsed.assignments.iter().enumerate() {
        if let Some(reason) = validate_assignment(parsed, assignment) {
            tracing::warn!(assignment = index, %reason, "assignment rejected before invocation");
            outcomes.push(AssignmentOutcome {
                assignment_index: index,
                models: false,
                failing_assertion: None,
                rejected_reason: Some(reason),
            });
            continue;
        }

        let iterations = if config.benchmark { config.iterations.max(1) } else { 1 };
        let mut last_result = 0i32;
        for iteration in 0..iterations {
            let mut arrays: Vec<*mut BvArray> = parsed
                .array_decls
                .iter()
                .map(|decl| {
                    let values = &assignment[&decl.name];
                    crate::bvlib::context::global()
                        .lock()
                        .expect("arena mutex poisoned")
                        .bva_mk_init(decl.element_width, values.len() as u64, values)
                })
                .collect();

            last_result = unsafe { smt_fn(arrays.as_mut_ptr()) };

            if config.benchmark && iteration + 1 < iterations {
                crate::bvlib::context::global().lock().expect("arena mutex poisoned").reset();
            }
        }

        outcomes.push(AssignmentOutcome {
            assignment_index: index,
            models: last_result == 0,
            failing_assertion: (last_result != 0).then_some(last_result as u32),
            rejected_reason: None,
        });
    }

    outcomes
}

/// §4.6 "Validation": variable-count/name mismatches are reported without
/// invoking compiled code.
fn validate_assignment(parsed: &ParsedInput, assignment: &std::collections::HashMap<String, Vec<u64>>) -> Option<String> {
    if assignment.len() != parsed.array_decls.len() {
        return Some(format!(
            "expected {} array variable(s), found {}",
            parsed.array_decls.len(),
            assignment.len()
        ));
    }
    for decl in &parsed.array_decls {
        if !assignment.contains_key(&decl.name) {
            return Some(format!("missing assignment for array `{}`", decl.name));
        }
    }
    None
}
