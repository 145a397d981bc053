use std::path::PathBuf;

/// Driver configuration (§4.6/§6) — one instance per process run, shared
/// across every input file.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Skip the optimization pipeline entirely (always-inliner +
    /// per-`smt_*` instcombine/GVN/CFG-simplify).
    pub no_opt: bool,
    /// Write the IR module to `temp_dir` before and after optimization, for
    /// inspection.
    pub save_temps: bool,
    pub temp_dir: Option<PathBuf>,
    /// Reset the arena and re-invoke every `smt_N` `iterations` times per
    /// assignment, reporting wall-clock timing instead of per-assignment
    /// models.
    pub benchmark: bool,
    pub iterations: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { no_opt: false, save_temps: false, temp_dir: None, benchmark: false, iterations: 1 }
    }
}
