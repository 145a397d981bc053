use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub assignment_index: usize,
    /// `true` iff every assertion evaluated logical-true for this
    /// assignment (`smt_N` returned 0).
    pub models: bool,
    /// 1-based index of the first failing assertion, if `models` is
    /// `false` and evaluation actually ran (absent for assignment-shape
    /// mismatches, which are reported via `rejected_reason` instead).
    pub failing_assertion: Option<u32>,
    /// Set when the assignment was rejected before invocation (§4.6
    /// "Validation") — wrong variable count, missing variable, or a
    /// mismatched element width.
    pub rejected_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormulaReport {
    pub file: String,
    pub assertion_count: usize,
    pub array_decl_count: usize,
    pub outcomes: Vec<AssignmentOutcome>,
}

impl FormulaReport {
    pub fn human_readable(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        let _ = writeln!(out, "{} — {} assertion(s), {} array(s)", self.file, self.assertion_count, self.array_decl_count);
        for outcome in &self.outcomes {
            match (&outcome.rejected_reason, outcome.models, outcome.failing_assertion) {
                (Some(reason), _, _) => {
                    let _ = writeln!(out, "  assignment {}: rejected ({reason})", outcome.assignment_index);
                }
                (None, true, _) => {
                    let _ = writeln!(out, "  assignment {}: models", outcome.assignment_index);
                }
                (None, false, Some(k)) => {
                    let _ = writeln!(out, "  assignment {}: does not model (assertion {k} failed)", outcome.assignment_index);
                }
                (None, false, None) => {
                    let _ = writeln!(out, "  assignment {}: does not model", outcome.assignment_index);
                }
            }
        }
        out
    }
}
