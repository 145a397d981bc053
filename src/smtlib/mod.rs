//! The SMT-LIB2 shim (C3): extracts assertions, array declarations, and
//! assignment comments from a raw SMT-LIB2 source string.

pub mod assignments;
pub mod error;
pub mod shim;

use std::collections::HashMap;

pub use error::SmtlibError;
pub use shim::ArrayDecl;

/// Everything the lowerer and driver need from one input file.
#[derive(Debug, Clone)]
pub struct ParsedInput {
    pub array_decls: Vec<ArrayDecl>,
    pub assertions: Vec<sexp::Sexp>,
    pub assignments: Vec<HashMap<String, Vec<u64>>>,
    pub assignments_header: Option<String>,
}

#[tracing::instrument(level = "debug", skip(source))]
pub fn parse(source: &str) -> Result<ParsedInput, SmtlibError> {
    let shim::ParsedSmt { array_decls, assertions } = shim::parse(source)?;
    let assignments::ParsedAssignments { header, assignments } = assignments::scan(source)?;

    tracing::debug!(
        array_decls = array_decls.len(),
        assertions = assertions.len(),
        assignments = assignments.len(),
        "parsed SMT-LIB2 input"
    );

    Ok(ParsedInput { array_decls, assertions, assignments, assignments_header: header })
}
