//! Hand-rolled scanner for the assignment comments trailing an SMT-LIB2
//! file — grounded on `original_source/jit/smtlib_parser.cpp`'s
//! `SmtLibParser::init`, which reads the file line-by-line and special-cases
//! any line whose trimmed prefix is `"; { "`.
//!
//! These lines are invisible to any SMT-LIB2 lexer (they're comments), so
//! they're scanned independently of the `sexp`-driven pass in
//! [`super::shim`], line by line, over the same source text.

use std::collections::HashMap;

use super::error::SmtlibError;

pub const HEADER_PREFIX: &str = "; Assignments";
const ASSIGNMENT_PREFIX: &str = "; {";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAssignments {
    /// The optional `; Assignments <timestamp>` header, verbatim (minus the
    /// leading `"; "`), if present. Diagnostic metadata only.
    pub header: Option<String>,
    pub assignments: Vec<HashMap<String, Vec<u64>>>,
}

/// Scans every line of `source` for the assignment-comment grammar.
pub fn scan(source: &str) -> Result<ParsedAssignments, SmtlibError> {
    let mut result = ParsedAssignments::default();

    for (zero_based_line, raw_line) in source.lines().enumerate() {
        let line_no = zero_based_line + 1;
        let trimmed = raw_line.trim_end();

        if trimmed.starts_with(ASSIGNMENT_PREFIX) {
            let json = trimmed.trim_start_matches(';').trim();
            let parsed: HashMap<String, Vec<u64>> =
                serde_json::from_str(json).map_err(|e| SmtlibError::MalformedAssignment {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            result.assignments.push(parsed);
        } else if trimmed.starts_with(HEADER_PREFIX) {
            result.header = Some(trimmed.trim_start_matches(';').trim().to_string());
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_header_and_assignment_lines() {
        let source = "; Assignments 2024-01-01T00:00:00Z\n\
                       (declare-fun arr () (Array (_ BitVec 32) (_ BitVec 8)))\n\
                       ; { \"arr\": [0, 0, 0, 0, 0, 115, 0, 0] }\n\
                       ; { \"arr\": [0, 0, 0, 0, 0, 0, 0, 0] }\n";
        let parsed = scan(source).unwrap();
        assert_eq!(parsed.header.as_deref(), Some("Assignments 2024-01-01T00:00:00Z"));
        assert_eq!(parsed.assignments.len(), 2);
        assert_eq!(parsed.assignments[0]["arr"], vec![0, 0, 0, 0, 0, 115, 0, 0]);
    }

    #[test]
    fn tolerates_a_source_with_no_assignment_comments() {
        let parsed = scan("(declare-fun x () (_ BitVec 8))\n(assert (= x x))\n").unwrap();
        assert!(parsed.header.is_none());
        assert!(parsed.assignments.is_empty());
    }

    #[test]
    fn rejects_malformed_assignment_json() {
        let err = scan("; { not json }\n").unwrap_err();
        assert!(matches!(err, SmtlibError::MalformedAssignment { line: 1, .. }));
    }
}
