use std::io::Write;

use smt_jit::jit::{DriverConfig, run_file};

/// S1 from the testable-properties scenarios: one 8-bit-element array
/// indexed by a 32-bit index, asserting the literal `115` at index 5.
const S1_SOURCE: &str = r#"(declare-fun arg00 () (Array (_ BitVec 32) (_ BitVec 8)))
(assert (= (_ bv115 8) (select arg00 (_ bv5 32))))
; { "arg00": [0,0,0,0,0,115,0,0] }
; { "arg00": [0,0,0,0,0,0,0,0] }
"#;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn s1_single_equality_on_an_array() {
    let file = write_temp(S1_SOURCE);
    let report = run_file(file.path(), &DriverConfig::default()).expect("run_file");

    assert_eq!(report.assertion_count, 1);
    assert_eq!(report.array_decl_count, 1);
    assert_eq!(report.outcomes.len(), 2);

    assert!(report.outcomes[0].models, "element 5 == 115 should satisfy the assertion");
    assert!(report.outcomes[0].rejected_reason.is_none());

    assert!(!report.outcomes[1].models, "an all-zero array should not satisfy the assertion");
    assert_eq!(report.outcomes[1].failing_assertion, Some(1));
}

/// JIT round-trip (§8): compiling with and without optimization must
/// produce identical model/no-model outcomes for every assignment.
#[test]
fn optimized_and_unoptimized_runs_agree() {
    let file = write_temp(S1_SOURCE);

    let optimized = run_file(file.path(), &DriverConfig::default()).expect("optimized run");
    let unoptimized =
        run_file(file.path(), &DriverConfig { no_opt: true, ..DriverConfig::default() }).expect("unoptimized run");

    assert_eq!(optimized.outcomes.len(), unoptimized.outcomes.len());
    for (opt, no_opt) in optimized.outcomes.iter().zip(unoptimized.outcomes.iter()) {
        assert_eq!(opt.models, no_opt.models);
        assert_eq!(opt.failing_assertion, no_opt.failing_assertion);
    }
}

#[test]
fn mismatched_assignment_shape_is_reported_without_invoking_native_code() {
    let source = r#"(declare-fun arg00 () (Array (_ BitVec 32) (_ BitVec 8)))
(assert (= (_ bv1 8) (select arg00 (_ bv0 32))))
; { "wrong_name": [1,2,3] }
"#;
    let file = write_temp(source);
    let report = run_file(file.path(), &DriverConfig::default()).expect("run_file");

    assert_eq!(report.outcomes.len(), 1);
    assert!(!report.outcomes[0].models);
    assert!(report.outcomes[0].rejected_reason.is_some());
}
