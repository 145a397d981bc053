#[derive(thiserror::Error, Debug)]
pub enum SmtlibError {
    #[error("failed to parse SMT-LIB2 source: {0}")]
    Syntax(String),

    #[error("expected a top-level form, found atom `{0}`")]
    TopLevelAtom(String),

    #[error("unsupported array index sort (only `(_ BitVec 32)` is supported): {0}")]
    UnsupportedIndexSort(String),

    #[error("malformed `declare-fun` form: {0}")]
    MalformedDeclareFun(String),

    #[error("malformed `assert` form: {0}")]
    MalformedAssert(String),

    #[error("malformed assignment comment at line {line}: {reason}")]
    MalformedAssignment { line: usize, reason: String },
}
