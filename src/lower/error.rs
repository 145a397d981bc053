#[derive(thiserror::Error, Debug)]
pub enum LowerError {
    #[error("LLVM IR builder failed: {0}")]
    Builder(#[from] inkwell::builder::BuilderError),

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("reference to undeclared array `{0}`")]
    UndeclaredArray(String),

    #[error("reference to unbound let-variable `{0}`")]
    UnboundLetVariable(String),

    #[error("malformed expression: {0}")]
    Malformed(String),

    #[error("expected a bit-vector value but found an array pointer or scalar")]
    ExpectedBitvector,

    #[error("expected an array pointer but found a bit-vector or scalar")]
    ExpectedArray,

    #[error("expected a scalar i32 value but found a bit-vector or array pointer")]
    ExpectedScalar,

    #[error("expected an integer literal but found: {0}")]
    ExpectedInteger(String),
}
