#[derive(thiserror::Error, Debug)]
pub enum IrError {
    #[error("LLVM IR builder failed: {0}")]
    Builder(#[from] inkwell::builder::BuilderError),

    #[error("LLVM intrinsic `{0}` is not available in this LLVM build")]
    MissingIntrinsic(&'static str),

    #[error("LLVM module verification failed: {0}")]
    Verification(String),

    #[error("symbol `{0}` not found while preparing the runtime template")]
    MissingSymbol(String),
}
