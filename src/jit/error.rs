#[derive(thiserror::Error, Debug)]
pub enum JitError {
    #[error(transparent)]
    Smtlib(#[from] crate::smtlib::SmtlibError),

    #[error(transparent)]
    Lower(#[from] crate::lower::LowerError),

    #[error(transparent)]
    Ir(#[from] crate::ir::IrError),

    #[error("failed to create the JIT execution engine: {0}")]
    EngineCreation(String),

    #[error("symbol `{0}` could not be resolved in the JIT execution engine")]
    UnresolvedSymbol(String),

    #[error("failed to read input file {path}: {source}")]
    ReadInput { path: std::path::PathBuf, source: std::io::Error },
}
