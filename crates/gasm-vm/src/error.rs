use thiserror::Error;

/// Failure modes for interpretation, JIT compilation, and `Individual`
/// configuration. Arithmetic (division by zero, NaN propagation) and fuel
/// exhaustion are *not* represented here — spec §7 treats both as normal,
/// observable outcomes rather than errors.
#[derive(Debug, Error)]
pub enum VmError {
    /// `inputs` or `registers` was empty, or no bytecode was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Codec(#[from] gasm_bytecode::CodecError),

    /// The host architecture has no JIT backend (spec: JIT is x86-64 only;
    /// everything else falls back to the interpreter). Only surfaced if the
    /// caller explicitly demands JIT execution via a hard API, not through
    /// `Individual::run`, which falls back silently.
    #[error("JIT compilation is not supported on this target architecture")]
    UnsupportedArchitecture,
}
