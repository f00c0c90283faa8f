use thiserror::Error;

/// Failure modes for checkpoint I/O (spec §7). Everything inside a
/// generation step — crossover, mutation, selection, fitness — is
/// infallible by construction: strategies operate on plain byte slices and
/// never run out of population to sample from.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error("I/O error reading or writing checkpoint at {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed checkpoint JSON: {0}")]
    JsonFormat(String),

    #[error(transparent)]
    Codec(#[from] gasm_bytecode::CodecError),

    #[error(transparent)]
    Vm(#[from] gasm_vm::VmError),
}
