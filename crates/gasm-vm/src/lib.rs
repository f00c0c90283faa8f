//! Reference interpreter and x86-64 JIT for G-assembly bytecode (spec
//! §4.3-§4.5): a straight-line stack-machine execution model, a one-pass
//! native-code lowering of the same semantics, and `Individual`, which
//! picks between them per-run.
#![warn(rust_2018_idioms)]

mod error;
mod individual;
pub mod interpreter;
pub mod jit;

pub use error::VmError;
pub use individual::{default_cng, default_rng, GeneratorFn, Individual};
