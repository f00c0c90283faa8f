//! The x86-64 JIT backend (spec §4.4): a minimal assembler ([`asm`]), the
//! `CallFrame` ABI abstraction ([`abi`]), executable-memory ownership
//! ([`buffer`]), and the single-pass lowering itself ([`compiler`]).
//!
//! Only `compile` and [`CompiledFn`]/[`CodeBuffer`] are meant to be used
//! from outside this module; everything else is an implementation detail of
//! the lowering pass.

pub mod abi;
pub mod asm;
pub mod buffer;
mod compiler;
pub mod reg;

pub use buffer::{CodeBuffer, CompiledFn};

use crate::error::VmError;

/// Compiles `bytecode` into a fresh, executable [`CodeBuffer`]. Returns
/// [`VmError::UnsupportedArchitecture`] on hosts with no JIT backend (spec:
/// x86-64 only; everything else is expected to fall back to the
/// interpreter, which `Individual::run` does transparently).
#[cfg(target_arch = "x86_64")]
pub fn compile(bytecode: &[u8]) -> Result<CodeBuffer, VmError> {
    compiler::Compiler::compile(bytecode)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn compile(_bytecode: &[u8]) -> Result<CodeBuffer, VmError> {
    Err(VmError::UnsupportedArchitecture)
}
