//! `Individual` (spec §4.5): one evaluable G-assembly program, paired with
//! its register file sizing, fuel budget, and generator callbacks, plus
//! whichever compiled artifact its last `run` produced.

use gasm_bytecode::{parse_program, program_to_text};

use crate::error::VmError;
use crate::interpreter;
use crate::jit::{self, CodeBuffer};

/// A zero-argument, `f64`-returning callback, callable from JITed native
/// code without any captured environment (spec §6: "Bound into the JIT by
/// pointer; must outlive the compiled function"). Plain Rust closures
/// cannot be baked into the single function-pointer slot the JIT's calling
/// convention provides for `cng`/`rng`, so both are ordinary `extern "C"
/// fn() -> f64` — a caller who needs per-run state reaches for an
/// `AtomicU64`-seeded global or a thread-local, the same way a hand-rolled
/// C library callback would.
pub type GeneratorFn = extern "C" fn() -> f64;

/// Default constant generator: a fresh draw from `rand::thread_rng`'s
/// standard uniform distribution. Fitness functions that need a richer
/// constant pool (integers, a fixed pool, …) should supply their own
/// [`GeneratorFn`] via [`Individual::set_cng`].
pub extern "C" fn default_cng() -> f64 {
    rand::random::<f64>()
}

/// Default `rng`: `rand::random::<f64>()`, uniform on `[0, 1)`.
pub extern "C" fn default_rng() -> f64 {
    rand::random::<f64>()
}

pub struct Individual {
    bytecode: Vec<u8>,
    register_length: usize,
    max_process_time: u64,
    cng: GeneratorFn,
    rng: GeneratorFn,
    use_jit: bool,
    compiled: Option<CodeBuffer>,
}

impl Individual {
    /// `register_length` must be `>= 1` (spec §3 invariant); `max_process_time`
    /// defaults to a generous budget a caller will usually override via
    /// [`Individual::set_max_process_time`].
    pub fn new(bytecode: Vec<u8>, register_length: usize) -> Result<Individual, VmError> {
        if register_length == 0 {
            return Err(VmError::InvalidArgument("register_length must be >= 1".into()));
        }
        Ok(Individual {
            bytecode,
            register_length,
            max_process_time: 100_000,
            cng: default_cng,
            rng: default_rng,
            use_jit: true,
            compiled: None,
        })
    }

    pub fn new_from_text(text: &str, register_length: usize) -> Result<Individual, VmError> {
        let bytecode = parse_program(text)?;
        Individual::new(bytecode, register_length)
    }

    /// Dispatches to the JIT if `use_jit` is set and compilation succeeds,
    /// falling back to the interpreter otherwise (including silently on
    /// non-x86-64 hosts, spec §4.4's "Non-goals"). Resets `registers` to
    /// zero on every call (spec §4.5).
    pub fn run(&mut self, inputs: &mut [f64]) -> Result<u64, VmError> {
        if inputs.is_empty() {
            return Err(VmError::InvalidArgument("inputs must be non-empty".into()));
        }
        let mut registers = vec![0.0f64; self.register_length];

        if self.use_jit {
            if self.compiled.is_none() {
                self.compiled = jit::compile(&self.bytecode).ok();
            }
            if let Some(buffer) = &self.compiled {
                let entry = buffer.entry_point();
                let process_time = unsafe {
                    entry(
                        inputs.as_mut_ptr(),
                        inputs.len() as u64,
                        registers.as_mut_ptr(),
                        registers.len() as u64,
                        self.cng as *const (),
                        self.rng as *const (),
                        self.max_process_time,
                    )
                };
                return Ok(process_time);
            }
        }

        let mut cng = self.cng;
        let mut rng = self.rng;
        interpreter::run(&self.bytecode, inputs, &mut registers, self.max_process_time, &mut cng, &mut rng)
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Replaces the bytecode body, discarding any compiled artifact (spec
    /// §3: "resetting the bytecode invalidates and discards it").
    pub fn set_bytecode(&mut self, bytecode: Vec<u8>) {
        self.bytecode = bytecode;
        self.compiled = None;
    }

    pub fn register_length(&self) -> usize {
        self.register_length
    }

    /// Zeroes and resizes the register file for subsequent runs; does not
    /// itself invalidate compiled code (the register base pointer and
    /// length are passed fresh on every call).
    pub fn set_register_length(&mut self, register_length: usize) -> Result<(), VmError> {
        if register_length == 0 {
            return Err(VmError::InvalidArgument("register_length must be >= 1".into()));
        }
        self.register_length = register_length;
        Ok(())
    }

    pub fn max_process_time(&self) -> u64 {
        self.max_process_time
    }

    pub fn set_max_process_time(&mut self, max_process_time: u64) {
        self.max_process_time = max_process_time;
    }

    pub fn use_jit(&self) -> bool {
        self.use_jit
    }

    pub fn set_use_jit(&mut self, use_jit: bool) {
        self.use_jit = use_jit;
    }

    pub fn cng(&self) -> GeneratorFn {
        self.cng
    }

    /// Changing `cng` invalidates the compiled artifact: its address was
    /// baked into the native code on the previous compile (spec §4.5, §9).
    pub fn set_cng(&mut self, cng: GeneratorFn) {
        self.cng = cng;
        self.compiled = None;
    }

    pub fn rng(&self) -> GeneratorFn {
        self.rng
    }

    pub fn set_rng(&mut self, rng: GeneratorFn) {
        self.rng = rng;
        self.compiled = None;
    }

    pub fn to_string(&self) -> String {
        program_to_text(&self.bytecode)
    }
}

impl Clone for Individual {
    /// Deep-copies the bytecode but never the compiled artifact — the next
    /// `run` recompiles (spec §4.4's executable-memory ownership note: a
    /// native pointer must never outlive the buffer that produced it, and
    /// buffers are never shared between `Individual`s).
    fn clone(&self) -> Individual {
        Individual {
            bytecode: self.bytecode.clone(),
            register_length: self.register_length,
            max_process_time: self.max_process_time,
            cng: self.cng,
            rng: self.rng,
            use_jit: self.use_jit,
            compiled: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jit_and_interpreter_agree_on_fibonacci() {
        let text = "MOV R, A\nINC\nMOV A, P\nMOV R, A\nLOP A\nDEC\nMOV A, R\nINC\nADD R\nINC\nMOV R, A\nMOV A, P\nEND\nMOV A, R\nMOV I, A\n";

        let mut jit_individual = Individual::new_from_text(text, 2).unwrap();
        jit_individual.set_use_jit(true);
        jit_individual.set_max_process_time(100_000);
        let mut jit_inputs = [10.0];
        jit_individual.run(&mut jit_inputs).unwrap();

        let mut interpreted = Individual::new_from_text(text, 2).unwrap();
        interpreted.set_use_jit(false);
        interpreted.set_max_process_time(100_000);
        let mut interpreted_inputs = [10.0];
        interpreted.run(&mut interpreted_inputs).unwrap();

        assert_eq!(jit_inputs[0], interpreted_inputs[0]);
        assert_eq!(jit_inputs[0], 55.0);
    }

    #[test]
    fn empty_inputs_is_invalid_argument() {
        let mut individual = Individual::new(vec![0x30], 1).unwrap();
        let mut inputs: [f64; 0] = [];
        assert!(individual.run(&mut inputs).is_err());
    }

    #[test]
    fn setting_register_length_rejects_zero() {
        let mut individual = Individual::new(vec![], 1).unwrap();
        assert!(individual.set_register_length(0).is_err());
    }

    #[test]
    fn clone_invalidates_compiled_artifact() {
        let mut individual = Individual::new(vec![0x30], 1).unwrap();
        let mut inputs = [1.0];
        individual.run(&mut inputs).unwrap();
        let cloned = individual.clone();
        assert_eq!(cloned.bytecode(), individual.bytecode());
    }
}
