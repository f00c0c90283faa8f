//! `CallFrame` abstraction over System V AMD64 vs. Microsoft x64: the set of
//! callee-saved registers is identical in both, but argument-register order,
//! the stack-argument area, and the shadow-space requirement differ. All
//! lowering in [`super::compiler`] goes through this type rather than raw
//! register names, so supporting a third ABI would only mean adding a
//! variant here.

use super::reg::Reg;

/// The native function signature the JIT emits, spec §4.4:
/// `fn(inputs, inputLen, registers, registerLen, cng, rng, maxProcessTime) -> u64`.
pub const ARG_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abi {
    SystemV,
    Windows,
}

impl Abi {
    /// The ABI of the host this binary is compiled for. Both variants are
    /// supported by the emitter; only one is ever live in a given build.
    pub fn host() -> Abi {
        if cfg!(target_os = "windows") {
            Abi::Windows
        } else {
            Abi::SystemV
        }
    }

    /// Argument registers, in order, for as many of the 7 arguments as this
    /// ABI passes in registers. The rest are read from the stack.
    pub fn arg_registers(self) -> &'static [Reg] {
        match self {
            Abi::SystemV => &[Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9],
            Abi::Windows => &[Reg::Rcx, Reg::Rdx, Reg::R8, Reg::R9],
        }
    }

    /// Callee-saved registers this function must preserve, pushed in the
    /// prologue and popped (in reverse) in the epilogue. Identical across
    /// both ABIs.
    pub const CALLEE_SAVED: [Reg; 5] = [Reg::Rbx, Reg::R12, Reg::R13, Reg::R14, Reg::R15];

    /// Bytes of "shadow space" the *caller* reserves below its own stack
    /// arguments before a `call`, which a callee on this ABI is entitled to
    /// scribble into. Zero on System V.
    pub fn shadow_space(self) -> i32 {
        match self {
            Abi::SystemV => 0,
            Abi::Windows => 32,
        }
    }

    /// Offset from `rbp` (after the standard `push rbp; mov rbp,rsp; push
    /// <5 callee-saved>` prologue) at which the `index`-th argument beyond
    /// the register-passed ones lives on the incoming stack frame.
    ///
    /// By the time this is read, `rbp` holds the frame pointer set *after*
    /// `push rbp`, so `[rbp+8]` is the return address and `[rbp+16]` is the
    /// first word the *caller* pushed above the call. On System V that word
    /// is already the first stack argument. On Windows the caller's 32-byte
    /// shadow/home space sits directly above its return address — between
    /// it and the actual stack arguments — so the first stack argument
    /// there is at `[rbp+16+32]`, not `[rbp+16]`.
    pub fn stack_arg_offset(self, stack_arg_index: usize) -> i32 {
        16 + self.shadow_space() + (stack_arg_index as i32) * 8
    }

    /// Index of the first argument (0-based, over all 7) that lives on the
    /// stack rather than in a register.
    pub fn first_stack_arg(self) -> usize {
        self.arg_registers().len()
    }
}
