//! Single-pass x86-64 lowering from G-assembly bytecode to a callable native
//! function (spec §4.4). One [`Compiler::compile`] call walks the bytecode
//! exactly once, emitting machine code as it goes; structural openers push a
//! frame onto a compile-time stack and their matching `END` — real or
//! synthesized at end-of-program — pops it and emits the backward branch or
//! no-op the opener kind calls for.
//!
//! The emitted function's signature is [`super::buffer::CompiledFn`]:
//! `fn(inputs, inputLen, registers, registerLen, cng, rng, maxProcessTime) ->
//! u64`, matching the interpreter in [`crate::interpreter`] bit-for-bit
//! modulo `sin`/`cos`/`exp` floating point slop (spec §8 property 2).

use gasm_bytecode::Opcode;

use super::abi::{Abi, ARG_COUNT};
use super::asm::{Assembler, Cond, Label};
use super::buffer::CodeBuffer;
use super::reg::{Reg, Xmm};
use crate::error::VmError;

extern "C" {
    fn sin(x: f64) -> f64;
    fn cos(x: f64) -> f64;
    fn exp(x: f64) -> f64;
}

// Frame-local slot offsets, relative to `rbp`. `rbp-8..rbp-40` are already
// spoken for by the prologue's five callee-saved pushes (`rbx, r12, r13,
// r14, r15`); the 96-byte fixed frame reserved by `sub rsp, 96` begins at
// `rbp-48` and holds these seven 8-byte slots, with 40 bytes of trailing
// alignment padding unused below them (spec §4.4's "Supplemental detail").
const INPUT_LEN_SLOT: i32 = -48;
const REGISTER_LEN_SLOT: i32 = -56;
const CNG_SLOT: i32 = -64;
const RNG_SLOT: i32 = -72;
const PROCESS_TIME_SLOT: i32 = -80;
const MAX_PROCESS_TIME_SLOT: i32 = -88;
const DYN_STACK_HEIGHT_SLOT: i32 = -96;

const FIXED_FRAME_SIZE: i8 = 96;

/// One open structural block, tracked from the opener opcode until its
/// matching `END` (real or synthesized).
struct OpenFrame {
    opener: Opcode,
    /// `FOR`/`LOP_A`/`LOP_P`: the body's first instruction, the back-branch
    /// target. `JMP_*`: unused.
    start_label: Label,
    /// `LOP_A`/`LOP_P`: where the guard test + back-branch live.
    /// `JMP_*`: where the forward skip lands. `FOR`: unused.
    end_label: Label,
}

pub struct Compiler {
    asm: Assembler,
    abi: Abi,
    frames: Vec<OpenFrame>,
    /// Lexical `FOR`-nesting depth at the current compile position. Because
    /// this VM has no recursion, the number of live `push rbx` saves on the
    /// real machine stack at any reachable program point equals this
    /// compile-time count — it drives the call-site stack-parity padding
    /// described in spec §4.4.
    open_for_depth: i32,
    end_program: Label,
}

impl Compiler {
    /// Lowers `bytecode` into a freshly mapped, executable code buffer.
    pub fn compile(bytecode: &[u8]) -> Result<CodeBuffer, VmError> {
        let mut asm = Assembler::new();
        let end_program = asm.new_label();
        let mut compiler = Compiler { asm, abi: Abi::host(), frames: Vec::new(), open_for_depth: 0, end_program };

        compiler.emit_prologue();
        for &byte in bytecode {
            match Opcode::from_byte(byte) {
                Some(op) => compiler.lower_opcode(op),
                // Undefined opcode: tolerated no-op (spec §7), still fuels below.
                None => {}
            }
            compiler.emit_fuel_check();
        }
        // Unmatched openers at end of program: synthesize their closers.
        while let Some(frame) = compiler.frames.pop() {
            compiler.lower_end(frame);
        }
        compiler.asm.bind_label(compiler.end_program);
        compiler.emit_epilogue();

        let code = compiler.asm.into_bytes();
        CodeBuffer::allocate(&code)
    }

    // --- prologue / epilogue / fuel -----------------------------------------

    fn emit_prologue(&mut self) {
        let asm = &mut self.asm;
        asm.push(Reg::Rbp);
        asm.mov_rr(Reg::Rbp, Reg::Rsp);
        asm.push(Reg::Rbx);
        asm.push(Reg::R12);
        asm.push(Reg::R13);
        asm.push(Reg::R14);
        asm.push(Reg::R15);
        asm.sub_ri8(Reg::Rsp, FIXED_FRAME_SIZE);

        let regs = self.abi.arg_registers();
        // arg0: inputs base pointer -> r14.
        asm.mov_rr(Reg::R14, regs[0]);
        // arg1: inputLen -> slot.
        asm.mov_rbp_r(INPUT_LEN_SLOT, regs[1]);
        // arg2: registers base pointer -> r15.
        asm.mov_rr(Reg::R15, regs[2]);
        // arg3: registerLen -> slot.
        asm.mov_rbp_r(REGISTER_LEN_SLOT, regs[3]);
        if regs.len() > 4 {
            asm.mov_rbp_r(CNG_SLOT, regs[4]);
        }
        if regs.len() > 5 {
            asm.mov_rbp_r(RNG_SLOT, regs[5]);
        }

        // Remaining arguments (cng/rng on Windows, maxProcessTime on both
        // ABIs) are read off the caller's outgoing stack frame.
        for i in self.abi.first_stack_arg()..ARG_COUNT {
            let stack_index = i - self.abi.first_stack_arg();
            let offset = self.abi.stack_arg_offset(stack_index);
            asm.mov_r_rbp(Reg::Rax, offset);
            let dest = match i {
                4 => CNG_SLOT,
                5 => RNG_SLOT,
                6 => MAX_PROCESS_TIME_SLOT,
                _ => unreachable!("ARG_COUNT is 7"),
            };
            asm.mov_rbp_r(dest, Reg::Rax);
        }

        // Zero P, PI, PR, processTime, dynamic-stack-height, and A.
        asm.xor_rr(Reg::Rbx, Reg::Rbx);
        asm.xor_rr(Reg::R12, Reg::R12);
        asm.xor_rr(Reg::R13, Reg::R13);
        asm.pxor(Xmm::XMM0, Xmm::XMM0);
        asm.xor_rr(Reg::Rax, Reg::Rax);
        asm.mov_rbp_r(PROCESS_TIME_SLOT, Reg::Rax);
        asm.mov_rbp_r(DYN_STACK_HEIGHT_SLOT, Reg::Rax);
    }

    /// Unwinds any `FOR` pushes still live when execution reached
    /// `endProgram` (possible whenever fuel ran out mid-loop), tears down
    /// the fixed frame, restores callee-saved registers, and returns
    /// `processTime` in `rax`.
    fn emit_epilogue(&mut self) {
        let asm = &mut self.asm;
        asm.mov_r_rbp(Reg::Rcx, DYN_STACK_HEIGHT_SLOT);
        asm.shl_ri8(Reg::Rcx, 3);
        asm.add_rr(Reg::Rsp, Reg::Rcx);
        asm.add_ri8(Reg::Rsp, FIXED_FRAME_SIZE);
        asm.mov_r_rbp(Reg::Rax, PROCESS_TIME_SLOT);
        asm.pop(Reg::R15);
        asm.pop(Reg::R14);
        asm.pop(Reg::R13);
        asm.pop(Reg::R12);
        asm.pop(Reg::Rbx);
        asm.pop(Reg::Rbp);
        asm.ret();
    }

    /// Emitted after every opcode's body (real or no-op): `processTime += 1;
    /// if processTime > maxProcessTime: goto endProgram`. This is spec
    /// §9 Open Question 1's resolution — exactly once per opcode body,
    /// never only on loop back-edges.
    fn emit_fuel_check(&mut self) {
        let asm = &mut self.asm;
        asm.mov_r_rbp(Reg::Rax, PROCESS_TIME_SLOT);
        asm.add_ri8(Reg::Rax, 1);
        asm.mov_rbp_r(PROCESS_TIME_SLOT, Reg::Rax);
        asm.cmp_r_rbp(Reg::Rax, MAX_PROCESS_TIME_SLOT);
        asm.jcc(Cond::Above, self.end_program);
    }

    // --- per-opcode lowering -------------------------------------------------

    fn lower_opcode(&mut self, op: Opcode) {
        match op {
            Opcode::MovPA => self.lower_mov_p_a(),
            Opcode::MovAP => self.lower_mov_a_p(),
            Opcode::MovAR => self.asm.movsd_load(Xmm::XMM0, Reg::R15, Reg::R13),
            Opcode::MovAI => self.asm.movsd_load(Xmm::XMM0, Reg::R14, Reg::R12),
            Opcode::MovRA => self.asm.movsd_store(Reg::R15, Reg::R13, Xmm::XMM0),
            Opcode::MovIA => self.asm.movsd_store(Reg::R14, Reg::R12, Xmm::XMM0),

            Opcode::AddR => self.asm.addsd_mem(Xmm::XMM0, Reg::R15, Reg::R13),
            Opcode::SubR => self.asm.subsd_mem(Xmm::XMM0, Reg::R15, Reg::R13),
            Opcode::DivR => self.asm.divsd_mem(Xmm::XMM0, Reg::R15, Reg::R13),
            Opcode::MulR => self.asm.mulsd_mem(Xmm::XMM0, Reg::R15, Reg::R13),
            Opcode::SinR => self.lower_transcendental(Reg::R15, Reg::R13, sin as usize),
            Opcode::CosR => self.lower_transcendental(Reg::R15, Reg::R13, cos as usize),
            Opcode::ExpR => self.lower_transcendental(Reg::R15, Reg::R13, exp as usize),

            Opcode::AddI => self.asm.addsd_mem(Xmm::XMM0, Reg::R14, Reg::R12),
            Opcode::SubI => self.asm.subsd_mem(Xmm::XMM0, Reg::R14, Reg::R12),
            Opcode::DivI => self.asm.divsd_mem(Xmm::XMM0, Reg::R14, Reg::R12),
            Opcode::MulI => self.asm.mulsd_mem(Xmm::XMM0, Reg::R14, Reg::R12),
            Opcode::SinI => self.lower_transcendental(Reg::R14, Reg::R12, sin as usize),
            Opcode::CosI => self.lower_transcendental(Reg::R14, Reg::R12, cos as usize),
            Opcode::ExpI => self.lower_transcendental(Reg::R14, Reg::R12, exp as usize),

            Opcode::Inc => {
                self.asm.add_ri8(Reg::Rbx, 1);
                self.update_index_inc(Reg::R12, INPUT_LEN_SLOT);
                self.update_index_inc(Reg::R13, REGISTER_LEN_SLOT);
            }
            Opcode::Dec => {
                self.asm.sub_ri8(Reg::Rbx, 1);
                self.update_index_dec(Reg::R12, INPUT_LEN_SLOT);
                self.update_index_dec(Reg::R13, REGISTER_LEN_SLOT);
            }
            Opcode::Res => {
                self.asm.xor_rr(Reg::Rbx, Reg::Rbx);
                self.asm.xor_rr(Reg::R12, Reg::R12);
                self.asm.xor_rr(Reg::R13, Reg::R13);
            }
            Opcode::Set => self.lower_callback(CNG_SLOT),
            Opcode::Rng => self.lower_callback(RNG_SLOT),

            Opcode::For => self.lower_for_open(),
            Opcode::LopA => self.lower_lop_open(Opcode::LopA),
            Opcode::LopP => self.lower_lop_open(Opcode::LopP),

            Opcode::JmpI => self.lower_jmp_open(Opcode::JmpI),
            Opcode::JmpR => self.lower_jmp_open(Opcode::JmpR),
            Opcode::JmpP => self.lower_jmp_open(Opcode::JmpP),

            Opcode::End => {
                if let Some(frame) = self.frames.pop() {
                    self.lower_end(frame);
                }
                // Empty stack: no-op (spec §4.3/§4.4).
            }
        }
    }

    /// `MOV P,A`: truncate `A` toward zero into `P`, then recompute both
    /// cached modular indices from scratch (an arbitrary jump, unlike the
    /// `INC`/`DEC` ±1 case, can move `P` by any amount).
    fn lower_mov_p_a(&mut self) {
        self.asm.cvttsd2si(Reg::Rbx, Xmm::XMM0);
        self.fixup_truncation_sentinel();
        self.recompute_both_indices();
    }

    /// `cvttsd2si` returns the "integer indefinite" (`i64::MIN`) for a NaN or
    /// out-of-range `A`, but the interpreter's `a as i64` saturates instead:
    /// NaN to `0`, too-large-positive to `i64::MAX`. (Too-large-negative
    /// already lands on `i64::MIN` by saturation too, the same bit pattern
    /// `cvttsd2si` produced, so that case needs no fixup.) `A` reaches these
    /// ranges through ordinary repeated multiplies, not just constructed
    /// edge cases, so this has to match or the JIT and interpreter diverge.
    fn fixup_truncation_sentinel(&mut self) {
        let not_sentinel = self.asm.new_label();
        let nan_case = self.asm.new_label();
        let positive_overflow = self.asm.new_label();

        self.asm.mov_ri64(Reg::Rax, i64::MIN);
        self.asm.cmp_rr(Reg::Rbx, Reg::Rax);
        self.asm.jcc(Cond::NotEqual, not_sentinel);

        self.asm.comisd_rr(Xmm::XMM0, Xmm::XMM0); // unordered (PF=1) iff A is NaN
        self.asm.jcc(Cond::Parity, nan_case);
        self.asm.pxor(Xmm::XMM1, Xmm::XMM1);
        self.asm.comisd_rr(Xmm::XMM0, Xmm::XMM1);
        self.asm.jcc(Cond::Above, positive_overflow); // A > 0: overflowed high
        self.asm.jmp(not_sentinel); // A <= 0: rbx already holds the right answer

        self.asm.bind_label(nan_case);
        self.asm.xor_rr(Reg::Rbx, Reg::Rbx);
        self.asm.jmp(not_sentinel);

        self.asm.bind_label(positive_overflow);
        self.asm.mov_ri64(Reg::Rbx, i64::MAX);

        self.asm.bind_label(not_sentinel);
    }

    /// `MOV A,P`: `P` is already maintained as a genuine signed 64-bit value
    /// (spec §3: "signed ... for conversion to A"), so a direct signed
    /// `cvtsi2sd` is exactly the interpreter's `p as f64` — no unsigned
    /// reinterpretation is needed here.
    fn lower_mov_a_p(&mut self) {
        self.asm.cvtsi2sd(Xmm::XMM0, Reg::Rbx);
    }

    /// `tmp := idx + 1; if tmp == len: tmp := 0` via `cmp`+`cmove`, no
    /// division — the wraparound idiom from spec §4.4.
    fn update_index_inc(&mut self, idx: Reg, len_slot: i32) {
        let asm = &mut self.asm;
        asm.mov_rr(Reg::Rax, idx);
        asm.add_ri8(Reg::Rax, 1);
        asm.cmp_r_rbp(Reg::Rax, len_slot);
        asm.xor_rr(Reg::Rcx, Reg::Rcx);
        asm.cmov(Cond::Equal, Reg::Rax, Reg::Rcx);
        asm.mov_rr(idx, Reg::Rax);
    }

    /// `tmp := idx - 1; if idx was 0 (borrow): tmp := len - 1` via `sub`+
    /// `cmovb`, the same no-division idiom in the other direction.
    fn update_index_dec(&mut self, idx: Reg, len_slot: i32) {
        let asm = &mut self.asm;
        asm.mov_r_rbp(Reg::Rax, len_slot);
        asm.sub_ri8(Reg::Rax, 1); // rax = len - 1
        asm.mov_rr(Reg::Rcx, idx);
        asm.sub_ri8(Reg::Rcx, 1); // sets CF iff idx was 0
        asm.cmov(Cond::Below, Reg::Rcx, Reg::Rax);
        asm.mov_rr(idx, Reg::Rcx);
    }

    /// Recomputes `PI = P mod inputLen` and `PR = P mod registerLen` from an
    /// arbitrary (possibly negative) `P` in `rbx`, using signed division
    /// plus a sign correction — the "sign fix" spec §4.4 calls for, since a
    /// bare unsigned divide cannot be applied to a negative dividend
    /// directly. Matches [`crate::interpreter`]'s `modulo_index`.
    fn recompute_both_indices(&mut self) {
        self.recompute_one_index(Reg::R12, INPUT_LEN_SLOT);
        self.recompute_one_index(Reg::R13, REGISTER_LEN_SLOT);
    }

    fn recompute_one_index(&mut self, idx: Reg, len_slot: i32) {
        let asm = &mut self.asm;
        asm.mov_rr(Reg::Rax, Reg::Rbx);
        asm.cqo();
        asm.mov_r_rbp(Reg::Rcx, len_slot);
        asm.idiv_r(Reg::Rcx); // rdx := P rem len (signed, same sign as P or zero)
        asm.mov_rr(idx, Reg::Rdx);
        asm.add_rr(Reg::Rdx, Reg::Rcx); // candidate if remainder was negative
        asm.cmp_ri32(idx, 0);
        asm.cmov(Cond::Less, idx, Reg::Rdx);
    }

    /// Transcendentals (`SIN`/`COS`/`EXP`) load their memory operand into
    /// `xmm0` — overwriting `A`, which the call result immediately replaces
    /// anyway — then call the process's own `libm` symbol.
    fn lower_transcendental(&mut self, base: Reg, index: Reg, symbol_addr: usize) {
        self.asm.movsd_load(Xmm::XMM0, base, index);
        self.emit_call_immediate(symbol_addr as i64);
    }

    /// `SET`/`RNG`: call the caller-supplied zero-argument callback whose
    /// pointer lives in a frame slot (baked per-compile by `Individual`,
    /// spec §9's "pointer-baked JIT callbacks" note — invalidated whenever
    /// `cng`/`rng` changes since the slot is reloaded from the *current*
    /// argument on every call, not hardcoded here).
    fn lower_callback(&mut self, slot: i32) {
        let pad = self.call_padding();
        if pad > 0 {
            self.asm.sub_ri8(Reg::Rsp, pad);
        }
        self.asm.mov_r_rbp(Reg::Rax, slot);
        self.asm.call_reg(Reg::Rax);
        if pad > 0 {
            self.asm.add_ri8(Reg::Rsp, pad);
        }
    }

    fn emit_call_immediate(&mut self, addr: i64) {
        let pad = self.call_padding();
        if pad > 0 {
            self.asm.sub_ri8(Reg::Rsp, pad);
        }
        self.asm.mov_ri64(Reg::Rax, addr);
        self.asm.call_reg(Reg::Rax);
        if pad > 0 {
            self.asm.add_ri8(Reg::Rsp, pad);
        }
    }

    /// Bytes of padding needed immediately before a `call` so that `rsp` is
    /// 16-byte aligned at the instruction itself, given the compile-time
    /// `FOR`-nesting depth (each open `FOR` contributes one live 8-byte
    /// `push rbx`) plus the ABI's shadow-space requirement. At zero nesting
    /// depth, the prologue leaves `rsp` 8 bytes short of 16-alignment (one
    /// `push rbp` plus five callee-saved pushes is an odd count of 8-byte
    /// pushes against the 8-mod-16 entry state), so padding is needed at
    /// *even* depths and not at odd ones.
    fn call_padding(&self) -> i8 {
        let parity_pad: i8 = if self.open_for_depth % 2 == 0 { 8 } else { 0 };
        parity_pad + self.abi.shadow_space() as i8
    }

    // --- structural openers / END -------------------------------------------

    fn lower_for_open(&mut self) {
        let asm = &mut self.asm;
        asm.push(Reg::Rbx);
        asm.mov_r_rbp(Reg::Rax, DYN_STACK_HEIGHT_SLOT);
        asm.add_ri8(Reg::Rax, 1);
        asm.mov_rbp_r(DYN_STACK_HEIGHT_SLOT, Reg::Rax);
        asm.xor_rr(Reg::Rbx, Reg::Rbx);
        asm.xor_rr(Reg::R12, Reg::R12);
        asm.xor_rr(Reg::R13, Reg::R13);

        let start_label = asm.new_label();
        asm.bind_label(start_label);
        let end_label = asm.new_label(); // unused (FOR never forward-skips)
        self.frames.push(OpenFrame { opener: Opcode::For, start_label, end_label });
        self.open_for_depth += 1;
    }

    /// `LOP_A`/`LOP_P`: jump straight to the guard test before ever running
    /// the body once (while-loop semantics, vs. `FOR`'s run-at-least-once).
    fn lower_lop_open(&mut self, opener: Opcode) {
        let asm = &mut self.asm;
        let end_label = asm.new_label();
        asm.jmp(end_label);
        let start_label = asm.new_label();
        asm.bind_label(start_label);
        self.frames.push(OpenFrame { opener, start_label, end_label });
    }

    /// `JMP_I`/`JMP_R`/`JMP_P`: evaluate the skip guard immediately and jump
    /// forward over the body when it holds.
    fn lower_jmp_open(&mut self, opener: Opcode) {
        let end_label = self.asm.new_label();
        match opener {
            Opcode::JmpI => {
                self.asm.comisd_mem(Xmm::XMM0, Reg::R14, Reg::R12);
                self.asm.jcc(Cond::AboveEqual, end_label);
            }
            Opcode::JmpR => {
                self.asm.comisd_mem(Xmm::XMM0, Reg::R15, Reg::R13);
                self.asm.jcc(Cond::AboveEqual, end_label);
            }
            Opcode::JmpP => {
                self.asm.cvtsi2sd(Xmm::XMM1, Reg::Rbx);
                self.asm.comisd_rr(Xmm::XMM1, Xmm::XMM0);
                self.asm.jcc(Cond::AboveEqual, end_label);
            }
            _ => unreachable!("lower_jmp_open only called for the JMP_* group"),
        }
        // start_label is unused for the IF family; reuse end_label as a
        // placeholder so `OpenFrame` stays uniform across opener kinds.
        self.frames.push(OpenFrame { opener, start_label: end_label, end_label });
    }

    fn lower_end(&mut self, frame: OpenFrame) {
        match frame.opener {
            Opcode::For => {
                self.asm.add_ri8(Reg::Rbx, 1);
                self.update_index_inc(Reg::R12, INPUT_LEN_SLOT);
                self.update_index_inc(Reg::R13, REGISTER_LEN_SLOT);
                self.asm.cmp_r_rbp(Reg::Rbx, INPUT_LEN_SLOT);
                // Unsigned, matching the interpreter's `(p as usize) < input_len`:
                // a P driven negative inside the body must read as "huge", not
                // "less than", so the loop exits rather than spinning.
                self.asm.jcc(Cond::Below, frame.start_label);
                // Loop exits: restore the enclosing P and recompute caches.
                self.asm.pop(Reg::Rbx);
                self.asm.mov_r_rbp(Reg::Rax, DYN_STACK_HEIGHT_SLOT);
                self.asm.sub_ri8(Reg::Rax, 1);
                self.asm.mov_rbp_r(DYN_STACK_HEIGHT_SLOT, Reg::Rax);
                self.recompute_both_indices();
                self.open_for_depth -= 1;
            }
            Opcode::LopA => {
                self.asm.bind_label(frame.end_label);
                self.asm.comisd_mem(Xmm::XMM0, Reg::R14, Reg::R12);
                self.asm.jcc(Cond::Below, frame.start_label);
            }
            Opcode::LopP => {
                self.asm.bind_label(frame.end_label);
                self.asm.cmp_r_rbp(Reg::Rbx, INPUT_LEN_SLOT);
                // Unsigned — see the matching comment on the FOR guard above.
                self.asm.jcc(Cond::Below, frame.start_label);
            }
            Opcode::JmpI | Opcode::JmpR | Opcode::JmpP => {
                self.asm.bind_label(frame.end_label);
            }
            _ => unreachable!("only structural openers are ever pushed as frames"),
        }
    }
}
