//! Straight-line stack-machine reference execution (spec §4.3). Authoritative:
//! the JIT is specified to be observationally equivalent to this, modulo
//! IEEE-754 slop in `sin`/`cos`/`exp`.

use gasm_bytecode::Opcode;

use crate::error::VmError;

/// A control-stack frame for one open structural block.
#[derive(Debug, Clone, Copy)]
struct Frame {
    opener: Opcode,
    /// Bytecode index of the opener itself; `END` back-branches here.
    return_site: usize,
    /// `P` snapshot taken on `FOR` entry (unused by `LOP_A`/`LOP_P`).
    p_snapshot: i64,
}

/// Reduces a signed program pointer to a valid index into an array of the
/// given length. `len` is always `>= 1` (checked at the call sites that
/// construct an interpreter run), so this is always well-defined.
fn modulo_index(p: i64, len: usize) -> usize {
    let len = len as i64;
    (((p % len) + len) % len) as usize
}

/// Runs `bytecode` to completion or fuel exhaustion, mutating `inputs` and
/// `registers` in place. Returns the final `processTime`.
///
/// `registers` is zeroed before execution starts, matching
/// `Individual::run`'s per-call reset (spec §4.5).
#[allow(clippy::too_many_arguments)]
pub fn run(
    bytecode: &[u8],
    inputs: &mut [f64],
    registers: &mut [f64],
    max_process_time: u64,
    cng: &mut dyn FnMut() -> f64,
    rng: &mut dyn FnMut() -> f64,
) -> Result<u64, VmError> {
    if inputs.is_empty() {
        return Err(VmError::InvalidArgument("inputs must be non-empty".into()));
    }
    if registers.is_empty() {
        return Err(VmError::InvalidArgument("registers must be non-empty".into()));
    }
    for r in registers.iter_mut() {
        *r = 0.0;
    }

    let input_len = inputs.len();
    let register_len = registers.len();

    let mut a: f64 = 0.0;
    let mut p: i64 = 0;
    let mut process_time: u64 = 0;
    let mut stack: Vec<Frame> = Vec::new();
    let mut pc: usize = 0;

    while pc < bytecode.len() {
        let mut skip_to_end = false;
        let mut next_pc = pc + 1;

        match Opcode::from_byte(bytecode[pc]) {
            Some(Opcode::MovPA) => p = a as i64,
            Some(Opcode::MovAP) => a = p as f64,
            Some(Opcode::MovAR) => a = registers[modulo_index(p, register_len)],
            Some(Opcode::MovAI) => a = inputs[modulo_index(p, input_len)],
            Some(Opcode::MovRA) => registers[modulo_index(p, register_len)] = a,
            Some(Opcode::MovIA) => inputs[modulo_index(p, input_len)] = a,

            Some(Opcode::AddR) => a += registers[modulo_index(p, register_len)],
            Some(Opcode::SubR) => a -= registers[modulo_index(p, register_len)],
            Some(Opcode::DivR) => a /= registers[modulo_index(p, register_len)],
            Some(Opcode::MulR) => a *= registers[modulo_index(p, register_len)],
            Some(Opcode::SinR) => a = registers[modulo_index(p, register_len)].sin(),
            Some(Opcode::CosR) => a = registers[modulo_index(p, register_len)].cos(),
            Some(Opcode::ExpR) => a = registers[modulo_index(p, register_len)].exp(),

            Some(Opcode::AddI) => a += inputs[modulo_index(p, input_len)],
            Some(Opcode::SubI) => a -= inputs[modulo_index(p, input_len)],
            Some(Opcode::DivI) => a /= inputs[modulo_index(p, input_len)],
            Some(Opcode::MulI) => a *= inputs[modulo_index(p, input_len)],
            Some(Opcode::SinI) => a = inputs[modulo_index(p, input_len)].sin(),
            Some(Opcode::CosI) => a = inputs[modulo_index(p, input_len)].cos(),
            Some(Opcode::ExpI) => a = inputs[modulo_index(p, input_len)].exp(),

            Some(Opcode::Inc) => p += 1,
            Some(Opcode::Dec) => p -= 1,
            Some(Opcode::Res) => p = 0,
            Some(Opcode::Set) => a = cng(),

            Some(Opcode::For) => {
                // `return_site` is the body's first instruction (`pc + 1`),
                // not the `FOR` itself: the back-branch at `END` must land on
                // the body, never re-execute `FOR` (which would re-push this
                // same frame and reset `P` to 0 every iteration). `p_snapshot`
                // captures the enclosing `P` so `END` can restore it on exit,
                // mirroring the JIT's `push rbx` / `pop rbx` pair.
                stack.push(Frame { opener: Opcode::For, return_site: pc + 1, p_snapshot: p });
                p = 0;
            }
            Some(Opcode::LopA) => {
                if a < inputs[modulo_index(p, input_len)] {
                    stack.push(Frame { opener: Opcode::LopA, return_site: pc + 1, p_snapshot: 0 });
                } else {
                    skip_to_end = true;
                }
            }
            Some(Opcode::LopP) => {
                if (p as usize) < input_len {
                    stack.push(Frame { opener: Opcode::LopP, return_site: pc + 1, p_snapshot: 0 });
                } else {
                    skip_to_end = true;
                }
            }

            // `JMP_*` always pushes a frame, whether or not the guard fires:
            // its matching `END` must pop exactly this frame ("for any
            // JMP_*, simply pop", spec §4.3), never an enclosing FOR/LOP_*
            // frame that happens to be on top.
            Some(Opcode::JmpI) => {
                stack.push(Frame { opener: Opcode::JmpI, return_site: pc + 1, p_snapshot: 0 });
                if a >= inputs[modulo_index(p, input_len)] {
                    skip_to_end = true;
                }
            }
            Some(Opcode::JmpR) => {
                stack.push(Frame { opener: Opcode::JmpR, return_site: pc + 1, p_snapshot: 0 });
                if a >= registers[modulo_index(p, register_len)] {
                    skip_to_end = true;
                }
            }
            Some(Opcode::JmpP) => {
                stack.push(Frame { opener: Opcode::JmpP, return_site: pc + 1, p_snapshot: 0 });
                if p as f64 >= a {
                    skip_to_end = true;
                }
            }

            Some(Opcode::End) => {
                if let Some(frame) = stack.last_mut() {
                    match frame.opener {
                        Opcode::For => {
                            p += 1;
                            if (p as usize) < input_len {
                                next_pc = frame.return_site;
                            } else {
                                // Loop exits: restore the enclosing `P`
                                // (spec §4.4: "pop `P`"), not the loop's
                                // final counter value.
                                p = frame.p_snapshot;
                                stack.pop();
                            }
                        }
                        Opcode::LopA => {
                            if a < inputs[modulo_index(p, input_len)] {
                                next_pc = frame.return_site;
                            } else {
                                stack.pop();
                            }
                        }
                        Opcode::LopP => {
                            if (p as usize) < input_len {
                                next_pc = frame.return_site;
                            } else {
                                stack.pop();
                            }
                        }
                        _ => {
                            stack.pop();
                        }
                    }
                }
            }

            Some(Opcode::Rng) => a = rng(),

            None => {
                // Undefined opcode: a tolerated no-op (spec §7).
            }
        }

        process_time += 1;
        if process_time > max_process_time {
            break;
        }

        if skip_to_end {
            next_pc = scan_to_matching_end(bytecode, pc);
        }
        pc = next_pc;
    }

    Ok(process_time)
}

/// Scans forward from `opener_pc` (the index of the opcode that just set
/// `skipToEnd`) for its matching `END`, counting nested openers so an inner
/// `FOR`/`LOP_*`/`JMP_*` block's own `END` does not prematurely end the
/// scan. Returns the index of the matching `END`, or `bytecode.len()` if
/// there is none (an unmatched opener — a valid program per spec §3).
fn scan_to_matching_end(bytecode: &[u8], opener_pc: usize) -> usize {
    let mut depth: u32 = 0;
    let mut pc = opener_pc + 1;
    while pc < bytecode.len() {
        match Opcode::from_byte(bytecode[pc]) {
            Some(op) if gasm_bytecode::is_opener(op) => depth += 1,
            Some(Opcode::End) => {
                if depth == 0 {
                    return pc;
                }
                depth -= 1;
            }
            _ => {}
        }
        pc += 1;
    }
    pc
}
