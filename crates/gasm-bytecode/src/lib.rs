//! Opcode tables and codecs for G-assembly bytecode.
//!
//! `gasm-bytecode` is the bottom of the workspace: it defines the opcode
//! enum and the four lossless round-trips (text, ASCII, bit-packed, and the
//! index32 ordering they all share) with no dependency on execution,
//! genetics, or I/O beyond `std`.
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod opcode;
pub mod text;

mod error;

pub use codec::{ascii_to_bytecode, bytecode_to_ascii, unzip, zip};
pub use error::CodecError;
pub use opcode::{is_end, is_opener, is_structural, opcode_of, opcode_of_index32, Group, Opcode, OpcodeError, ALL_OPCODES};
pub use text::{normalize_line, parse_program, program_to_text};
