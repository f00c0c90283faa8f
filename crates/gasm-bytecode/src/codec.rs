//! ASCII and bit-packed codecs, round-trips 2-4 of spec §4.2. Both operate
//! purely in terms of [`crate::opcode::index32_of`]/[`opcode_of_index32`],
//! so neither can drift independently of the canonical opcode order.

use crate::opcode::{opcode_of_index32, Opcode};
use crate::CodecError;

const GLYPH_BASE: u8 = b'A';

/// Maps a defined opcode to its one-character ASCII glyph: `index32(op) +
/// 'A'`.
fn glyph_of(op: Opcode) -> char {
    (GLYPH_BASE + op.index32()) as char
}

/// Inverse of [`glyph_of`]. Only the 32 glyphs `'A'..='A'+31` are valid.
fn opcode_of_glyph(glyph: char) -> Result<Opcode, CodecError> {
    if !glyph.is_ascii() {
        return Err(CodecError::InvalidGlyph(glyph));
    }
    let byte = glyph as u32;
    let base = GLYPH_BASE as u32;
    if byte < base || byte - base >= 32 {
        return Err(CodecError::InvalidGlyph(glyph));
    }
    Ok(opcode_of_index32((byte - base) as u8).expect("range checked above"))
}

/// Bytecode → ASCII. Fails if any byte is not a defined opcode (mutation and
/// grow never synthesize such bytes, so this only fires on externally
/// supplied or hand-edited bytecode).
pub fn bytecode_to_ascii(bytecode: &[u8]) -> Result<String, CodecError> {
    bytecode
        .iter()
        .map(|&byte| {
            Opcode::from_byte(byte)
                .map(glyph_of)
                .ok_or(CodecError::UndefinedOpcode(byte))
        })
        .collect()
}

/// ASCII → bytecode.
pub fn ascii_to_bytecode(ascii: &str) -> Result<Vec<u8>, CodecError> {
    ascii.chars().map(|c| opcode_of_glyph(c).map(Opcode::to_byte)).collect()
}

/// Streams the 5-bit `index32` of each opcode byte into `u64` lanes,
/// MSB-first. Lane count is `ceil(5 * bytecode.len() / 64)`; the final lane
/// is left-padded with zero bits (i.e. its low-order bits beyond the last
/// packed index are zero).
pub fn zip(bytecode: &[u8]) -> Result<Vec<u64>, CodecError> {
    let total_bits = bytecode.len() * 5;
    let lane_count = total_bits.div_ceil(64);
    let mut lanes = vec![0u64; lane_count];

    let mut bit_pos = 0usize;
    for &byte in bytecode {
        let op = Opcode::from_byte(byte).ok_or(CodecError::UndefinedOpcode(byte))?;
        let index = op.index32() as u64;

        let lane = bit_pos / 64;
        let offset = bit_pos % 64;
        if offset <= 59 {
            lanes[lane] |= index << (59 - offset);
        } else {
            let high_bits = 64 - offset;
            let low_bits = 5 - high_bits;
            lanes[lane] |= index >> low_bits;
            lanes[lane + 1] |= index << (64 - low_bits);
        }
        bit_pos += 5;
    }
    Ok(lanes)
}

/// Inverse of [`zip`]. The original bytecode length is not recoverable from
/// the zipped lanes alone (the final lane's zero padding is indistinguishable
/// from trailing `MOV P, A` instructions, whose `index32` is also `0`), so
/// `length` must be supplied by the caller — exactly as spec §4.2 states.
pub fn unzip(lanes: &[u64], length: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(length);
    let mut bit_pos = 0usize;
    for _ in 0..length {
        let lane = bit_pos / 64;
        let offset = bit_pos % 64;
        let index = if offset <= 59 {
            (lanes[lane] >> (59 - offset)) & 0x1F
        } else {
            let high_bits = 64 - offset;
            let low_bits = 5 - high_bits;
            let high = (lanes[lane] & ((1u64 << high_bits) - 1)) << low_bits;
            let low = lanes[lane + 1] >> (64 - low_bits);
            (high | low) & 0x1F
        };
        let op = opcode_of_index32(index as u8).expect("index32 is always < 32");
        out.push(op.to_byte());
        bit_pos += 5;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trip_from_spec_example() {
        let bytecode = vec![0x00, 0x30, 0x60];
        let ascii = bytecode_to_ascii(&bytecode).unwrap();
        assert_eq!(ascii_to_bytecode(&ascii).unwrap(), bytecode);
    }

    #[test]
    fn ascii_rejects_undefined_opcode() {
        assert_eq!(bytecode_to_ascii(&[0x06]), Err(CodecError::UndefinedOpcode(0x06)));
    }

    #[test]
    fn zip_unzip_round_trips_for_arbitrary_length() {
        let bytecode: Vec<u8> = (0..200).map(|i| Opcode::from_byte(crate::opcode::ALL_OPCODES[i % 32].to_byte()).unwrap().to_byte()).collect();
        let zipped = zip(&bytecode).unwrap();
        let expected_lanes = (bytecode.len() * 5).div_ceil(64);
        assert_eq!(zipped.len(), expected_lanes);
        let unzipped = unzip(&zipped, bytecode.len()).unwrap();
        assert_eq!(unzipped, bytecode);
    }

    #[test]
    fn zip_unzip_round_trips_single_byte() {
        let bytecode = vec![Opcode::Rng.to_byte()];
        let zipped = zip(&bytecode).unwrap();
        assert_eq!(zipped.len(), 1);
        assert_eq!(unzip(&zipped, 1).unwrap(), bytecode);
    }

    #[test]
    fn zip_unzip_round_trips_empty() {
        let zipped = zip(&[]).unwrap();
        assert!(zipped.is_empty());
        assert_eq!(unzip(&zipped, 0).unwrap(), Vec::<u8>::new());
    }
}
