//! Text ↔ bytecode, the first of the four round-trips in spec §4.2.

use crate::opcode::{opcode_of, Opcode};
use crate::CodecError;

/// Parses line-oriented G-assembly text into a bytecode program.
///
/// Each line is normalized independently (see [`normalize_line`]); blank
/// lines (after normalization) are skipped. The first line that normalizes
/// to an unrecognized mnemonic fails the whole parse.
pub fn parse_program(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut bytecode = Vec::new();
    for raw_line in text.lines() {
        let normalized = normalize_line(raw_line);
        if normalized.is_empty() {
            continue;
        }
        let op = opcode_of(&normalized).map_err(|_| CodecError::UnknownMnemonic(normalized.clone()))?;
        bytecode.push(op.to_byte());
    }
    Ok(bytecode)
}

/// Renders a bytecode program back to text, one mnemonic per line. Bytes
/// that decode to no defined opcode (only reachable after mutation
/// synthesizes an out-of-range byte) render as `UNKNOWN_0xHH` so the output
/// remains one line per input byte.
pub fn program_to_text(bytecode: &[u8]) -> String {
    let mut out = String::new();
    for &byte in bytecode {
        match Opcode::from_byte(byte) {
            Some(op) => out.push_str(op.mnemonic()),
            None => out.push_str(&format!("UNKNOWN_0x{:02X}", byte)),
        }
        out.push('\n');
    }
    out
}

/// Normalizes one line of source text: uppercase, strip the `//` comment
/// suffix, drop every character that is not ASCII-printable-and-non-space
/// (this also removes any whitespace the author typed), then reinsert
/// exactly one space after the three-letter mnemonic prefix and exactly one
/// space after a comma, matching the on-disk mnemonic strings in
/// [`Opcode::mnemonic`].
pub fn normalize_line(raw: &str) -> String {
    let upper = raw.to_ascii_uppercase();
    let without_comment = match upper.find("//") {
        Some(idx) => &upper[..idx],
        None => &upper[..],
    };
    let mut compact: String = without_comment.chars().filter(|c| c.is_ascii_graphic()).collect();

    if compact.len() > 3 {
        compact.insert(3, ' ');
    }
    if let Some(comma_idx) = compact.find(',') {
        let after = comma_idx + 1;
        if after < compact.len() && compact.as_bytes()[after] != b' ' {
            compact.insert(after, ' ');
        }
    }
    compact
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_example_from_spec() {
        let bytecode = parse_program("MOV A, R\n// comment\nINC").unwrap();
        assert_eq!(bytecode, vec![0x02, 0x30]);
    }

    #[test]
    fn normalize_strips_whitespace_and_comments() {
        assert_eq!(normalize_line("  mov   a ,r  // whatever"), "MOV A, R");
        assert_eq!(normalize_line("inc"), "INC");
        assert_eq!(normalize_line(""), "");
        assert_eq!(normalize_line("// just a comment"), "");
    }

    #[test]
    fn unknown_mnemonic_is_reported_normalized() {
        let err = parse_program("NOPE").unwrap_err();
        assert_eq!(err, CodecError::UnknownMnemonic("NOPE".to_string()));
    }

    #[test]
    fn text_round_trips_through_program_to_text() {
        let original = vec![0x02, 0x30, 0x60, 0x41];
        let text = program_to_text(&original);
        let reparsed = parse_program(&text).unwrap();
        assert_eq!(reparsed, original);
    }
}
