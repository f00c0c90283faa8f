use thiserror::Error;

/// Failure modes for the four codecs in this crate. Parser/codec errors
/// always surface to the caller (spec §7); there is no silent-recovery path
/// here the way undefined opcodes are tolerated at the VM layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown mnemonic: {0:?}")]
    UnknownMnemonic(String),

    #[error("byte 0x{0:02X} is not a defined opcode")]
    UndefinedOpcode(u8),

    #[error("glyph {0:?} is not a valid base32 character")]
    InvalidGlyph(char),
}
