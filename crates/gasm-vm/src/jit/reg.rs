//! x86-64 general-purpose and SSE register numbering shared by the
//! assembler and the ABI layer.

/// A 64-bit general-purpose register, numbered the way the ISA encodes it
/// (`rax`=0 .. `r15`=15). Registers `8..=15` need `REX.B`/`REX.X`/`REX.R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    pub fn num(self) -> u8 {
        self as u8
    }

    /// Low 3 bits of the register number, used directly in `ModRM`/`SIB`
    /// fields; the 4th bit is carried separately in the `REX` prefix.
    pub fn low3(self) -> u8 {
        self.num() & 0x7
    }

    /// Whether this register needs a `REX` extension bit to address.
    pub fn is_extended(self) -> bool {
        self.num() >= 8
    }
}

/// An `xmm0..xmm15` SSE register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xmm(pub u8);

impl Xmm {
    pub const XMM0: Xmm = Xmm(0);
    pub const XMM1: Xmm = Xmm(1);
    pub const XMM2: Xmm = Xmm(2);
    pub const XMM3: Xmm = Xmm(3);
    pub const XMM4: Xmm = Xmm(4);
    pub const XMM5: Xmm = Xmm(5);

    pub fn low3(self) -> u8 {
        self.0 & 0x7
    }

    pub fn is_extended(self) -> bool {
        self.0 >= 8
    }
}
