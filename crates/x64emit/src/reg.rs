//! Register value types: general-purpose, SSE, and x87.

use core::fmt;

/// One of the 16 general-purpose 64-bit registers.
///
/// The discriminant is the hardware encoding (0..15). Indices 8 and above
/// only reach the ModR/M or opcode `rd` field through a REX extension bit
/// (REX.R for the reg field, REX.B for the r/m field or `rd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Gpr {
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

impl Gpr {
    /// The 4-bit hardware register number.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether this register needs a REX extension bit (index ≥ 8).
    #[inline]
    pub const fn is_extended(self) -> bool {
        self.code() >= 8
    }

    /// The low three bits that go into ModR/M, SIB, or `opcode+rd` fields.
    #[inline]
    pub(crate) const fn low_bits(self) -> u8 {
        self.code() & 7
    }

    /// Look up a register by hardware number (0..15).
    pub const fn from_index(idx: u8) -> Option<Gpr> {
        match idx {
            0 => Some(Gpr::Rax),
            1 => Some(Gpr::Rcx),
            2 => Some(Gpr::Rdx),
            3 => Some(Gpr::Rbx),
            4 => Some(Gpr::Rsp),
            5 => Some(Gpr::Rbp),
            6 => Some(Gpr::Rsi),
            7 => Some(Gpr::Rdi),
            8 => Some(Gpr::R8),
            9 => Some(Gpr::R9),
            10 => Some(Gpr::R10),
            11 => Some(Gpr::R11),
            12 => Some(Gpr::R12),
            13 => Some(Gpr::R13),
            14 => Some(Gpr::R14),
            15 => Some(Gpr::R15),
            _ => None,
        }
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gpr::Rax => "rax",
            Gpr::Rcx => "rcx",
            Gpr::Rdx => "rdx",
            Gpr::Rbx => "rbx",
            Gpr::Rsp => "rsp",
            Gpr::Rbp => "rbp",
            Gpr::Rsi => "rsi",
            Gpr::Rdi => "rdi",
            Gpr::R8 => "r8",
            Gpr::R9 => "r9",
            Gpr::R10 => "r10",
            Gpr::R11 => "r11",
            Gpr::R12 => "r12",
            Gpr::R13 => "r13",
            Gpr::R14 => "r14",
            Gpr::R15 => "r15",
        };
        f.write_str(name)
    }
}

/// One of the 16 SSE registers.
///
/// Same extension rule as [`Gpr`]: XMM8..XMM15 require a REX bit. REX.W is
/// never set for SSE moves and arithmetic; only the CVT group interacting
/// with 64-bit integers demands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Xmm {
    Xmm0 = 0,
    Xmm1 = 1,
    Xmm2 = 2,
    Xmm3 = 3,
    Xmm4 = 4,
    Xmm5 = 5,
    Xmm6 = 6,
    Xmm7 = 7,
    Xmm8 = 8,
    Xmm9 = 9,
    Xmm10 = 10,
    Xmm11 = 11,
    Xmm12 = 12,
    Xmm13 = 13,
    Xmm14 = 14,
    Xmm15 = 15,
}

impl Xmm {
    /// The 4-bit hardware register number.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether this register needs a REX extension bit (index ≥ 8).
    #[inline]
    pub const fn is_extended(self) -> bool {
        self.code() >= 8
    }

    /// Look up a register by hardware number (0..15).
    pub const fn from_index(idx: u8) -> Option<Xmm> {
        match idx {
            0 => Some(Xmm::Xmm0),
            1 => Some(Xmm::Xmm1),
            2 => Some(Xmm::Xmm2),
            3 => Some(Xmm::Xmm3),
            4 => Some(Xmm::Xmm4),
            5 => Some(Xmm::Xmm5),
            6 => Some(Xmm::Xmm6),
            7 => Some(Xmm::Xmm7),
            8 => Some(Xmm::Xmm8),
            9 => Some(Xmm::Xmm9),
            10 => Some(Xmm::Xmm10),
            11 => Some(Xmm::Xmm11),
            12 => Some(Xmm::Xmm12),
            13 => Some(Xmm::Xmm13),
            14 => Some(Xmm::Xmm14),
            15 => Some(Xmm::Xmm15),
            _ => None,
        }
    }
}

impl fmt::Display for Xmm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xmm{}", self.code())
    }
}

/// One of the eight x87 stack registers ST0..ST7.
///
/// The 3-bit index lands directly in the low bits of the second opcode
/// byte; no REX prefix is ever involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum St {
    St0 = 0,
    St1 = 1,
    St2 = 2,
    St3 = 3,
    St4 = 4,
    St5 = 5,
    St6 = 6,
    St7 = 7,
}

impl St {
    /// The 3-bit stack slot number.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a stack register by index (0..7).
    pub const fn from_index(idx: u8) -> Option<St> {
        match idx {
            0 => Some(St::St0),
            1 => Some(St::St1),
            2 => Some(St::St2),
            3 => Some(St::St3),
            4 => Some(St::St4),
            5 => Some(St::St5),
            6 => Some(St::St6),
            7 => Some(St::St7),
            _ => None,
        }
    }
}

impl fmt::Display for St {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "st{}", self.code())
    }
}
