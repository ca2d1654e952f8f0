//! Error types for the emitter and the object writer.

use alloc::string::String;
use core::fmt;

use crate::branch::LabelId;

/// Emission error.
///
/// Every variant is a caller bug; none is recoverable by retry. The emitter
/// never attempts recovery internally — errors propagate straight out of the
/// operation that detected them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmitError {
    /// A pending branch references a label that was never defined.
    UndefinedLabel {
        /// The undefined label.
        label: LabelId,
        /// Byte offset of the branch's first opcode byte.
        site: usize,
    },

    /// `define_label` was called twice for the same label.
    DuplicateLabel {
        /// The label that was defined twice.
        label: LabelId,
        /// Byte offset of the first definition.
        first_offset: usize,
    },

    /// An in-place patch would write past the end of the buffer.
    PatchOutOfRange {
        /// Start offset of the attempted write.
        offset: usize,
        /// Number of bytes that were to be written.
        len: usize,
        /// Current buffer length.
        buffer_len: usize,
    },

    /// Shift/rotate immediate outside `0..=63`.
    InvalidShiftCount {
        /// The rejected count.
        count: u8,
    },

    /// Branch shortening did not reach a fixed point within the pass cap.
    ///
    /// Shortening is monotone (branches only ever shrink), so this cannot
    /// fire on correct input; the cap exists purely as a diagnostic.
    ShorteningLimit {
        /// Maximum number of shortening passes allowed.
        max: usize,
    },

    /// A relocation references a symbol the object writer does not know.
    UnknownSymbol {
        /// The unresolved symbol name.
        name: String,
    },

    /// A symbol or relocation references a section the object writer does
    /// not know.
    UnknownSection {
        /// The unresolved section name.
        name: String,
    },
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::UndefinedLabel { label, site } => {
                write!(
                    f,
                    "undefined label {} referenced by branch at offset {}",
                    label, site
                )
            }
            EmitError::DuplicateLabel {
                label,
                first_offset,
            } => {
                write!(
                    f,
                    "duplicate definition of label {} (first defined at offset {})",
                    label, first_offset
                )
            }
            EmitError::PatchOutOfRange {
                offset,
                len,
                buffer_len,
            } => {
                write!(
                    f,
                    "patch of {} bytes at offset {} exceeds buffer length {}",
                    len, offset, buffer_len
                )
            }
            EmitError::InvalidShiftCount { count } => {
                write!(f, "shift count {} outside 0..=63", count)
            }
            EmitError::ShorteningLimit { max } => {
                write!(
                    f,
                    "branch shortening exceeded {} passes (monotone shrinking cannot oscillate; this is a bug)",
                    max
                )
            }
            EmitError::UnknownSymbol { name } => {
                write!(f, "relocation references unknown symbol '{}'", name)
            }
            EmitError::UnknownSection { name } => {
                write!(f, "unknown section '{}'", name)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EmitError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodeBuffer;

    #[test]
    fn undefined_label_display() {
        let mut buf = CodeBuffer::new();
        let label = buf.new_label();
        let err = EmitError::UndefinedLabel { label, site: 17 };
        assert_eq!(
            format!("{}", err),
            "undefined label L0 referenced by branch at offset 17"
        );
    }

    #[test]
    fn duplicate_label_display() {
        let mut buf = CodeBuffer::new();
        let label = buf.new_label();
        let err = EmitError::DuplicateLabel {
            label,
            first_offset: 4,
        };
        assert_eq!(
            format!("{}", err),
            "duplicate definition of label L0 (first defined at offset 4)"
        );
    }

    #[test]
    fn patch_out_of_range_display() {
        let err = EmitError::PatchOutOfRange {
            offset: 10,
            len: 4,
            buffer_len: 12,
        };
        assert_eq!(
            format!("{}", err),
            "patch of 4 bytes at offset 10 exceeds buffer length 12"
        );
    }

    #[test]
    fn invalid_shift_count_display() {
        let err = EmitError::InvalidShiftCount { count: 64 };
        assert_eq!(format!("{}", err), "shift count 64 outside 0..=63");
    }

    #[test]
    fn shortening_limit_display() {
        let err = EmitError::ShorteningLimit { max: 10 };
        let s = format!("{}", err);
        assert!(s.contains("exceeded 10 passes"));
    }

    #[test]
    fn unknown_symbol_display() {
        let err = EmitError::UnknownSymbol {
            name: "memcpy".into(),
        };
        assert_eq!(
            format!("{}", err),
            "relocation references unknown symbol 'memcpy'"
        );
    }

    #[test]
    fn unknown_section_display() {
        let err = EmitError::UnknownSection {
            name: ".rodata".into(),
        };
        assert_eq!(format!("{}", err), "unknown section '.rodata'");
    }
}
