//! The code buffer: an append-only byte sequence with little-endian write
//! helpers, in-place patching, and the label / pending-branch metadata the
//! branch engine operates on.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::branch::{LabelId, PendingBranch};
use crate::error::EmitError;

/// A growing machine-code buffer.
///
/// All emit operations append to the byte sequence; the label table and
/// pending-branch list travel with the bytes so that the branch engine can
/// patch and rewrite them later. A buffer is an exclusive resource —
/// concurrent use from multiple threads must be serialised by the caller.
///
/// # Examples
///
/// ```rust
/// use x64emit::{CodeBuffer, Gpr};
///
/// let mut buf = CodeBuffer::new();
/// buf.emit_mov(Gpr::Rax, Gpr::Rbx);
/// buf.emit_ret();
/// assert_eq!(buf.bytes(), &[0x48, 0x89, 0xD8, 0xC3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CodeBuffer {
    pub(crate) bytes: Vec<u8>,
    pub(crate) labels: BTreeMap<LabelId, usize>,
    pub(crate) pending: Vec<PendingBranch>,
    pub(crate) next_label: u32,
}

impl CodeBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with pre-allocated byte capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Current length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no bytes have been emitted yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The machine-code bytes emitted so far.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer and return the raw bytes, discarding metadata.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    // ── appends ────────────────────────────────────────────

    /// Append one byte.
    #[inline]
    pub fn push_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Append a little-endian u16.
    #[inline]
    pub fn push_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian u32.
    #[inline]
    pub fn push_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian u64.
    #[inline]
    pub fn push_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian i32.
    #[inline]
    pub fn push_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian i64.
    #[inline]
    pub fn push_i64(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a raw byte sequence.
    #[inline]
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    // ── in-place patching ──────────────────────────────────

    /// Overwrite `bytes.len()` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::PatchOutOfRange`] when the target range does not
    /// lie within the current length — the caller has a bug, and the write
    /// must not happen.
    pub fn patch_at(&mut self, offset: usize, bytes: &[u8]) -> Result<(), EmitError> {
        let end = offset + bytes.len();
        if end > self.bytes.len() {
            return Err(EmitError::PatchOutOfRange {
                offset,
                len: bytes.len(),
                buffer_len: self.bytes.len(),
            });
        }
        self.bytes[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    // ── diagnostics ────────────────────────────────────────

    /// Format the buffer as uppercase two-digit hex pairs separated by
    /// single spaces, preserving byte order.
    pub fn format_hex(&self) -> String {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let mut out = String::with_capacity(self.bytes.len() * 3);
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0xF) as usize] as char);
        }
        out
    }

    // ── branch metadata access ─────────────────────────────

    /// Iterate over all defined labels as `(label, offset)` pairs.
    ///
    /// External object-file emitters use this together with
    /// [`pending_branches`](Self::pending_branches) to derive relocation
    /// entries for calls into other modules.
    pub fn labels(&self) -> impl Iterator<Item = (LabelId, usize)> + '_ {
        self.labels.iter().map(|(&label, &offset)| (label, offset))
    }

    /// The offset a label was defined at, if it has been defined.
    pub fn label_offset(&self, label: LabelId) -> Option<usize> {
        self.labels.get(&label).copied()
    }

    /// The pending branches recorded so far, in emission order.
    pub fn pending_branches(&self) -> &[PendingBranch] {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_writes() {
        let mut buf = CodeBuffer::new();
        buf.push_u8(0xAB);
        buf.push_u16(0x1234);
        buf.push_u32(0xDEAD_BEEF);
        assert_eq!(
            buf.bytes(),
            &[0xAB, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE]
        );
    }

    #[test]
    fn little_endian_64_and_signed() {
        let mut buf = CodeBuffer::new();
        buf.push_u64(0x0102_0304_0506_0708);
        buf.push_i32(-2);
        buf.push_i64(-1);
        assert_eq!(buf.len(), 8 + 4 + 8);
        assert_eq!(&buf.bytes()[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&buf.bytes()[8..12], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&buf.bytes()[12..], &[0xFF; 8]);
    }

    #[test]
    fn patch_in_place() {
        let mut buf = CodeBuffer::new();
        buf.extend_from_slice(&[0, 0, 0, 0]);
        buf.patch_at(1, &[0xAA, 0xBB]).unwrap();
        assert_eq!(buf.bytes(), &[0, 0xAA, 0xBB, 0]);
    }

    #[test]
    fn patch_at_end_boundary() {
        let mut buf = CodeBuffer::new();
        buf.extend_from_slice(&[1, 2, 3, 4]);
        buf.patch_at(2, &[9, 9]).unwrap();
        assert_eq!(buf.bytes(), &[1, 2, 9, 9]);
    }

    #[test]
    fn patch_out_of_range_fails() {
        let mut buf = CodeBuffer::new();
        buf.extend_from_slice(&[1, 2, 3]);
        let err = buf.patch_at(2, &[0, 0]).unwrap_err();
        assert_eq!(
            err,
            EmitError::PatchOutOfRange {
                offset: 2,
                len: 2,
                buffer_len: 3,
            }
        );
        // The buffer is untouched on failure.
        assert_eq!(buf.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn format_hex_uppercase_spaced() {
        let mut buf = CodeBuffer::new();
        buf.extend_from_slice(&[0x48, 0x89, 0xD8, 0x0F, 0x00]);
        assert_eq!(buf.format_hex(), "48 89 D8 0F 00");
    }

    #[test]
    fn format_hex_empty() {
        assert_eq!(CodeBuffer::new().format_hex(), "");
    }

    #[test]
    fn label_accessors() {
        let mut buf = CodeBuffer::new();
        let a = buf.new_label();
        let b = buf.new_label();
        buf.push_u8(0x90);
        buf.define_label(a).unwrap();
        assert_eq!(buf.label_offset(a), Some(1));
        assert_eq!(buf.label_offset(b), None);
        let all: Vec<_> = buf.labels().collect();
        assert_eq!(all, vec![(a, 1)]);
    }
}
