//! Labels, pending branches, displacement resolution, and the branch
//! shortening pass.
//!
//! Branch emission is two-phase: a label is allocated before its position
//! is known, every branch that targets it reserves a 32-bit placeholder and
//! records a pending-branch entry, and once all labels are defined the
//! engine patches displacements ([`CodeBuffer::resolve_all`]) and rewrites
//! in-range branches to their 2-byte short form ([`CodeBuffer::shorten`]).

use alloc::vec::Vec;
use core::fmt;
use core::mem;

use crate::buffer::CodeBuffer;
use crate::error::EmitError;

/// Maximum number of shortening passes.
///
/// Termination is guaranteed by monotonicity — each pass only shrinks — so
/// the cap is a diagnostic backstop, not a recovery mechanism. Hitting it
/// signals a logic bug and fails loudly.
pub const MAX_SHORTEN_PASSES: usize = 10;

/// Opaque handle naming a branch destination within one buffer.
///
/// Allocated by [`CodeBuffer::new_label`], bound to a byte offset by
/// [`CodeBuffer::define_label`]. Label ids from one buffer are meaningless
/// in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelId(pub(crate) u32);

impl LabelId {
    /// The numeric identity of this label, unique within its buffer.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// The branch instructions that participate in the label engine.
///
/// The discriminant indexes the two opcode lookup tables below; the
/// short/long form knowledge lives entirely in those tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BranchKind {
    Call = 0,
    Jmp = 1,
    Je = 2,
    Jne = 3,
    Jg = 4,
    Jl = 5,
    Jge = 6,
    Jle = 7,
    Ja = 8,
    Jb = 9,
    Jae = 10,
    Jbe = 11,
}

/// Long-form opcode bytes, indexed by `BranchKind as usize`. Conditional
/// jumps use the two-byte `0F 8x` escape; CALL/JMP are single-byte.
const LONG_OPCODES: [&[u8]; 12] = [
    &[0xE8],       // CALL rel32
    &[0xE9],       // JMP rel32
    &[0x0F, 0x84], // JE
    &[0x0F, 0x85], // JNE
    &[0x0F, 0x8F], // JG
    &[0x0F, 0x8C], // JL
    &[0x0F, 0x8D], // JGE
    &[0x0F, 0x8E], // JLE
    &[0x0F, 0x87], // JA
    &[0x0F, 0x82], // JB
    &[0x0F, 0x83], // JAE
    &[0x0F, 0x86], // JBE
];

/// Short-form opcodes, indexed by `BranchKind as usize`. CALL has no
/// short form.
const SHORT_OPCODES: [Option<u8>; 12] = [
    None,       // CALL
    Some(0xEB), // JMP rel8
    Some(0x74), // JE
    Some(0x75), // JNE
    Some(0x7F), // JG
    Some(0x7C), // JL
    Some(0x7D), // JGE
    Some(0x7E), // JLE
    Some(0x77), // JA
    Some(0x72), // JB
    Some(0x73), // JAE
    Some(0x76), // JBE
];

impl BranchKind {
    /// Opcode bytes of the 32-bit displacement form.
    #[inline]
    pub fn long_opcode(self) -> &'static [u8] {
        LONG_OPCODES[self as usize]
    }

    /// Opcode byte of the 8-bit displacement form, if one exists.
    #[inline]
    pub fn short_opcode(self) -> Option<u8> {
        SHORT_OPCODES[self as usize]
    }

    /// Encoded length of the long form: 5 for CALL/JMP, 6 for Jcc.
    #[inline]
    pub fn long_len(self) -> u8 {
        self.long_opcode().len() as u8 + 4
    }
}

/// A branch whose displacement is filled in after all labels are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingBranch {
    /// Offset of the branch's first opcode byte.
    pub site: usize,
    /// The label this branch targets.
    pub target: LabelId,
    /// Which branch instruction this is.
    pub kind: BranchKind,
    /// Current encoded length: 5 or 6 at emit time, 2 once shortened.
    pub len: u8,
}

impl CodeBuffer {
    // ── label allocation & definition ──────────────────────

    /// Allocate a fresh label. Does not modify the byte stream.
    pub fn new_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    /// Bind `label` to the current end of the buffer.
    ///
    /// Defining a label before any branch references it is fine; defining
    /// the same label twice is not.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::DuplicateLabel`] on a second definition.
    pub fn define_label(&mut self, label: LabelId) -> Result<(), EmitError> {
        let offset = self.bytes.len();
        if let Some(&first_offset) = self.labels.get(&label) {
            return Err(EmitError::DuplicateLabel {
                label,
                first_offset,
            });
        }
        self.labels.insert(label, offset);
        Ok(())
    }

    // ── label-target branch emission ───────────────────────

    /// Emit a branch to `target` in long form, reserving placeholder
    /// displacement bytes and recording a pending-branch entry.
    fn emit_branch(&mut self, kind: BranchKind, target: LabelId) {
        let site = self.bytes.len();
        self.extend_from_slice(kind.long_opcode());
        self.push_u32(0);
        self.pending.push(PendingBranch {
            site,
            target,
            kind,
            len: kind.long_len(),
        });
    }

    /// CALL to a label. Never shortened.
    pub fn emit_call(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Call, target);
    }

    /// Unconditional JMP to a label.
    pub fn emit_jmp(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jmp, target);
    }

    /// Jump if equal (ZF=1).
    pub fn emit_je(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Je, target);
    }

    /// Jump if not equal (ZF=0).
    pub fn emit_jne(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jne, target);
    }

    /// Jump if greater (signed).
    pub fn emit_jg(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jg, target);
    }

    /// Jump if less (signed).
    pub fn emit_jl(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jl, target);
    }

    /// Jump if greater or equal (signed).
    pub fn emit_jge(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jge, target);
    }

    /// Jump if less or equal (signed).
    pub fn emit_jle(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jle, target);
    }

    /// Jump if above (unsigned).
    pub fn emit_ja(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Ja, target);
    }

    /// Jump if below (unsigned).
    pub fn emit_jb(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jb, target);
    }

    /// Jump if above or equal (unsigned).
    pub fn emit_jae(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jae, target);
    }

    /// Jump if below or equal (unsigned).
    pub fn emit_jbe(&mut self, target: LabelId) {
        self.emit_branch(BranchKind::Jbe, target);
    }

    // ── resolution ─────────────────────────────────────────

    /// Patch every pending branch's displacement bytes.
    ///
    /// Each displacement encodes `target − (site + len)` as a little-endian
    /// signed integer of the branch's current width (i32 for long forms, i8
    /// for branches already rewritten short). Idempotent as long as no
    /// label positions have changed in between.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::UndefinedLabel`] for the first branch whose
    /// target has no definition.
    pub fn resolve_all(&mut self) -> Result<(), EmitError> {
        for i in 0..self.pending.len() {
            let br = self.pending[i];
            let target = self.target_offset(&br)?;
            let len = br.len as usize;
            let distance = target as i64 - (br.site + len) as i64;
            if len == 2 {
                // The shortening pass only ever picks the 2-byte form for
                // in-range distances, and distances shrink monotonically.
                assert!(
                    (-128..=127).contains(&distance),
                    "short branch at {} has out-of-range displacement {}",
                    br.site,
                    distance
                );
                self.patch_at(br.site + 1, &[(distance as i8) as u8])?;
            } else {
                self.patch_at(br.site + len - 4, &(distance as i32).to_le_bytes())?;
            }
        }
        Ok(())
    }

    fn target_offset(&self, br: &PendingBranch) -> Result<usize, EmitError> {
        self.labels
            .get(&br.target)
            .copied()
            .ok_or(EmitError::UndefinedLabel {
                label: br.target,
                site: br.site,
            })
    }

    // ── shortening ─────────────────────────────────────────

    /// Iteratively rewrite in-range branches to 2-byte short form.
    ///
    /// Runs rewrite passes until a fixed point: each pass copies the byte
    /// stream, replaces every shortenable branch whose 8-bit displacement
    /// reaches its target, re-emits the rest with freshly computed
    /// displacements, and remaps all label and branch offsets. Shortening
    /// one branch can pull another into range, so forward references may
    /// need several passes; the process only shrinks, which guarantees
    /// termination in at most `pending branches + 1` passes.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::UndefinedLabel`] if any pending branch targets
    /// an undefined label, or [`EmitError::ShorteningLimit`] if the pass
    /// cap is exceeded (impossible unless the engine itself is buggy).
    pub fn shorten(&mut self) -> Result<(), EmitError> {
        // Layout cannot move until every target is known.
        for br in &self.pending {
            self.target_offset(br)?;
        }
        for _pass in 0..MAX_SHORTEN_PASSES {
            if !self.shorten_pass() {
                return Ok(());
            }
        }
        Err(EmitError::ShorteningLimit {
            max: MAX_SHORTEN_PASSES,
        })
    }

    /// One shortening pass. Returns whether any branch changed length.
    fn shorten_pass(&mut self) -> bool {
        let input = mem::take(&mut self.bytes);
        let mut out = Vec::with_capacity(input.len());
        let mut new_pending = Vec::with_capacity(self.pending.len());
        // (old site, bytes saved) for every branch that shrank this pass.
        let mut shrunk: Vec<(usize, usize)> = Vec::new();
        let mut changed = false;
        let mut cursor = 0usize;

        for br in &self.pending {
            out.extend_from_slice(&input[cursor..br.site]);
            let new_site = out.len();
            let site = br.site;
            let len = br.len as usize;
            let target = self.labels[&br.target];

            // The displacement the short form would have. A forward target
            // moves down with this branch's own shrink, so its distance is
            // measured against the current full length; a backward target
            // stays put and is measured against the 2-byte form.
            let short_distance = if target > site {
                target as i64 - (site + len) as i64
            } else {
                target as i64 - (site + 2) as i64
            };
            let fits = (-128..=127).contains(&short_distance);

            match (br.kind.short_opcode(), len) {
                (Some(opcode), 2) => {
                    // Already short; distances only shrink, so it still fits.
                    assert!(
                        fits,
                        "shortened branch at {} no longer reaches its target",
                        site
                    );
                    out.push(opcode);
                    out.push(short_distance as i8 as u8);
                }
                (Some(opcode), _) if fits => {
                    out.push(opcode);
                    out.push(short_distance as i8 as u8);
                    shrunk.push((site, len - 2));
                    changed = true;
                }
                _ => {
                    // CALL, or a conditional/unconditional jump still out of
                    // 8-bit range: re-emit the long form. A 2-byte entry can
                    // never land here.
                    debug_assert!(len != 2);
                    out.extend_from_slice(br.kind.long_opcode());
                    let distance = target as i64 - (site + len) as i64;
                    out.extend_from_slice(&(distance as i32).to_le_bytes());
                }
            }

            let new_len = out.len() - new_site;
            new_pending.push(PendingBranch {
                site: new_site,
                len: new_len as u8,
                ..*br
            });
            cursor = site + len;
        }
        out.extend_from_slice(&input[cursor..]);

        // Labels sit on instruction boundaries, so a branch precedes a
        // label exactly when its site does.
        if !shrunk.is_empty() {
            for offset in self.labels.values_mut() {
                let shift: usize = shrunk
                    .iter()
                    .filter(|&&(site, _)| site < *offset)
                    .map(|&(_, saved)| saved)
                    .sum();
                *offset -= shift;
            }
        }

        self.bytes = out;
        self.pending = new_pending;
        changed
    }

    // ── finalization ───────────────────────────────────────

    /// Resolve all displacements, shorten branches to the fixed point, and
    /// return the finished machine code.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::UndefinedLabel`] if any pending branch targets
    /// an undefined label.
    pub fn finalize(mut self) -> Result<Vec<u8>, EmitError> {
        self.resolve_all()?;
        self.shorten()?;
        Ok(self.bytes)
    }
}
