//! x86-64 instruction encoder.
//!
//! Every emit operation appends one complete instruction — REX prefix,
//! opcode, ModR/M, SIB, and immediate bytes — to the [`CodeBuffer`]. All
//! register-to-register forms use ModR/M mode 11 (direct); the handful of
//! opcodes that require a memory operand (CLFLUSH, PREFETCHx, CMPXCHG8B)
//! take a base-register indirect form.
//!
//! The encoder never branches on runtime data except where the ISA mandates
//! a form choice (shift count of exactly 1 selects the one-operand `D1`
//! family).

use crate::buffer::CodeBuffer;
use crate::error::EmitError;
use crate::reg::{Gpr, St, Xmm};

// ─── Encoding primitives ───────────────────────────────────

/// Build a REX prefix byte from the W/R/X/B bits.
#[inline]
pub(crate) const fn rex(w: bool, r: bool, x: bool, b: bool) -> u8 {
    0x40 | ((w as u8) << 3) | ((r as u8) << 2) | ((x as u8) << 1) | (b as u8)
}

/// Whether a REX prefix is needed at all — any of W/R/X/B set.
#[inline]
pub(crate) const fn needs_rex(w: bool, r: bool, x: bool, b: bool) -> bool {
    w || r || x || b
}

/// Build a ModR/M byte.
#[inline]
pub(crate) const fn modrm(mode: u8, reg: u8, rm: u8) -> u8 {
    (mode << 6) | ((reg & 7) << 3) | (rm & 7)
}

/// Build a SIB byte. `scale` is the element scale (1/2/4/8).
#[inline]
pub(crate) const fn sib(scale: u8, index: u8, base: u8) -> u8 {
    let ss = match scale {
        2 => 1,
        4 => 2,
        8 => 3,
        _ => 0,
    };
    (ss << 6) | ((index & 7) << 3) | (base & 7)
}

/// Intel-recommended multi-byte NOP sequences, indexed by length.
const NOP_SEQUENCES: [&[u8]; 10] = [
    &[],
    &[0x90],
    &[0x66, 0x90],
    &[0x0F, 0x1F, 0x00],
    &[0x0F, 0x1F, 0x40, 0x00],
    &[0x0F, 0x1F, 0x44, 0x00, 0x00],
    &[0x66, 0x0F, 0x1F, 0x44, 0x00, 0x00],
    &[0x0F, 0x1F, 0x80, 0x00, 0x00, 0x00, 0x00],
    &[0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
    &[0x66, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
];

// ─── Shared emit helpers ───────────────────────────────────

impl CodeBuffer {
    /// `REX.W op ModRM(11, reg, rm)` — the pattern shared by every 64-bit
    /// binary register op.
    fn rr64(&mut self, opcode: &[u8], reg_field: Gpr, rm_field: Gpr) {
        self.push_u8(rex(
            true,
            reg_field.is_extended(),
            false,
            rm_field.is_extended(),
        ));
        self.extend_from_slice(opcode);
        self.push_u8(modrm(0b11, reg_field.low_bits(), rm_field.low_bits()));
    }

    /// `REX.W op ModRM(11, /digit, rm)` — the single-operand families that
    /// multiplex sub-operations through the reg field.
    fn digit64(&mut self, opcode: u8, digit: u8, rm_field: Gpr) {
        self.push_u8(rex(true, false, false, rm_field.is_extended()));
        self.push_u8(opcode);
        self.push_u8(modrm(0b11, digit, rm_field.low_bits()));
    }

    /// ModR/M (and SIB / zero displacement where the base register forces
    /// them) for a `[base]` indirect operand.
    fn modrm_indirect(&mut self, digit: u8, base: Gpr) {
        match base.low_bits() {
            // RSP/R12: rm=100 selects a SIB byte; index=100 means none.
            4 => {
                self.push_u8(modrm(0b00, digit, 4));
                self.push_u8(sib(1, 4, 4));
            }
            // RBP/R13: rm=101 with mode 00 means RIP-relative, so use
            // mode 01 with a zero disp8 instead.
            5 => {
                self.push_u8(modrm(0b01, digit, 5));
                self.push_u8(0x00);
            }
            low => self.push_u8(modrm(0b00, digit, low)),
        }
    }

    /// `[66] [REX.B] op ModRM([base])` for the memory-only opcodes.
    fn mem_digit(&mut self, prefix66: bool, opcode: &[u8], digit: u8, base: Gpr) {
        if prefix66 {
            self.push_u8(0x66);
        }
        if base.is_extended() {
            self.push_u8(rex(false, false, false, true));
        }
        self.extend_from_slice(opcode);
        self.modrm_indirect(digit, base);
    }

    /// `[prefix] [REX] op ModRM(11, reg, rm)` for SSE scalar forms. The
    /// mandatory prefix precedes REX; W is set only when the opcode
    /// interacts with a 64-bit integer register.
    fn sse_rr(&mut self, prefix: u8, opcode: &[u8], w: bool, reg_field: u8, rm_field: u8) {
        if prefix != 0 {
            self.push_u8(prefix);
        }
        let r = reg_field >= 8;
        let b = rm_field >= 8;
        if needs_rex(w, r, false, b) {
            self.push_u8(rex(w, r, false, b));
        }
        self.extend_from_slice(opcode);
        self.push_u8(modrm(0b11, reg_field, rm_field));
    }

    /// x87 register form: `op ModRM(11, /digit, st)`.
    fn x87(&mut self, opcode: u8, digit: u8, st: St) {
        self.push_u8(opcode);
        self.push_u8(modrm(0b11, digit, st.code()));
    }
}

// ─── Data movement & integer ALU ───────────────────────────

impl CodeBuffer {
    /// MOV r/m64, r64 — `89 /r`.
    pub fn emit_mov(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x89], src, dst);
    }

    /// ADD r/m64, r64 — `01 /r`.
    pub fn emit_add(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x01], src, dst);
    }

    /// SUB r/m64, r64 — `29 /r`.
    pub fn emit_sub(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x29], src, dst);
    }

    /// AND r/m64, r64 — `21 /r`.
    pub fn emit_and(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x21], src, dst);
    }

    /// OR r/m64, r64 — `09 /r`.
    pub fn emit_or(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x09], src, dst);
    }

    /// XOR r/m64, r64 — `31 /r`.
    pub fn emit_xor(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x31], src, dst);
    }

    /// CMP r/m64, r64 — `39 /r`.
    pub fn emit_cmp(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x39], src, dst);
    }

    /// TEST r/m64, r64 — `85 /r`.
    pub fn emit_test(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x85], src, dst);
    }

    /// XCHG r/m64, r64 — `87 /r`.
    pub fn emit_xchg(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x87], src, dst);
    }

    /// IMUL r64, r/m64 — `0F AF /r` (two-operand signed multiply).
    pub fn emit_imul(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x0F, 0xAF], dst, src);
    }

    /// MOV r64, imm64 — `B8+rd io`, the full 64-bit immediate form.
    pub fn emit_mov_imm64(&mut self, dst: Gpr, imm: u64) {
        self.push_u8(rex(true, false, false, dst.is_extended()));
        self.push_u8(0xB8 + dst.low_bits());
        self.push_u64(imm);
    }

    /// MOV r/m64, imm32 — `C7 /0 id`, sign-extended to 64 bits.
    pub fn emit_mov_imm32(&mut self, dst: Gpr, imm: i32) {
        self.digit64(0xC7, 0, dst);
        self.push_i32(imm);
    }

    /// ADD r/m64, imm32 — `81 /0 id`.
    ///
    /// Immediate arithmetic always uses the 32-bit form, even when an
    /// 8-bit immediate would fit; the encoder stays deterministic and no
    /// second shortening pass is needed.
    pub fn emit_add_imm32(&mut self, dst: Gpr, imm: i32) {
        self.digit64(0x81, 0, dst);
        self.push_i32(imm);
    }

    /// OR r/m64, imm32 — `81 /1 id`.
    pub fn emit_or_imm32(&mut self, dst: Gpr, imm: i32) {
        self.digit64(0x81, 1, dst);
        self.push_i32(imm);
    }

    /// AND r/m64, imm32 — `81 /4 id`.
    pub fn emit_and_imm32(&mut self, dst: Gpr, imm: i32) {
        self.digit64(0x81, 4, dst);
        self.push_i32(imm);
    }

    /// SUB r/m64, imm32 — `81 /5 id`.
    pub fn emit_sub_imm32(&mut self, dst: Gpr, imm: i32) {
        self.digit64(0x81, 5, dst);
        self.push_i32(imm);
    }

    /// XOR r/m64, imm32 — `81 /6 id`.
    pub fn emit_xor_imm32(&mut self, dst: Gpr, imm: i32) {
        self.digit64(0x81, 6, dst);
        self.push_i32(imm);
    }

    /// CMP r/m64, imm32 — `81 /7 id`.
    pub fn emit_cmp_imm32(&mut self, dst: Gpr, imm: i32) {
        self.digit64(0x81, 7, dst);
        self.push_i32(imm);
    }

    /// NOT r/m64 — `F7 /2`.
    pub fn emit_not(&mut self, reg: Gpr) {
        self.digit64(0xF7, 2, reg);
    }

    /// NEG r/m64 — `F7 /3`.
    pub fn emit_neg(&mut self, reg: Gpr) {
        self.digit64(0xF7, 3, reg);
    }

    /// MUL r/m64 — `F7 /4` (unsigned RDX:RAX ← RAX × r/m).
    pub fn emit_mul(&mut self, reg: Gpr) {
        self.digit64(0xF7, 4, reg);
    }

    /// DIV r/m64 — `F7 /6` (unsigned RDX:RAX ÷ r/m).
    pub fn emit_div(&mut self, reg: Gpr) {
        self.digit64(0xF7, 6, reg);
    }

    /// IDIV r/m64 — `F7 /7` (signed RDX:RAX ÷ r/m).
    pub fn emit_idiv(&mut self, reg: Gpr) {
        self.digit64(0xF7, 7, reg);
    }

    /// INC r/m64 — `FF /0`.
    pub fn emit_inc(&mut self, reg: Gpr) {
        self.digit64(0xFF, 0, reg);
    }

    /// DEC r/m64 — `FF /1`.
    pub fn emit_dec(&mut self, reg: Gpr) {
        self.digit64(0xFF, 1, reg);
    }
}

// ─── Shifts & rotates ──────────────────────────────────────

impl CodeBuffer {
    /// Shared shift/rotate emit: `D1 /digit` for a count of exactly 1,
    /// `C1 /digit ib` otherwise.
    fn shift(&mut self, digit: u8, reg: Gpr, count: u8) -> Result<(), EmitError> {
        if count > 63 {
            return Err(EmitError::InvalidShiftCount { count });
        }
        if count == 1 {
            self.digit64(0xD1, digit, reg);
        } else {
            self.digit64(0xC1, digit, reg);
            self.push_u8(count);
        }
        Ok(())
    }

    /// ROL r/m64, imm8 — `D1/C1 /0`.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::InvalidShiftCount`] for counts above 63.
    pub fn emit_rol(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(0, reg, count)
    }

    /// ROR r/m64, imm8 — `D1/C1 /1`.
    pub fn emit_ror(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(1, reg, count)
    }

    /// RCL r/m64, imm8 — `D1/C1 /2` (rotate through carry).
    pub fn emit_rcl(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(2, reg, count)
    }

    /// RCR r/m64, imm8 — `D1/C1 /3`.
    pub fn emit_rcr(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(3, reg, count)
    }

    /// SHL r/m64, imm8 — `D1/C1 /4`.
    pub fn emit_shl(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(4, reg, count)
    }

    /// SAL r/m64, imm8 — alias of SHL, same `/4` encoding.
    pub fn emit_sal(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(4, reg, count)
    }

    /// SHR r/m64, imm8 — `D1/C1 /5`.
    pub fn emit_shr(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(5, reg, count)
    }

    /// SAR r/m64, imm8 — `D1/C1 /7`.
    pub fn emit_sar(&mut self, reg: Gpr, count: u8) -> Result<(), EmitError> {
        self.shift(7, reg, count)
    }
}

// ─── Bit operations ────────────────────────────────────────

impl CodeBuffer {
    /// BSF r64, r/m64 — `0F BC /r`.
    pub fn emit_bsf(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x0F, 0xBC], dst, src);
    }

    /// BSR r64, r/m64 — `0F BD /r`.
    pub fn emit_bsr(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x0F, 0xBD], dst, src);
    }

    fn bt_group(&mut self, digit: u8, reg: Gpr, bit: u8) {
        self.push_u8(rex(true, false, false, reg.is_extended()));
        self.extend_from_slice(&[0x0F, 0xBA]);
        self.push_u8(modrm(0b11, digit, reg.low_bits()));
        self.push_u8(bit);
    }

    /// BT r/m64, imm8 — `0F BA /4 ib`.
    pub fn emit_bt(&mut self, reg: Gpr, bit: u8) {
        self.bt_group(4, reg, bit);
    }

    /// BTS r/m64, imm8 — `0F BA /5 ib`.
    pub fn emit_bts(&mut self, reg: Gpr, bit: u8) {
        self.bt_group(5, reg, bit);
    }

    /// BTR r/m64, imm8 — `0F BA /6 ib`.
    pub fn emit_btr(&mut self, reg: Gpr, bit: u8) {
        self.bt_group(6, reg, bit);
    }

    /// BTC r/m64, imm8 — `0F BA /7 ib`.
    pub fn emit_btc(&mut self, reg: Gpr, bit: u8) {
        self.bt_group(7, reg, bit);
    }
}

// ─── Atomics ───────────────────────────────────────────────

impl CodeBuffer {
    /// CMPXCHG r/m64, r64 — `0F B1 /r`.
    pub fn emit_cmpxchg(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x0F, 0xB1], src, dst);
    }

    /// XADD r/m64, r64 — `0F C1 /r`.
    pub fn emit_xadd(&mut self, dst: Gpr, src: Gpr) {
        self.rr64(&[0x0F, 0xC1], src, dst);
    }

    /// CMPXCHG8B m64 — `0F C7 /1` with a `[base]` operand.
    pub fn emit_cmpxchg8b(&mut self, base: Gpr) {
        self.mem_digit(false, &[0x0F, 0xC7], 1, base);
    }

    /// LOCK ADD — `F0` then the base encoding.
    pub fn emit_lock_add(&mut self, dst: Gpr, src: Gpr) {
        self.push_u8(0xF0);
        self.emit_add(dst, src);
    }

    /// LOCK SUB.
    pub fn emit_lock_sub(&mut self, dst: Gpr, src: Gpr) {
        self.push_u8(0xF0);
        self.emit_sub(dst, src);
    }

    /// LOCK AND.
    pub fn emit_lock_and(&mut self, dst: Gpr, src: Gpr) {
        self.push_u8(0xF0);
        self.emit_and(dst, src);
    }

    /// LOCK OR.
    pub fn emit_lock_or(&mut self, dst: Gpr, src: Gpr) {
        self.push_u8(0xF0);
        self.emit_or(dst, src);
    }

    /// LOCK XOR.
    pub fn emit_lock_xor(&mut self, dst: Gpr, src: Gpr) {
        self.push_u8(0xF0);
        self.emit_xor(dst, src);
    }

    /// LOCK INC.
    pub fn emit_lock_inc(&mut self, reg: Gpr) {
        self.push_u8(0xF0);
        self.emit_inc(reg);
    }

    /// LOCK DEC.
    pub fn emit_lock_dec(&mut self, reg: Gpr) {
        self.push_u8(0xF0);
        self.emit_dec(reg);
    }

    /// LOCK CMPXCHG.
    pub fn emit_lock_cmpxchg(&mut self, dst: Gpr, src: Gpr) {
        self.push_u8(0xF0);
        self.emit_cmpxchg(dst, src);
    }

    /// LOCK XADD.
    pub fn emit_lock_xadd(&mut self, dst: Gpr, src: Gpr) {
        self.push_u8(0xF0);
        self.emit_xadd(dst, src);
    }

    /// LOCK CMPXCHG8B m64.
    pub fn emit_lock_cmpxchg8b(&mut self, base: Gpr) {
        self.push_u8(0xF0);
        self.emit_cmpxchg8b(base);
    }
}

// ─── Fences, cache control & system ────────────────────────

impl CodeBuffer {
    /// NOP — `90`.
    pub fn emit_nop(&mut self) {
        self.push_u8(0x90);
    }

    /// Exactly `n` bytes of padding built from Intel-recommended
    /// multi-byte NOP sequences: 9-byte chunks, then one shorter
    /// remainder.
    pub fn emit_nops(&mut self, mut n: usize) {
        while n > 0 {
            let chunk = core::cmp::min(n, 9);
            self.extend_from_slice(NOP_SEQUENCES[chunk]);
            n -= chunk;
        }
    }

    /// PAUSE — `F3 90`, spin-loop hint. No REX.
    pub fn emit_pause(&mut self) {
        self.extend_from_slice(&[0xF3, 0x90]);
    }

    /// MFENCE — `0F AE F0`. No REX.
    pub fn emit_mfence(&mut self) {
        self.extend_from_slice(&[0x0F, 0xAE, 0xF0]);
    }

    /// SFENCE — `0F AE F8`.
    pub fn emit_sfence(&mut self) {
        self.extend_from_slice(&[0x0F, 0xAE, 0xF8]);
    }

    /// LFENCE — `0F AE E8`.
    pub fn emit_lfence(&mut self) {
        self.extend_from_slice(&[0x0F, 0xAE, 0xE8]);
    }

    /// CLFLUSH m8 — `0F AE /7` with a `[base]` operand.
    pub fn emit_clflush(&mut self, base: Gpr) {
        self.mem_digit(false, &[0x0F, 0xAE], 7, base);
    }

    /// CLFLUSHOPT m8 — `66 0F AE /7`.
    pub fn emit_clflushopt(&mut self, base: Gpr) {
        self.mem_digit(true, &[0x0F, 0xAE], 7, base);
    }

    /// PREFETCHT0 m8 — `0F 18 /1`.
    pub fn emit_prefetcht0(&mut self, base: Gpr) {
        self.mem_digit(false, &[0x0F, 0x18], 1, base);
    }

    /// PREFETCHT1 m8 — `0F 18 /2`.
    pub fn emit_prefetcht1(&mut self, base: Gpr) {
        self.mem_digit(false, &[0x0F, 0x18], 2, base);
    }

    /// PREFETCHT2 m8 — `0F 18 /3`.
    pub fn emit_prefetcht2(&mut self, base: Gpr) {
        self.mem_digit(false, &[0x0F, 0x18], 3, base);
    }

    /// PREFETCHNTA m8 — `0F 18 /0`.
    pub fn emit_prefetchnta(&mut self, base: Gpr) {
        self.mem_digit(false, &[0x0F, 0x18], 0, base);
    }

    /// SYSCALL — `0F 05`.
    pub fn emit_syscall(&mut self) {
        self.extend_from_slice(&[0x0F, 0x05]);
    }

    /// RET — `C3` (near return).
    pub fn emit_ret(&mut self) {
        self.push_u8(0xC3);
    }

    /// INT imm8 — `CD ib`.
    pub fn emit_int(&mut self, vector: u8) {
        self.push_u8(0xCD);
        self.push_u8(vector);
    }
}

// ─── Stack ─────────────────────────────────────────────────

impl CodeBuffer {
    /// PUSH r64 — `[REX.B] 50+rd`. Operand size defaults to 64 bits, so no
    /// REX.W.
    pub fn emit_push(&mut self, reg: Gpr) {
        if reg.is_extended() {
            self.push_u8(rex(false, false, false, true));
        }
        self.push_u8(0x50 + reg.low_bits());
    }

    /// POP r64 — `[REX.B] 58+rd`.
    pub fn emit_pop(&mut self, reg: Gpr) {
        if reg.is_extended() {
            self.push_u8(rex(false, false, false, true));
        }
        self.push_u8(0x58 + reg.low_bits());
    }
}

// ─── Indirect & numeric control flow ───────────────────────

impl CodeBuffer {
    /// JMP r64 — `[REX.B] FF /4`. Never pending, never shortened.
    pub fn emit_jmp_reg(&mut self, reg: Gpr) {
        if reg.is_extended() {
            self.push_u8(rex(false, false, false, true));
        }
        self.push_u8(0xFF);
        self.push_u8(modrm(0b11, 4, reg.low_bits()));
    }

    /// CALL r64 — `[REX.B] FF /2`.
    pub fn emit_call_reg(&mut self, reg: Gpr) {
        if reg.is_extended() {
            self.push_u8(rex(false, false, false, true));
        }
        self.push_u8(0xFF);
        self.push_u8(modrm(0b11, 2, reg.low_bits()));
    }

    /// CALL rel32 — `E8 cd` with the displacement written verbatim.
    ///
    /// Low-level escape hatch: does not participate in the label engine,
    /// and the branch shortening pass never touches it.
    pub fn emit_call_rel32(&mut self, disp: i32) {
        self.push_u8(0xE8);
        self.push_i32(disp);
    }

    /// JMP rel32 — `E9 cd`, written verbatim. Same escape hatch as
    /// [`emit_call_rel32`](Self::emit_call_rel32).
    pub fn emit_jmp_rel32(&mut self, disp: i32) {
        self.push_u8(0xE9);
        self.push_i32(disp);
    }
}

// ─── SSE scalar ────────────────────────────────────────────

impl CodeBuffer {
    /// MOVSS xmm, xmm — `F3 0F 10 /r`.
    pub fn emit_movss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x10], false, dst.code(), src.code());
    }

    /// MOVSD xmm, xmm — `F2 0F 10 /r`.
    pub fn emit_movsd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x10], false, dst.code(), src.code());
    }

    /// ADDSS xmm, xmm — `F3 0F 58 /r`.
    pub fn emit_addss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x58], false, dst.code(), src.code());
    }

    /// ADDSD xmm, xmm — `F2 0F 58 /r`.
    pub fn emit_addsd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x58], false, dst.code(), src.code());
    }

    /// SUBSS xmm, xmm — `F3 0F 5C /r`.
    pub fn emit_subss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x5C], false, dst.code(), src.code());
    }

    /// SUBSD xmm, xmm — `F2 0F 5C /r`.
    pub fn emit_subsd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x5C], false, dst.code(), src.code());
    }

    /// MULSS xmm, xmm — `F3 0F 59 /r`.
    pub fn emit_mulss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x59], false, dst.code(), src.code());
    }

    /// MULSD xmm, xmm — `F2 0F 59 /r`.
    pub fn emit_mulsd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x59], false, dst.code(), src.code());
    }

    /// DIVSS xmm, xmm — `F3 0F 5E /r`.
    pub fn emit_divss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x5E], false, dst.code(), src.code());
    }

    /// DIVSD xmm, xmm — `F2 0F 5E /r`.
    pub fn emit_divsd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x5E], false, dst.code(), src.code());
    }

    /// SQRTSS xmm, xmm — `F3 0F 51 /r`.
    pub fn emit_sqrtss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x51], false, dst.code(), src.code());
    }

    /// SQRTSD xmm, xmm — `F2 0F 51 /r`.
    pub fn emit_sqrtsd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x51], false, dst.code(), src.code());
    }

    /// COMISS xmm, xmm — `0F 2F /r` (no mandatory prefix).
    pub fn emit_comiss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0x00, &[0x0F, 0x2F], false, dst.code(), src.code());
    }

    /// COMISD xmm, xmm — `66 0F 2F /r`.
    pub fn emit_comisd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0x66, &[0x0F, 0x2F], false, dst.code(), src.code());
    }

    /// CVTSS2SD xmm, xmm — `F3 0F 5A /r`.
    pub fn emit_cvtss2sd(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x5A], false, dst.code(), src.code());
    }

    /// CVTSD2SS xmm, xmm — `F2 0F 5A /r`.
    pub fn emit_cvtsd2ss(&mut self, dst: Xmm, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x5A], false, dst.code(), src.code());
    }

    /// CVTSI2SS xmm, r64 — `F3 REX.W 0F 2A /r`. W is required for the
    /// 64-bit integer source.
    pub fn emit_cvtsi2ss(&mut self, dst: Xmm, src: Gpr) {
        self.sse_rr(0xF3, &[0x0F, 0x2A], true, dst.code(), src.code());
    }

    /// CVTSI2SD xmm, r64 — `F2 REX.W 0F 2A /r`.
    pub fn emit_cvtsi2sd(&mut self, dst: Xmm, src: Gpr) {
        self.sse_rr(0xF2, &[0x0F, 0x2A], true, dst.code(), src.code());
    }

    /// CVTSS2SI r64, xmm — `F3 REX.W 0F 2D /r`.
    pub fn emit_cvtss2si(&mut self, dst: Gpr, src: Xmm) {
        self.sse_rr(0xF3, &[0x0F, 0x2D], true, dst.code(), src.code());
    }

    /// CVTSD2SI r64, xmm — `F2 REX.W 0F 2D /r`.
    pub fn emit_cvtsd2si(&mut self, dst: Gpr, src: Xmm) {
        self.sse_rr(0xF2, &[0x0F, 0x2D], true, dst.code(), src.code());
    }
}

// ─── x87 ───────────────────────────────────────────────────

impl CodeBuffer {
    /// FLD ST(i) — `D9 /0`, pushes ST(i) onto the stack.
    pub fn emit_fld(&mut self, st: St) {
        self.x87(0xD9, 0, st);
    }

    /// FST ST(i) — `DD /2`.
    pub fn emit_fst(&mut self, st: St) {
        self.x87(0xDD, 2, st);
    }

    /// FSTP ST(i) — `DD /3`, store and pop.
    pub fn emit_fstp(&mut self, st: St) {
        self.x87(0xDD, 3, st);
    }

    /// FADD ST(0), ST(i) — `D8 /0`.
    pub fn emit_fadd(&mut self, st: St) {
        self.x87(0xD8, 0, st);
    }

    /// FMUL ST(0), ST(i) — `D8 /1`.
    pub fn emit_fmul(&mut self, st: St) {
        self.x87(0xD8, 1, st);
    }

    /// FCOM ST(i) — `D8 /2`.
    pub fn emit_fcom(&mut self, st: St) {
        self.x87(0xD8, 2, st);
    }

    /// FCOMP ST(i) — `D8 /3`, compare and pop.
    pub fn emit_fcomp(&mut self, st: St) {
        self.x87(0xD8, 3, st);
    }

    /// FSUB ST(0), ST(i) — `D8 /4`.
    pub fn emit_fsub(&mut self, st: St) {
        self.x87(0xD8, 4, st);
    }

    /// FDIV ST(0), ST(i) — `D8 /6`.
    pub fn emit_fdiv(&mut self, st: St) {
        self.x87(0xD8, 6, st);
    }

    /// FSIN — `D9 FE`.
    pub fn emit_fsin(&mut self) {
        self.extend_from_slice(&[0xD9, 0xFE]);
    }

    /// FCOS — `D9 FF`.
    pub fn emit_fcos(&mut self) {
        self.extend_from_slice(&[0xD9, 0xFF]);
    }

    /// FSQRT — `D9 FA`.
    pub fn emit_fsqrt(&mut self) {
        self.extend_from_slice(&[0xD9, 0xFA]);
    }

    /// FABS — `D9 E1`.
    pub fn emit_fabs(&mut self) {
        self.extend_from_slice(&[0xD9, 0xE1]);
    }

    /// FCHS — `D9 E0`.
    pub fn emit_fchs(&mut self) {
        self.extend_from_slice(&[0xD9, 0xE0]);
    }
}
