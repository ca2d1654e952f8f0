//! Property-based tests using proptest.
//!
//! These verify the emitter's structural invariants across randomly
//! generated instruction streams and branch/label programs, complementing
//! the targeted reference-byte and cross-validation suites.

use proptest::prelude::*;
use x64emit::{BranchKind, CodeBuffer, Gpr, LabelId};

// ── Strategies ──────────────────────────────────────────────────────────

fn arb_gpr() -> impl Strategy<Value = Gpr> {
    (0u8..16).prop_map(|idx| Gpr::from_index(idx).unwrap())
}

/// A simple straight-line instruction together with its encoded length.
#[derive(Debug, Clone)]
enum Op {
    MovRr(Gpr, Gpr),
    AddRr(Gpr, Gpr),
    MovImm64(Gpr, u64),
    AddImm32(Gpr, i32),
    Shift(Gpr, u8),
    Push(Gpr),
    Pop(Gpr),
    Nop,
    Ret,
}

impl Op {
    fn emit(&self, buf: &mut CodeBuffer) {
        match *self {
            Op::MovRr(a, b) => buf.emit_mov(a, b),
            Op::AddRr(a, b) => buf.emit_add(a, b),
            Op::MovImm64(r, imm) => buf.emit_mov_imm64(r, imm),
            Op::AddImm32(r, imm) => buf.emit_add_imm32(r, imm),
            Op::Shift(r, count) => buf.emit_shl(r, count).unwrap(),
            Op::Push(r) => buf.emit_push(r),
            Op::Pop(r) => buf.emit_pop(r),
            Op::Nop => buf.emit_nop(),
            Op::Ret => buf.emit_ret(),
        }
    }

    fn encoded_len(&self) -> usize {
        match *self {
            Op::MovRr(..) | Op::AddRr(..) => 3,
            Op::MovImm64(..) => 10,
            Op::AddImm32(..) => 7,
            Op::Shift(_, count) => {
                if count == 1 {
                    3
                } else {
                    4
                }
            }
            Op::Push(r) | Op::Pop(r) => {
                if r.is_extended() {
                    2
                } else {
                    1
                }
            }
            Op::Nop | Op::Ret => 1,
        }
    }
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_gpr(), arb_gpr()).prop_map(|(a, b)| Op::MovRr(a, b)),
        (arb_gpr(), arb_gpr()).prop_map(|(a, b)| Op::AddRr(a, b)),
        (arb_gpr(), any::<u64>()).prop_map(|(r, imm)| Op::MovImm64(r, imm)),
        (arb_gpr(), any::<i32>()).prop_map(|(r, imm)| Op::AddImm32(r, imm)),
        (arb_gpr(), 0u8..64).prop_map(|(r, count)| Op::Shift(r, count)),
        arb_gpr().prop_map(Op::Push),
        arb_gpr().prop_map(Op::Pop),
        Just(Op::Nop),
        Just(Op::Ret),
    ]
}

const LABEL_SLOTS: usize = 8;

/// A branch/label program: per segment, leading NOP padding, one branch
/// kind, and a target label slot. Label `i` is defined at the start of
/// segment `i` (leftover slots are defined at the end), so every branch
/// target is eventually defined.
fn build_program(segments: &[(usize, u8, usize)]) -> (CodeBuffer, Vec<LabelId>) {
    let mut buf = CodeBuffer::new();
    let labels: Vec<LabelId> = (0..LABEL_SLOTS).map(|_| buf.new_label()).collect();

    for (i, &(nops, kind, target)) in segments.iter().enumerate() {
        if i < LABEL_SLOTS {
            buf.define_label(labels[i]).unwrap();
        }
        buf.emit_nops(nops);
        let target = labels[target % LABEL_SLOTS];
        match kind % 12 {
            0 => buf.emit_call(target),
            1 => buf.emit_jmp(target),
            2 => buf.emit_je(target),
            3 => buf.emit_jne(target),
            4 => buf.emit_jg(target),
            5 => buf.emit_jl(target),
            6 => buf.emit_jge(target),
            7 => buf.emit_jle(target),
            8 => buf.emit_ja(target),
            9 => buf.emit_jb(target),
            10 => buf.emit_jae(target),
            _ => buf.emit_jbe(target),
        }
    }
    for i in segments.len().min(LABEL_SLOTS)..LABEL_SLOTS {
        buf.define_label(labels[i]).unwrap();
    }
    (buf, labels)
}

fn arb_segments() -> impl Strategy<Value = Vec<(usize, u8, usize)>> {
    prop::collection::vec((0usize..200, any::<u8>(), 0usize..LABEL_SLOTS), 1..LABEL_SLOTS)
}

// ── Straight-line properties ────────────────────────────────────────────

proptest! {
    /// Emitting N instructions yields exactly the sum of their lengths.
    #[test]
    fn buffer_length_is_sum_of_lengths(ops in prop::collection::vec(arb_op(), 0..64)) {
        let mut buf = CodeBuffer::new();
        let mut expected = 0usize;
        for op in &ops {
            op.emit(&mut buf);
            expected += op.encoded_len();
        }
        prop_assert_eq!(buf.len(), expected);
    }

    /// format_hex output length and charset are exact.
    #[test]
    fn format_hex_shape(ops in prop::collection::vec(arb_op(), 0..16)) {
        let mut buf = CodeBuffer::new();
        for op in &ops {
            op.emit(&mut buf);
        }
        let hex = buf.format_hex();
        if buf.is_empty() {
            prop_assert_eq!(hex, "");
        } else {
            prop_assert_eq!(hex.len(), buf.len() * 3 - 1);
            prop_assert!(hex
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase() || c == ' '));
        }
    }
}

// ── Branch-engine properties ────────────────────────────────────────────

proptest! {
    /// A forward JMP over N NOPs shortens exactly when N fits in rel8.
    #[test]
    fn forward_jmp_form_selection(n in 0usize..300) {
        let mut buf = CodeBuffer::new();
        let label = buf.new_label();
        buf.emit_jmp(label);
        for _ in 0..n {
            buf.emit_nop();
        }
        buf.define_label(label).unwrap();
        buf.shorten().unwrap();

        let br = buf.pending_branches()[0];
        if n <= 127 {
            prop_assert_eq!(br.len, 2);
            prop_assert_eq!(buf.bytes()[0], 0xEB);
            prop_assert_eq!(buf.bytes()[1], n as u8);
            prop_assert_eq!(buf.len(), n + 2);
        } else {
            prop_assert_eq!(br.len, 5);
            prop_assert_eq!(buf.bytes()[0], 0xE9);
            prop_assert_eq!(buf.len(), n + 5);
        }
    }

    /// Random branch/label programs resolve and shorten without error; the
    /// buffer never grows; every displacement decodes back to
    /// `target − (site + len)`; CALL keeps its 5 bytes.
    #[test]
    fn branch_programs_reach_consistent_fixed_point(segments in arb_segments()) {
        let (mut buf, _labels) = build_program(&segments);
        let len_before = buf.len();

        buf.resolve_all().unwrap();
        prop_assert_eq!(buf.len(), len_before, "resolution must not move bytes");

        buf.shorten().unwrap();
        prop_assert!(buf.len() <= len_before, "shortening must be monotone");

        for br in buf.pending_branches() {
            match br.kind {
                BranchKind::Call => prop_assert_eq!(br.len, 5),
                BranchKind::Jmp => prop_assert!(br.len == 2 || br.len == 5),
                _ => prop_assert!(br.len == 2 || br.len == 6),
            }

            let len = br.len as usize;
            let target = buf.label_offset(br.target).unwrap() as i64;
            let end = (br.site + len) as i64;
            let encoded = if len == 2 {
                buf.bytes()[br.site + 1] as i8 as i64
            } else {
                let raw: [u8; 4] = buf.bytes()[br.site + len - 4..br.site + len]
                    .try_into()
                    .unwrap();
                i64::from(i32::from_le_bytes(raw))
            };
            prop_assert_eq!(encoded, target - end);
        }
    }

    /// shorten and resolve_all are idempotent at the fixed point.
    #[test]
    fn fixed_point_is_stable(segments in arb_segments()) {
        let (mut buf, _labels) = build_program(&segments);
        buf.resolve_all().unwrap();
        buf.shorten().unwrap();
        let settled = buf.bytes().to_vec();

        buf.shorten().unwrap();
        prop_assert_eq!(buf.bytes(), &settled[..]);

        buf.resolve_all().unwrap();
        prop_assert_eq!(buf.bytes(), &settled[..]);
    }

    /// Label offsets always point into the buffer (or at its end) after
    /// shortening.
    #[test]
    fn labels_remain_in_bounds(segments in arb_segments()) {
        let (mut buf, labels) = build_program(&segments);
        buf.shorten().unwrap();
        for label in labels {
            let offset = buf.label_offset(label).unwrap();
            prop_assert!(offset <= buf.len());
        }
    }
}
