//! Serde round-trip tests for the public value types.

#![cfg(feature = "serde")]

use x64emit::{BranchKind, CodeBuffer, EmitError, Gpr, St, SymbolBinding, SymbolType, Xmm};

/// Helper: serialize to JSON, deserialize back, assert equality.
fn round_trip<T>(val: &T)
where
    T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + core::fmt::Debug,
{
    let json = serde_json::to_string(val).expect("serialize");
    let back: T = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(val, &back, "round-trip mismatch for JSON: {json}");
}

#[test]
fn serde_registers() {
    for idx in 0..16 {
        round_trip(&Gpr::from_index(idx).unwrap());
        round_trip(&Xmm::from_index(idx).unwrap());
    }
    for idx in 0..8 {
        round_trip(&St::from_index(idx).unwrap());
    }
}

#[test]
fn serde_branch_kinds() {
    for kind in [
        BranchKind::Call,
        BranchKind::Jmp,
        BranchKind::Je,
        BranchKind::Jne,
        BranchKind::Jg,
        BranchKind::Jl,
        BranchKind::Jge,
        BranchKind::Jle,
        BranchKind::Ja,
        BranchKind::Jb,
        BranchKind::Jae,
        BranchKind::Jbe,
    ] {
        round_trip(&kind);
    }
}

#[test]
fn serde_label_and_pending_branch() {
    let mut buf = CodeBuffer::new();
    let label = buf.new_label();
    round_trip(&label);

    buf.emit_jne(label);
    buf.define_label(label).unwrap();
    round_trip(&buf.pending_branches()[0]);
}

#[test]
fn serde_errors() {
    let mut buf = CodeBuffer::new();
    let label = buf.new_label();
    round_trip(&EmitError::UndefinedLabel { label, site: 12 });
    round_trip(&EmitError::DuplicateLabel {
        label,
        first_offset: 3,
    });
    round_trip(&EmitError::PatchOutOfRange {
        offset: 1,
        len: 4,
        buffer_len: 2,
    });
    round_trip(&EmitError::InvalidShiftCount { count: 99 });
    round_trip(&EmitError::ShorteningLimit { max: 10 });
}

#[test]
fn serde_object_writer_enums() {
    for binding in [SymbolBinding::Local, SymbolBinding::Global, SymbolBinding::Weak] {
        round_trip(&binding);
    }
    for ty in [
        SymbolType::NoType,
        SymbolType::Object,
        SymbolType::Func,
        SymbolType::Section,
        SymbolType::File,
        SymbolType::Tls,
    ] {
        round_trip(&ty);
    }
    for kind in [
        x64emit::RelocKind::Abs64,
        x64emit::RelocKind::Pc32,
        x64emit::RelocKind::Plt32,
        x64emit::RelocKind::Abs32,
        x64emit::RelocKind::Tpoff32,
    ] {
        round_trip(&kind);
    }
}
