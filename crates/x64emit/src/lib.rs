//! # x64emit — x86-64 Machine-Code Emitter
//!
//! `x64emit` is a pure Rust, dependency-free x86-64 machine-code emitter:
//! typed emit operations append encoded instructions to a growing byte
//! buffer, symbolic branch targets resolve through a two-phase label
//! mechanism, and a shortening pass rewrites long branches to their 2-byte
//! form when the displacement fits in a signed byte.
//!
//! ## Quick Start
//!
//! ```rust
//! use x64emit::{CodeBuffer, Gpr};
//!
//! let mut buf = CodeBuffer::new();
//! buf.emit_add(Gpr::Rax, Gpr::Rbx);
//! buf.emit_ret();
//! assert_eq!(buf.bytes(), &[0x48, 0x01, 0xD8, 0xC3]);
//! ```
//!
//! ## Labels & branch shortening
//!
//! ```rust
//! use x64emit::{CodeBuffer, Gpr};
//!
//! let mut buf = CodeBuffer::new();
//! let skip = buf.new_label();
//! buf.emit_cmp(Gpr::Rax, Gpr::Rbx);
//! buf.emit_jg(skip);
//! buf.emit_mov(Gpr::Rax, Gpr::Rbx);
//! buf.define_label(skip).unwrap();
//! buf.emit_ret();
//!
//! let code = buf.finalize().unwrap();
//! assert_eq!(
//!     code,
//!     vec![0x48, 0x39, 0xD8, 0x7F, 0x03, 0x48, 0x89, 0xD8, 0xC3]
//! );
//! ```
//!
//! ## Features
//!
//! - **Pure Rust** — no runtime dependencies, no FFI, no system assembler.
//! - **Typed operands** — registers are enums, not strings; invalid
//!   encodings are unrepresentable.
//! - **Two-phase labels** — reference forward, define later, resolve once.
//! - **Branch shortening** — monotone fixed-point pass picks `rel8` forms.
//! - **ELF-64 objects** — a relocatable object writer for linking the
//!   emitted code into ordinary toolchains.
//! - **`no_std` + `alloc`** — embeddable in runtimes and JIT hosts.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// An instruction encoder intentionally performs many narrowing and
// sign-changing casts between integer widths and is written against dense
// hex literals; the lints below are expected in this context.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless,
    clippy::unreadable_literal,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::uninlined_format_args,
    clippy::return_self_not_must_use
)]

extern crate alloc;

/// Label allocation, pending branches, displacement resolution, and the
/// branch shortening pass.
pub mod branch;
/// The code buffer: byte appends, little-endian writes, in-place patching,
/// and branch metadata.
pub mod buffer;
/// ELF-64 relocatable object writer.
pub mod elf;
/// Instruction encoder: REX / ModR/M / SIB construction and every typed
/// emit operation.
pub(crate) mod encoder;
/// Error types.
pub mod error;
/// Register value types.
pub mod reg;

// Re-exports
pub use branch::{BranchKind, LabelId, PendingBranch, MAX_SHORTEN_PASSES};
pub use buffer::CodeBuffer;
pub use elf::{ObjectWriter, RelocKind, SymbolBinding, SymbolType};
pub use error::EmitError;
pub use reg::{Gpr, St, Xmm};
