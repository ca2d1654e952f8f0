//! Emit a small function and print its machine code.
//!
//! Run with: `cargo run --example basic`

use x64emit::{CodeBuffer, Gpr};

fn main() {
    // long add(long a /* rdi */, long b /* rsi */) { return a + b; }
    let mut buf = CodeBuffer::new();
    buf.emit_mov(Gpr::Rax, Gpr::Rdi);
    buf.emit_add(Gpr::Rax, Gpr::Rsi);
    buf.emit_ret();

    println!("add(rdi, rsi):");
    println!("  {}", buf.format_hex());
    println!("  {} bytes", buf.len());
}
