//! Labels, branches, and shortening: a countdown loop.
//!
//! Run with: `cargo run --example countdown`

use x64emit::{CodeBuffer, Gpr};

fn main() {
    // for (rcx = 10; rcx != 0; rcx--) ;
    let mut buf = CodeBuffer::new();
    let top = buf.new_label();
    buf.emit_mov_imm32(Gpr::Rcx, 10);
    buf.define_label(top).unwrap();
    buf.emit_dec(Gpr::Rcx);
    buf.emit_jne(top);
    buf.emit_ret();

    println!("before shortening: {}", buf.format_hex());
    let code = buf.finalize().unwrap();

    let mut out = CodeBuffer::new();
    out.extend_from_slice(&code);
    println!("after shortening:  {}", out.format_hex());
}
