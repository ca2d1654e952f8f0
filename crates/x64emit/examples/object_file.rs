//! Produce a relocatable ELF object calling an external function.
//!
//! Run with: `cargo run --example object_file > caller.o`
//! Then:     `objdump -dr caller.o`

use std::io::Write;

use x64emit::{CodeBuffer, Gpr, ObjectWriter, RelocKind, SymbolBinding, SymbolType};

fn main() {
    let mut buf = CodeBuffer::new();
    let helper = buf.new_label();
    buf.emit_push(Gpr::Rbp);
    buf.emit_mov(Gpr::Rbp, Gpr::Rsp);
    buf.emit_call(helper);
    buf.emit_pop(Gpr::Rbp);
    buf.emit_ret();
    // The helper is external; bind its label at 0 and let the relocation
    // patch the displacement at link time.
    buf.define_label(helper).unwrap();
    buf.resolve_all().unwrap();

    let call_site = buf.pending_branches()[0].site;
    let len = buf.len() as u64;

    let mut obj = ObjectWriter::new();
    obj.set_file("caller.rs");
    obj.add_section(".text", buf.into_bytes(), 16);
    obj.add_symbol("caller", Some(".text"), 0, len, SymbolBinding::Global, SymbolType::Func);
    obj.add_symbol("helper", None, 0, 0, SymbolBinding::Global, SymbolType::NoType);
    obj.add_relocation(".text", (call_site + 1) as u64, "helper", RelocKind::Pc32, -4);

    let elf = obj.write().unwrap();
    std::io::stdout().write_all(&elf).unwrap();
}
