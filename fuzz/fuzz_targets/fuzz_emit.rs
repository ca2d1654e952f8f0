#![no_main]
use libfuzzer_sys::fuzz_target;
use x64emit::{CodeBuffer, Gpr, St, Xmm};

// Interpret the fuzz input as an opcode script driving the emitter. The
// emitter must never panic — every outcome is Ok bytes or a typed error.
fuzz_target!(|data: &[u8]| {
    let mut buf = CodeBuffer::new();
    let mut labels = Vec::new();
    let mut bytes = data.iter().copied();

    while let Some(op) = bytes.next() {
        let mut arg = || bytes.next().unwrap_or(0);
        match op % 24 {
            0 => labels.push(buf.new_label()),
            1 => {
                if let Some(&label) = labels.get(arg() as usize % labels.len().max(1)) {
                    let _ = buf.define_label(label);
                }
            }
            2 => {
                if let Some(&label) = labels.get(arg() as usize % labels.len().max(1)) {
                    match arg() % 12 {
                        0 => buf.emit_call(label),
                        1 => buf.emit_jmp(label),
                        2 => buf.emit_je(label),
                        3 => buf.emit_jne(label),
                        4 => buf.emit_jg(label),
                        5 => buf.emit_jl(label),
                        6 => buf.emit_jge(label),
                        7 => buf.emit_jle(label),
                        8 => buf.emit_ja(label),
                        9 => buf.emit_jb(label),
                        10 => buf.emit_jae(label),
                        _ => buf.emit_jbe(label),
                    }
                }
            }
            3 => {
                let (a, b) = (gpr(arg()), gpr(arg()));
                buf.emit_mov(a, b);
            }
            4 => {
                let (a, b) = (gpr(arg()), gpr(arg()));
                buf.emit_add(a, b);
            }
            5 => {
                let (a, b) = (gpr(arg()), gpr(arg()));
                buf.emit_cmp(a, b);
            }
            6 => buf.emit_mov_imm64(gpr(arg()), u64::from(arg()) << 32 | u64::from(arg())),
            7 => buf.emit_add_imm32(gpr(arg()), arg() as i32 - 128),
            8 => {
                let _ = buf.emit_shl(gpr(arg()), arg());
            }
            9 => {
                let _ = buf.emit_sar(gpr(arg()), arg());
            }
            10 => buf.emit_bt(gpr(arg()), arg()),
            11 => buf.emit_push(gpr(arg())),
            12 => buf.emit_pop(gpr(arg())),
            13 => buf.emit_nop(),
            14 => buf.emit_nops(arg() as usize % 32),
            15 => buf.emit_ret(),
            16 => buf.emit_int(arg()),
            17 => {
                let (a, b) = (xmm(arg()), xmm(arg()));
                buf.emit_addsd(a, b);
            }
            18 => buf.emit_cvtsi2sd(xmm(arg()), gpr(arg())),
            19 => buf.emit_fld(st(arg())),
            20 => buf.emit_fadd(st(arg())),
            21 => buf.emit_lock_xadd(gpr(arg()), gpr(arg())),
            22 => buf.emit_cmpxchg8b(gpr(arg())),
            _ => buf.emit_jmp_reg(gpr(arg())),
        }
    }

    // Diagnostics must always be renderable.
    let _ = buf.format_hex();

    // Resolution and shortening either succeed or return a typed error;
    // shortening must stay monotone when it runs.
    let len_before = buf.len();
    let mut resolved = buf.clone();
    if resolved.resolve_all().is_ok() {
        assert_eq!(resolved.len(), len_before);
        match resolved.shorten() {
            Ok(()) => assert!(resolved.len() <= len_before),
            Err(x64emit::EmitError::ShorteningLimit { .. }) => {}
            Err(err) => panic!("unexpected shorten error: {err}"),
        }
    }
    let _ = buf.finalize();
});

fn gpr(idx: u8) -> Gpr {
    Gpr::from_index(idx % 16).unwrap()
}

fn xmm(idx: u8) -> Xmm {
    Xmm::from_index(idx % 16).unwrap()
}

fn st(idx: u8) -> St {
    St::from_index(idx % 8).unwrap()
}
