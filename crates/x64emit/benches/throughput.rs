//! Performance benchmarks for `x64emit`.
//!
//! Measures:
//! - Single instruction emit latency
//! - Straight-line block throughput (bytes of machine code per second)
//! - Label-heavy workloads with full resolution and shortening
//! - Hex formatting for diagnostics
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use x64emit::{CodeBuffer, Gpr, Xmm};

// ─── Single-Instruction Latency ──────────────────────────────────────────────

fn bench_single_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_emit");

    group.bench_function("mov_rr", |b| {
        b.iter(|| {
            let mut buf = CodeBuffer::new();
            buf.emit_mov(black_box(Gpr::Rax), black_box(Gpr::Rbx));
            buf
        })
    });

    group.bench_function("mov_imm64", |b| {
        b.iter(|| {
            let mut buf = CodeBuffer::new();
            buf.emit_mov_imm64(black_box(Gpr::Rax), black_box(0x1234));
            buf
        })
    });

    group.bench_function("addsd", |b| {
        b.iter(|| {
            let mut buf = CodeBuffer::new();
            buf.emit_addsd(black_box(Xmm::Xmm0), black_box(Xmm::Xmm1));
            buf
        })
    });

    group.finish();
}

// ─── Block Throughput ────────────────────────────────────────────────────────

fn emit_block(buf: &mut CodeBuffer, n: usize) {
    for i in 0..n {
        match i % 6 {
            0 => buf.emit_mov(Gpr::Rax, Gpr::Rbx),
            1 => buf.emit_add(Gpr::Rcx, Gpr::Rdx),
            2 => buf.emit_sub(Gpr::Rsi, Gpr::Rdi),
            3 => buf.emit_xor(Gpr::R8, Gpr::R9),
            4 => buf.emit_and(Gpr::R10, Gpr::R11),
            _ => buf.emit_or(Gpr::R12, Gpr::R13),
        }
    }
}

fn bench_block_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_throughput");
    for n in [100usize, 1_000, 10_000] {
        let mut probe = CodeBuffer::new();
        emit_block(&mut probe, n);
        group.throughput(Throughput::Bytes(probe.len() as u64));
        group.bench_function(format!("{n}_instructions"), |b| {
            b.iter(|| {
                let mut buf = CodeBuffer::with_capacity(n * 3);
                emit_block(&mut buf, black_box(n));
                buf
            })
        });
    }
    group.finish();
}

// ─── Label-Heavy Workloads ───────────────────────────────────────────────────

/// N back-to-back compare/branch blocks, every branch shortenable.
fn bench_labels_and_shortening(c: &mut Criterion) {
    let mut group = c.benchmark_group("labels");

    for n in [10usize, 100] {
        group.bench_function(format!("{n}_branches_finalize"), |b| {
            b.iter(|| {
                let mut buf = CodeBuffer::new();
                for _ in 0..n {
                    let skip = buf.new_label();
                    buf.emit_cmp(Gpr::Rax, Gpr::Rbx);
                    buf.emit_jg(skip);
                    buf.emit_mov(Gpr::Rax, Gpr::Rbx);
                    buf.define_label(skip).unwrap();
                }
                buf.emit_ret();
                buf.finalize().unwrap()
            })
        });
    }

    group.finish();
}

// ─── Diagnostics ─────────────────────────────────────────────────────────────

fn bench_format_hex(c: &mut Criterion) {
    let mut buf = CodeBuffer::new();
    emit_block(&mut buf, 1_000);
    c.bench_function("format_hex_3kb", |b| b.iter(|| black_box(&buf).format_hex()));
}

criterion_group!(
    benches,
    bench_single_emit,
    bench_block_throughput,
    bench_labels_and_shortening,
    bench_format_hex
);
criterion_main!(benches);
