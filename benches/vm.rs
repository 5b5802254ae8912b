#[macro_use]
extern crate criterion;

extern crate tpu;

use criterion::Criterion;

use tpu::isa::{JmpCond, Op};
use tpu::memory::{Address, Memory};
use tpu::register::Register;
use tpu::vm::Cpu;

/// `movw CX, 0xffff` then `sub CX, 1` / `jnz` back to the `sub` - a tight
/// loop with no syscalls, so the measured cost is pure fetch/decode/execute.
fn build_loop_program() -> (Memory, u16) {
    let mut mem = Memory::new();
    let mut addr = 0u16;
    let mut emit = |mem: &mut Memory, bytes: &[u8]| {
        mem.write_bytes(Address::new(addr), bytes);
        addr += bytes.len() as u16;
    };

    emit(&mut mem, &[Op::Movw.code(), 0, Register::CX.code(), 0xFF, 0xFF]);
    let loop_start = addr;
    emit(&mut mem, &[Op::Sub.code(), 1, Register::CX.code(), 0x01, 0x00]);
    emit(
        &mut mem,
        &[
            Op::Jmp.code(),
            JmpCond::IfNotZero.code(),
            (loop_start & 0xFF) as u8,
            (loop_start >> 8) as u8,
        ],
    );
    emit(&mut mem, &[Op::Hlt.code()]);
    (mem, loop_start)
}

fn execute_sub_jnz_loop_body(c: &mut Criterion) {
    let (mem, _loop_start) = build_loop_program();
    let mut cpu = Cpu::new(mem);
    // step past the initial `movw` once so every measured step lands on the
    // `sub`/`jmp` pair.
    cpu.step().unwrap();

    c.bench_function("step through sub/jnz loop body", |b| {
        b.iter(|| {
            cpu.step().unwrap();
            cpu.step().unwrap();
        })
    });
}

criterion_group!(benches, execute_sub_jnz_loop_body);
criterion_main!(benches);
