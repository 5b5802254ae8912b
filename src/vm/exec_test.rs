use pretty_assertions::assert_eq;

use crate::isa::Op;
use crate::memory::{Address, Memory, INSTRUCTION_PTR_START, TEXT_LOWER_ADDR};
use crate::register::Register;

use super::Cpu;

fn cpu_with_text(bytes: &[u8]) -> Cpu<Vec<u8>> {
    let mut mem = Memory::new();
    mem.write_bytes(Address::new(TEXT_LOWER_ADDR), bytes);
    let mut cpu = Cpu::new_with_output(mem, Vec::new());
    cpu.regs.ip = TEXT_LOWER_ADDR;
    cpu
}

#[test]
fn ip_advances_past_the_instruction_just_executed() {
    // nop
    let mut cpu = cpu_with_text(&[Op::Nop.code()]);
    cpu.step().unwrap();
    assert_eq!(cpu.regs.ip, TEXT_LOWER_ADDR + 1);
}

#[test]
fn mov_al_imm_then_add_al_1_sets_zero_and_carry() {
    // mov AL, 255 ; add AL, 1
    let bytes = [
        Op::Mov.code(), 2, Register::AL.code(), 255,
        Op::Add.code(), 0, Register::AL.code(), 1,
    ];
    let mut cpu = cpu_with_text(&bytes);
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.regs.read8(Register::AL), 0);
    assert!(cpu.regs.flags.zero());
    assert!(cpu.regs.flags.carry());
    assert!(!cpu.regs.flags.sign());
    assert!(cpu.regs.flags.parity());
}

#[test]
fn logical_op_leaves_carry_and_overflow_unchanged() {
    // mov AL, 255 ; add AL, 1 (-> AL=0, CARRY=1) ; and AL, AL (reg,reg shape)
    let bytes = [
        Op::Mov.code(), 2, Register::AL.code(), 255,
        Op::Add.code(), 0, Register::AL.code(), 1,
        Op::And.code(), 2, Register::AL.code(), Register::AL.code(),
    ];
    let mut cpu = cpu_with_text(&bytes);
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert!(cpu.regs.flags.carry());

    cpu.step().unwrap();
    assert_eq!(cpu.regs.read8(Register::AL), 0);
    assert!(cpu.regs.flags.zero());
    assert!(
        cpu.regs.flags.carry(),
        "AND must leave CARRY untouched, not reset it"
    );
}

#[test]
fn push_then_pop_same_register_is_identity() {
    let bytes = [
        Op::Push.code(), 0, Register::AL.code(),
        Op::Pop.code(), 1, Register::AL.code(),
    ];
    let mut cpu = cpu_with_text(&bytes);
    cpu.regs.write8(Register::AL, 0x42);
    let sp_before = cpu.regs.sp;
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.regs.read8(Register::AL), 0x42);
    assert_eq!(cpu.regs.sp, sp_before);
}

#[test]
fn pushw_then_popw_same_register_is_identity() {
    let bytes = [
        Op::Push.code(), 1, Register::AX.code(),
        Op::Popw.code(), 1, Register::AX.code(),
    ];
    let mut cpu = cpu_with_text(&bytes);
    cpu.regs.write16(Register::AX, 0xBEEF);
    let sp_before = cpu.regs.sp;
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.regs.read16(Register::AX), 0xBEEF);
    assert_eq!(cpu.regs.sp, sp_before);
}

#[test]
fn call_then_ret_restores_ip() {
    // at TEXT_LOWER_ADDR: call TEXT_LOWER_ADDR+7 ; nop (this is the return site)
    // at TEXT_LOWER_ADDR+7: ret
    let target = TEXT_LOWER_ADDR + 7;
    let mut bytes = vec![Op::Call.code()];
    bytes.extend_from_slice(&target.to_le_bytes());
    bytes.push(Op::Nop.code());
    while bytes.len() < 7 {
        bytes.push(Op::Nop.code());
    }
    bytes.push(Op::Ret.code());
    let mut cpu = cpu_with_text(&bytes);
    cpu.step().unwrap(); // call
    assert_eq!(cpu.regs.ip, target);
    cpu.step().unwrap(); // ret
    assert_eq!(cpu.regs.ip, TEXT_LOWER_ADDR + 3);
}

#[test]
fn hello_world_syscall_writes_expected_bytes_and_exit_status() {
    use crate::memory::DATA_LOWER_ADDR;

    let mut mem = Memory::new();
    mem.write_bytes(Address::new(DATA_LOWER_ADDR), b"hi");
    let bytes = [
        Op::Movw.code(), 0, Register::BX.code(),
    ];
    let mut full = bytes.to_vec();
    full.extend_from_slice(&DATA_LOWER_ADDR.to_le_bytes());
    full.push(Op::Movw.code());
    full.push(0);
    full.push(Register::CX.code());
    full.extend_from_slice(&2u16.to_le_bytes());
    full.push(Op::Movw.code());
    full.push(0);
    full.push(Register::AX.code());
    full.extend_from_slice(&super::SYSCALL_STDOUT.to_le_bytes());
    full.push(Op::Syscall.code());
    full.push(Op::Hlt.code());

    mem.write_bytes(Address::new(TEXT_LOWER_ADDR), &full);
    let mut cpu = Cpu::new_with_output(mem, Vec::new());
    cpu.regs.ip = TEXT_LOWER_ADDR;
    cpu.start().unwrap();

    assert_eq!(cpu.out_for_test().as_slice(), b"hi");
    assert_eq!(cpu.regs.es, 0);
}

#[test]
fn forward_reference_word_is_little_endian() {
    let mut mem = Memory::new();
    let addr = Address::new(0x1234);
    mem.write_u16(addr, 0x1234);
    assert_eq!(mem.read_u8(addr), 0x34);
    assert_eq!(mem.read_u8(addr.wrapping_add(1)), 0x12);
}

#[test]
fn reset_restores_initial_register_state() {
    let mem = Memory::new();
    let mut cpu = Cpu::new_with_output(mem, Vec::new());
    cpu.regs.ax = 0xFFFF;
    cpu.suspended = true;
    cpu.reset();
    assert_eq!(cpu.regs.ax, 0);
    assert_eq!(cpu.regs.ip, INSTRUCTION_PTR_START);
    assert!(!cpu.suspended);
}

#[test]
fn reset_honors_an_overridden_memory_layout() {
    use crate::config::MemoryLayout;

    let layout = MemoryLayout {
        instruction_ptr_start: 0x0020,
        text_lower_addr: 0x0030,
        data_lower_addr: 0x0100,
        heap_lower_addr: 0x0200,
        heap_size: 0x0010,
        stack_lower_addr: 0x0300,
    };
    let cpu = Cpu::new_with_output_and_layout(Memory::new(), Vec::new(), layout);
    assert_eq!(cpu.regs.ip, layout.instruction_ptr_start);
    assert_eq!(cpu.regs.sp, layout.stack_lower_addr);
}
