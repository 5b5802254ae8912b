use pretty_assertions::assert_eq;

use super::*;
use crate::config::MemoryLayout;
use crate::memory::{Address, DATA_LOWER_ADDR, INSTRUCTION_PTR_START, TEXT_LOWER_ADDR};

#[test]
fn bootstrap_header_jumps_to_main() {
    let mem = assemble("section .text\nmain:\n    hlt\n").unwrap();
    let addr = Address::new(INSTRUCTION_PTR_START);
    assert_eq!(mem.read_u8(addr), crate::isa::Op::Jmp.code());
    assert_eq!(mem.read_u8(addr.wrapping_add(1)), 0);
    assert_eq!(mem.read_u16(addr.wrapping_add(2)), TEXT_LOWER_ADDR + BOOTSTRAP_LEN);
}

#[test]
fn missing_main_label_is_an_error() {
    let err = assemble("section .text\nstart:\n    hlt\n").unwrap_err();
    assert!(matches!(err, AssembleError::MissingMain));
}

#[test]
fn forward_reference_to_a_later_label_is_little_endian() {
    let source = "section .text\nmain:\n    jmp later\nlater:\n    hlt\n";
    let mem = assemble(source).unwrap();
    let jmp_at = TEXT_LOWER_ADDR + BOOTSTRAP_LEN;
    let later_addr = mem.read_u16(Address::new(jmp_at + 2));
    assert_eq!(later_addr, jmp_at + 4);
}

#[test]
fn reserved_label_cannot_be_redefined() {
    let source = "section .text\nmain:\n__malloc:\n    hlt\n";
    let err = assemble(source).unwrap_err();
    assert!(matches!(err, AssembleError::ReservedLabel(_, _)));
}

#[test]
fn duplicate_label_is_rejected() {
    let source = "section .text\nmain:\n    hlt\nmain:\n    hlt\n";
    let err = assemble(source).unwrap_err();
    assert!(matches!(err, AssembleError::DuplicateLabel(_, _)));
}

#[test]
fn data_section_strz_label_resolves_and_null_terminates() {
    let source = concat!(
        "section .data\n",
        "greeting strz \"hi\"\n",
        "section .text\n",
        "main:\n",
        "    movw AX, greeting\n",
        "    hlt\n",
    );
    let mem = assemble(source).unwrap();
    assert_eq!(mem.read_u8(Address::new(DATA_LOWER_ADDR)), b'h');
    assert_eq!(mem.read_u8(Address::new(DATA_LOWER_ADDR + 1)), b'i');
    assert_eq!(mem.read_u8(Address::new(DATA_LOWER_ADDR + 2)), 0);

    let movw_at = TEXT_LOWER_ADDR + BOOTSTRAP_LEN;
    let resolved = mem.read_u16(Address::new(movw_at + 3));
    assert_eq!(resolved, DATA_LOWER_ADDR);
}

#[test]
fn overridden_layout_relocates_bootstrap_and_sections() {
    let layout = MemoryLayout {
        instruction_ptr_start: 0x0000,
        text_lower_addr: 0x0010,
        data_lower_addr: 0x0100,
        heap_lower_addr: 0x0200,
        heap_size: 0x0010,
        stack_lower_addr: 0x0300,
    };
    let source = concat!(
        "section .data\n",
        "msg str \"hi\"\n",
        "section .text\n",
        "main:\n",
        "    movw BX, msg\n",
        "    hlt\n",
    );
    let mem = assemble_with_layout(source, &layout).unwrap();

    let addr = Address::new(layout.instruction_ptr_start);
    assert_eq!(mem.read_u8(addr), crate::isa::Op::Jmp.code());
    assert_eq!(mem.read_u16(addr.wrapping_add(2)), layout.text_lower_addr + BOOTSTRAP_LEN);

    assert_eq!(mem.read_u8(Address::new(layout.data_lower_addr)), b'h');
    assert_eq!(mem.read_u8(Address::new(layout.data_lower_addr + 1)), b'i');

    let movw_at = layout.text_lower_addr + BOOTSTRAP_LEN;
    let resolved = mem.read_u16(Address::new(movw_at + 3));
    assert_eq!(resolved, layout.data_lower_addr);

    // a tighter, non-conventional layout like this one never touches the
    // production defaults - this is the whole point of threading it through.
    assert_ne!(layout.data_lower_addr, DATA_LOWER_ADDR);
    assert_ne!(layout.text_lower_addr, TEXT_LOWER_ADDR);
}

#[test]
fn hello_world_assembles_and_encodes_syscall() {
    let source = concat!(
        "section .data\n",
        "msg str \"hi\"\n",
        "section .text\n",
        "main:\n",
        "    movw BX, msg\n",
        "    movw CX, 2\n",
        "    syscall\n",
        "    hlt\n",
    );
    let mem = assemble(source).unwrap();
    let base = TEXT_LOWER_ADDR + BOOTSTRAP_LEN;
    // movw BX, msg (5 bytes) + movw CX, 2 (5 bytes) = 10 bytes in, syscall opcode
    assert_eq!(mem.read_u8(Address::new(base + 10)), crate::isa::Op::Syscall.code());
}
