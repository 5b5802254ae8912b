//! the instruction-set encoding contract shared verbatim by the assembler's
//! encoder and the VM's decoder: every opcode byte, every MOD-byte shape,
//! every operand width is defined exactly once here.

pub use self::op::{JmpCond, Op, ALU_MOD_SIGNED_BIT};

mod op;
