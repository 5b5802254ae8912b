//! per-mnemonic MOD-byte + operand-byte table - the encoder half of the
//! contract in spec.md §4.1/§4.4. each function returns the bytes to write
//! starting at the opcode, plus a list of `(label name, byte offset into
//! `bytes`)` pairs for operands that referenced an as-yet-unresolved label.
//! the caller (the resolver) is responsible for turning those offsets into
//! absolute fixup addresses once it knows where `bytes` lands in memory.

use crate::asm::error::AssembleError;
use crate::asm::operand::{parse_operand, Operand};
use crate::isa::{Op, ALU_MOD_SIGNED_BIT};
use crate::register::Register;

pub struct Encoded {
    pub bytes: Vec<u8>,
    /// byte offsets (into `bytes`) of a 2-byte little-endian slot that still
    /// needs a label's address written into it.
    pub fixups: Vec<(String, usize)>,
}

impl Encoded {
    fn new(bytes: Vec<u8>) -> Encoded {
        Encoded {
            bytes,
            fixups: Vec::new(),
        }
    }

    fn with_fixup(mut self, name: String, offset: usize) -> Encoded {
        self.fixups.push((name, offset));
        self
    }
}

fn le16(v: u16) -> [u8; 2] {
    [(v & 0xFF) as u8, (v >> 8) as u8]
}

fn expect_args(line: usize, args: &[String], n: usize) -> Result<(), AssembleError> {
    if args.len() != n {
        Err(AssembleError::WrongOperandCount(line, n, args.len()))
    } else {
        Ok(())
    }
}

fn reg8_or_err(line: usize, r: Register) -> Result<u8, AssembleError> {
    if r.is_8bit() {
        Ok(r.code())
    } else {
        Err(AssembleError::WidthMismatch(line, r.to_string()))
    }
}

fn reg16_or_err(line: usize, r: Register) -> Result<u8, AssembleError> {
    if r.is_16bit() {
        Ok(r.code())
    } else {
        Err(AssembleError::WidthMismatch(line, r.to_string()))
    }
}

fn imm_fits_u8(line: usize, v: u16, text: &str) -> Result<u8, AssembleError> {
    if v > 0xFF {
        Err(AssembleError::WidthMismatch(line, text.to_string()))
    } else {
        Ok(v as u8)
    }
}

/// operands that simply name a label, no addressing-mode parsing involved -
/// `CALL`, `JMP*`. the bare identifier is treated as a label reference even
/// if it happens to parse as a register or literal.
fn encode_label_operand(op: Op, mod_byte: u8, label: &str) -> Encoded {
    let mut bytes = vec![op.code()];
    if op.has_mod() {
        bytes.push(mod_byte);
    }
    let fixup_at = bytes.len();
    bytes.extend_from_slice(&[0, 0]);
    Encoded::new(bytes).with_fixup(label.to_string(), fixup_at)
}

pub fn encode_control(line: usize, mnemonic: &str, args: &[String]) -> Result<Option<Encoded>, AssembleError> {
    let op = match mnemonic {
        "nop" => Op::Nop,
        "hlt" => Op::Hlt,
        "syscall" => Op::Syscall,
        "ret" => Op::Ret,
        _ => return Ok(None),
    };
    expect_args(line, args, 0)?;
    Ok(Some(Encoded::new(vec![op.code()])))
}

pub fn encode_call(line: usize, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 1)?;
    Ok(encode_label_operand(Op::Call, 0, &args[0]))
}

pub fn encode_jmp(line: usize, mnemonic: &str, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 1)?;
    let mod_byte = match mnemonic {
        "jmp" => 0,
        "jz" => 1,
        "jnz" => 2,
        "jc" => 3,
        "jnc" => 4,
        _ => unreachable!("caller only dispatches known jmp mnemonics"),
    };
    Ok(encode_label_operand(Op::Jmp, mod_byte, &args[0]))
}

pub fn encode_mov(line: usize, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 2)?;
    let dst = parse_operand(line, &args[0])?;
    let src = parse_operand(line, &args[1])?;

    let (mod_byte, mut operand_bytes): (u8, Vec<u8>) = match (&dst, &src) {
        (Operand::Address(addr), Operand::Immediate(imm)) => {
            let mut b = le16(*addr).to_vec();
            b.push(imm_fits_u8(line, *imm, &args[1])?);
            (0, b)
        }
        (Operand::Address(addr), Operand::Register(reg)) => {
            let mut b = le16(*addr).to_vec();
            b.push(reg8_or_err(line, *reg)?);
            (1, b)
        }
        (Operand::Register(reg), Operand::Immediate(imm)) => {
            let b = vec![reg8_or_err(line, *reg)?, imm_fits_u8(line, *imm, &args[1])?];
            (2, b)
        }
        (Operand::Register(reg), Operand::Address(addr)) => {
            let mut b = vec![reg8_or_err(line, *reg)?];
            b.extend_from_slice(&le16(*addr));
            (3, b)
        }
        (Operand::Register(dreg), Operand::Register(sreg)) => {
            let b = vec![reg8_or_err(line, *dreg)?, reg8_or_err(line, *sreg)?];
            (4, b)
        }
        (Operand::BaseOffset { base, offset }, Operand::Register(reg)) => {
            let mut b = vec![base.code()];
            b.extend_from_slice(&le16(*offset as u16));
            b.push(reg8_or_err(line, *reg)?);
            (5, b)
        }
        (Operand::Register(reg), Operand::BaseOffset { base, offset }) => {
            let mut b = vec![reg8_or_err(line, *reg)?, base.code()];
            b.extend_from_slice(&le16(*offset as u16));
            (6, b)
        }
        _ => return Err(AssembleError::InvalidOperand(line, args.join(", "))),
    };

    let mut bytes = vec![Op::Mov.code(), mod_byte];
    bytes.append(&mut operand_bytes);
    Ok(Encoded::new(bytes))
}

pub fn encode_movw(line: usize, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 2)?;
    let dst = parse_operand(line, &args[0])?;
    let dst_reg = match dst {
        Operand::Register(r) => reg16_or_err(line, r)?,
        _ => return Err(AssembleError::InvalidOperand(line, args[0].clone())),
    };

    let src = parse_operand(line, &args[1])?;
    match src {
        Operand::Register(r) => {
            let src_reg = reg16_or_err(line, r)?;
            Ok(Encoded::new(vec![Op::Movw.code(), 1, dst_reg, src_reg]))
        }
        Operand::Immediate(v) => {
            let mut bytes = vec![Op::Movw.code(), 0, dst_reg];
            bytes.extend_from_slice(&le16(v));
            Ok(Encoded::new(bytes))
        }
        Operand::Symbol(name) => {
            let bytes = vec![Op::Movw.code(), 0, dst_reg, 0, 0];
            Ok(Encoded::new(bytes).with_fixup(name, 3))
        }
        _ => Err(AssembleError::InvalidOperand(line, args[1].clone())),
    }
}

pub fn encode_push(line: usize, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 1)?;
    let operand = parse_operand(line, &args[0])?;
    let (mod_byte, operand_bytes): (u8, Vec<u8>) = match operand {
        Operand::Register(r) => (0, vec![reg8_or_err(line, r)?]),
        Operand::Immediate(v) => (2, vec![imm_fits_u8(line, v, &args[0])?]),
        Operand::Address(addr) => (4, le16(addr).to_vec()),
        Operand::BaseOffset { base, offset } => {
            let mut b = vec![base.code()];
            b.extend_from_slice(&le16(offset as u16));
            (5, b)
        }
        Operand::Symbol(name) => {
            return Err(AssembleError::InvalidOperand(
                line,
                format!("`push` cannot reference label '{}' - use `pushw`", name),
            ))
        }
    };
    let mut bytes = vec![Op::Push.code(), mod_byte];
    bytes.extend_from_slice(&operand_bytes);
    Ok(Encoded::new(bytes))
}

pub fn encode_pushw(line: usize, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 1)?;
    let operand = parse_operand(line, &args[0])?;
    match operand {
        Operand::Register(r) => {
            let reg = reg16_or_err(line, r)?;
            Ok(Encoded::new(vec![Op::Push.code(), 1, reg]))
        }
        Operand::Immediate(v) => {
            let mut bytes = vec![Op::Push.code(), 3];
            bytes.extend_from_slice(&le16(v));
            Ok(Encoded::new(bytes))
        }
        Operand::Symbol(name) => {
            let bytes = vec![Op::Push.code(), 3, 0, 0];
            Ok(Encoded::new(bytes).with_fixup(name, 2))
        }
        _ => Err(AssembleError::InvalidOperand(line, args[0].clone())),
    }
}

pub fn encode_pop(line: usize, args: &[String]) -> Result<Encoded, AssembleError> {
    match args.len() {
        0 => Ok(Encoded::new(vec![Op::Pop.code(), 0])),
        1 => {
            let reg = match parse_operand(line, &args[0])? {
                Operand::Register(r) => reg8_or_err(line, r)?,
                _ => return Err(AssembleError::InvalidOperand(line, args[0].clone())),
            };
            Ok(Encoded::new(vec![Op::Pop.code(), 1, reg]))
        }
        n => Err(AssembleError::WrongOperandCount(line, 1, n)),
    }
}

pub fn encode_popw(line: usize, args: &[String]) -> Result<Encoded, AssembleError> {
    match args.len() {
        0 => Ok(Encoded::new(vec![Op::Popw.code(), 0])),
        1 => {
            let reg = match parse_operand(line, &args[0])? {
                Operand::Register(r) => reg16_or_err(line, r)?,
                _ => return Err(AssembleError::InvalidOperand(line, args[0].clone())),
            };
            Ok(Encoded::new(vec![Op::Popw.code(), 1, reg]))
        }
        n => Err(AssembleError::WrongOperandCount(line, 1, n)),
    }
}

/// ADD/SUB/AND/OR/XOR/CMP share this operand shape.
pub fn encode_alu(line: usize, op: Op, signed: bool, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 2)?;
    let dst = match parse_operand(line, &args[0])? {
        Operand::Register(r) => r,
        _ => return Err(AssembleError::InvalidOperand(line, args[0].clone())),
    };
    let is8 = dst.is_8bit();
    let signed_bit = if signed { ALU_MOD_SIGNED_BIT } else { 0 };

    let src = parse_operand(line, &args[1])?;
    let (shape, mut operand_bytes) = match src {
        Operand::Register(sreg) if sreg.is_8bit() == is8 => (
            if is8 { 2 } else { 3 },
            vec![sreg.code()],
        ),
        Operand::Register(_) => return Err(AssembleError::WidthMismatch(line, args[1].clone())),
        Operand::Immediate(v) => {
            if is8 {
                (0, vec![imm_fits_u8(line, v, &args[1])?])
            } else {
                (1, le16(v).to_vec())
            }
        }
        _ => return Err(AssembleError::InvalidOperand(line, args[1].clone())),
    };

    let mut bytes = vec![op.code(), signed_bit | shape, dst.code()];
    bytes.append(&mut operand_bytes);
    Ok(Encoded::new(bytes))
}

pub fn encode_muldiv(line: usize, is_mul: bool, signed: bool, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 1)?;
    let op = if is_mul { Op::Mul } else { Op::Div };
    let signed_bit = if signed { ALU_MOD_SIGNED_BIT } else { 0 };

    let (shape, operand_bytes) = match parse_operand(line, &args[0])? {
        Operand::Register(r) => (if r.is_8bit() { 2 } else { 3 }, vec![r.code()]),
        Operand::Immediate(v) => {
            if v > 0xFF {
                (1, le16(v).to_vec())
            } else {
                (0, vec![v as u8])
            }
        }
        _ => return Err(AssembleError::InvalidOperand(line, args[0].clone())),
    };

    let mut bytes = vec![op.code(), signed_bit | shape];
    bytes.extend_from_slice(&operand_bytes);
    Ok(Encoded::new(bytes))
}

pub fn encode_not_buf(line: usize, is_not: bool, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 1)?;
    let op = if is_not { Op::Not } else { Op::Buf };
    let operand = parse_operand(line, &args[0])?;
    let (mod_byte, operand_bytes) = match operand {
        Operand::Register(r) => (if r.is_8bit() { 0 } else { 1 }, vec![r.code()]),
        Operand::Immediate(v) if !is_not => {
            if v > 0xFF {
                (3, le16(v).to_vec())
            } else {
                (2, vec![v as u8])
            }
        }
        _ => return Err(AssembleError::InvalidOperand(line, args[0].clone())),
    };
    let mut bytes = vec![op.code(), mod_byte];
    bytes.extend_from_slice(&operand_bytes);
    Ok(Encoded::new(bytes))
}

pub fn encode_shift(line: usize, is_left: bool, signed: bool, args: &[String]) -> Result<Encoded, AssembleError> {
    expect_args(line, args, 2)?;
    let op = if is_left { Op::Shl } else { Op::Shr };
    let target = match parse_operand(line, &args[0])? {
        Operand::Register(r) => r,
        _ => return Err(AssembleError::InvalidOperand(line, args[0].clone())),
    };

    let mut mod_byte = if signed { ALU_MOD_SIGNED_BIT } else { 0 };
    if target.is_16bit() {
        mod_byte |= 0b001;
    }

    let count = parse_operand(line, &args[1])?;
    let (count_byte, count_is_reg) = match count {
        Operand::Register(r) => (reg8_or_err(line, r)?, true),
        Operand::Immediate(v) => (imm_fits_u8(line, v, &args[1])?, false),
        _ => return Err(AssembleError::InvalidOperand(line, args[1].clone())),
    };
    if count_is_reg {
        mod_byte |= 0b010;
    }

    Ok(Encoded::new(vec![op.code(), mod_byte, target.code(), count_byte]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mov_reg_imm8_encodes_mod2() {
        let enc = encode_mov(1, &args(&["AL", "255"])).unwrap();
        assert_eq!(enc.bytes, vec![Op::Mov.code(), 2, Register::AL.code(), 255]);
    }

    #[test]
    fn jmp_to_unresolved_label_produces_one_fixup() {
        let enc = encode_jmp(1, "jmp", &args(&["later"])).unwrap();
        assert_eq!(enc.bytes, vec![Op::Jmp.code(), 0, 0, 0]);
        assert_eq!(enc.fixups, vec![("later".to_string(), 2)]);
    }

    #[test]
    fn add_signed_16bit_sets_both_mod_bits() {
        let enc = encode_alu(1, Op::Add, true, &args(&["AX", "BX"])).unwrap();
        assert_eq!(enc.bytes[1], ALU_MOD_SIGNED_BIT | 3);
    }

    #[test]
    fn shift_count_register_sets_bit1() {
        let enc = encode_shift(1, true, false, &args(&["AX", "CL"])).unwrap();
        assert_eq!(enc.bytes[1], 0b011);
    }

    #[test]
    fn shift_count_immediate_leaves_bit1_clear() {
        let enc = encode_shift(1, true, false, &args(&["AL", "3"])).unwrap();
        assert_eq!(enc.bytes[1], 0b000);
    }
}
