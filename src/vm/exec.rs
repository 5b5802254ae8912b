use std::io::Write;

use crate::isa::{JmpCond, Op, ALU_MOD_SIGNED_BIT};
use crate::memory::Address;
use crate::register::Register;

use super::registers::Registers;
use super::{Cpu, RuntimeError, SYSCALL_EXIT, SYSCALL_STDOUT};

/// base registers a `[BASE±OFFSET]` operand may name.
fn base_register(code: u8) -> Result<Register, RuntimeError> {
    match Registers::by_code(code)? {
        r @ (Register::SP | Register::BP | Register::CP) => Ok(r),
        _ => Err(RuntimeError::InvalidRegisterCode(code)),
    }
}

impl<W: Write> Cpu<W> {
    pub(super) fn dispatch(&mut self, op: Op, mod_byte: u8) -> Result<(), RuntimeError> {
        match op {
            Op::Nop => Ok(()),
            Op::Hlt => {
                self.suspended = true;
                Ok(())
            }
            Op::Syscall => self.exec_syscall(),
            Op::Call => self.exec_call(),
            Op::Ret => self.exec_ret(),
            Op::Jmp => self.exec_jmp(mod_byte),
            Op::Mov => self.exec_mov(mod_byte),
            Op::Movw => self.exec_movw(mod_byte),
            Op::Push => self.exec_push(mod_byte),
            Op::Pop => self.exec_pop(mod_byte),
            Op::Popw => self.exec_popw(mod_byte),
            Op::Add => self.exec_alu8_16(op, mod_byte),
            Op::Sub => self.exec_alu8_16(op, mod_byte),
            Op::And => self.exec_alu8_16(op, mod_byte),
            Op::Or => self.exec_alu8_16(op, mod_byte),
            Op::Xor => self.exec_alu8_16(op, mod_byte),
            Op::Cmp => self.exec_alu8_16(op, mod_byte),
            Op::Mul => self.exec_mul(mod_byte),
            Op::Div => self.exec_div(mod_byte),
            Op::Not => self.exec_not(mod_byte),
            Op::Buf => self.exec_buf(mod_byte),
            Op::Shl => self.exec_shift(true, mod_byte),
            Op::Shr => self.exec_shift(false, mod_byte),
        }
    }

    fn exec_syscall(&mut self) -> Result<(), RuntimeError> {
        match self.regs.ax {
            SYSCALL_STDOUT => {
                let ptr = Address::new(self.regs.bx);
                let len = self.regs.cx as usize;
                let bytes = self.mem.read_bytes(ptr, len);
                let _ = self.out.write_all(&bytes);
            }
            SYSCALL_EXIT => {
                self.regs.es = self.regs.bx;
            }
            _ => {}
        }
        Ok(())
    }

    fn exec_call(&mut self) -> Result<(), RuntimeError> {
        let target = self.fetch_u16();
        let return_addr = self.regs.ip;
        self.push_u16(return_addr);
        self.regs.ip = target;
        Ok(())
    }

    fn exec_ret(&mut self) -> Result<(), RuntimeError> {
        self.regs.ip = self.pop_u16();
        Ok(())
    }

    fn exec_jmp(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        let cond = JmpCond::from_code(mod_byte).ok_or(RuntimeError::InvalidMod(Op::Jmp, mod_byte))?;
        let target = self.fetch_u16();
        let flags = self.regs.flags;
        let taken = match cond {
            JmpCond::Always => true,
            JmpCond::IfZero => flags.zero(),
            JmpCond::IfNotZero => !flags.zero(),
            JmpCond::IfCarry => flags.carry(),
            JmpCond::IfNotCarry => !flags.carry(),
        };
        if taken {
            self.regs.ip = target;
        }
        Ok(())
    }

    fn base_plus_offset(&mut self) -> Result<u16, RuntimeError> {
        let base_code = self.fetch_u8();
        let base = base_register(base_code)?;
        let offset = self.fetch_i16();
        Ok(self.regs.read16(base).wrapping_add(offset as u16))
    }

    fn exec_mov(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 => {
                let addr = Address::new(self.fetch_u16());
                let imm = self.fetch_u8();
                self.mem.write_u8(addr, imm);
            }
            1 => {
                let addr = Address::new(self.fetch_u16());
                let reg = self.fetch_register()?;
                let value = self.regs.read8(reg);
                self.mem.write_u8(addr, value);
            }
            2 => {
                let reg = self.fetch_register()?;
                let imm = self.fetch_u8();
                self.regs.write8(reg, imm);
            }
            3 => {
                let reg = self.fetch_register()?;
                let addr = Address::new(self.fetch_u16());
                let value = self.mem.read_u8(addr);
                self.regs.write8(reg, value);
            }
            4 => {
                let dst = self.fetch_register()?;
                let src = self.fetch_register()?;
                let value = self.regs.read8(src);
                self.regs.write8(dst, value);
            }
            5 => {
                let addr = self.base_plus_offset()?;
                let reg = self.fetch_register()?;
                let value = self.regs.read8(reg);
                self.mem.write_u8(Address::new(addr), value);
            }
            6 => {
                let reg = self.fetch_register()?;
                let addr = self.base_plus_offset()?;
                let value = self.mem.read_u8(Address::new(addr));
                self.regs.write8(reg, value);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Mov, mod_byte)),
        }
        Ok(())
    }

    fn exec_movw(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 => {
                let reg = self.fetch_register()?;
                let imm = self.fetch_u16();
                self.regs.write16(reg, imm);
            }
            1 => {
                let dst = self.fetch_register()?;
                let src = self.fetch_register()?;
                let value = self.regs.read16(src);
                self.regs.write16(dst, value);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Movw, mod_byte)),
        }
        Ok(())
    }

    fn exec_push(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 => {
                let reg = self.fetch_register()?;
                let v = self.regs.read8(reg);
                self.push_u8(v);
            }
            1 => {
                let reg = self.fetch_register()?;
                let v = self.regs.read16(reg);
                self.push_u16(v);
            }
            2 => {
                let imm = self.fetch_u8();
                self.push_u8(imm);
            }
            3 => {
                let imm = self.fetch_u16();
                self.push_u16(imm);
            }
            4 => {
                let addr = Address::new(self.fetch_u16());
                let v = self.mem.read_u8(addr);
                self.push_u8(v);
            }
            5 => {
                let addr = self.base_plus_offset()?;
                let v = self.mem.read_u8(Address::new(addr));
                self.push_u8(v);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Push, mod_byte)),
        }
        Ok(())
    }

    fn exec_pop(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 => {
                self.pop_u8();
            }
            1 => {
                let reg = self.fetch_register()?;
                let v = self.pop_u8();
                self.regs.write8(reg, v);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Pop, mod_byte)),
        }
        Ok(())
    }

    fn exec_popw(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 => {
                self.pop_u16();
            }
            1 => {
                let reg = self.fetch_register()?;
                let v = self.pop_u16();
                self.regs.write16(reg, v);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Popw, mod_byte)),
        }
        Ok(())
    }

    /// ADD/SUB/AND/OR/XOR/CMP share the MOD-low-2-bits operand shape; bit 3
    /// marks the signed variant, which leaves the result bits unchanged -
    /// see design notes.
    fn exec_alu8_16(&mut self, op: Op, mod_byte: u8) -> Result<(), RuntimeError> {
        let shape = mod_byte & 0b011;
        match shape {
            0 => {
                let reg = self.fetch_register()?;
                let imm = self.fetch_u8();
                let a = self.regs.read8(reg);
                let (result, carry) = alu8(op, a, imm, self.regs.flags.carry());
                self.apply_flags8(result, carry);
                if op != Op::Cmp {
                    self.regs.write8(reg, result);
                }
            }
            1 => {
                let reg = self.fetch_register()?;
                let imm = self.fetch_u16();
                let a = self.regs.read16(reg);
                let (result, carry) = alu16(op, a, imm, self.regs.flags.carry());
                self.apply_flags16(result, carry);
                if op != Op::Cmp {
                    self.regs.write16(reg, result);
                }
            }
            2 => {
                let dst = self.fetch_register()?;
                let src = self.fetch_register()?;
                let a = self.regs.read8(dst);
                let b = self.regs.read8(src);
                let (result, carry) = alu8(op, a, b, self.regs.flags.carry());
                self.apply_flags8(result, carry);
                if op != Op::Cmp {
                    self.regs.write8(dst, result);
                }
            }
            3 => {
                let dst = self.fetch_register()?;
                let src = self.fetch_register()?;
                let a = self.regs.read16(dst);
                let b = self.regs.read16(src);
                let (result, carry) = alu16(op, a, b, self.regs.flags.carry());
                self.apply_flags16(result, carry);
                if op != Op::Cmp {
                    self.regs.write16(dst, result);
                }
            }
            _ => unreachable!("mod & 0b011 is always in 0..=3"),
        }
        Ok(())
    }

    fn apply_flags8(&mut self, result: u8, carry: bool) {
        self.regs.flags.set_from_result8(result);
        self.regs.flags.set_carry_overflow(carry);
    }

    fn apply_flags16(&mut self, result: u16, carry: bool) {
        self.regs.flags.set_from_result16(result);
        self.regs.flags.set_carry_overflow(carry);
    }

    fn exec_mul(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 | 2 => {
                let b = if mod_byte == 0 {
                    self.fetch_u8()
                } else {
                    let reg = self.fetch_register()?;
                    self.regs.read8(reg)
                };
                let a = self.regs.read8(Register::AL);
                let product = a as u16 * b as u16;
                self.regs.write16(Register::AX, product);
                self.regs.flags.set_from_result16(product);
                self.regs.flags.set_carry_overflow(product > 0xFF);
            }
            1 | 3 => {
                let b = if mod_byte == 1 {
                    self.fetch_u16()
                } else {
                    let reg = self.fetch_register()?;
                    self.regs.read16(reg)
                };
                let a = self.regs.read16(Register::AX);
                let product = a as u32 * b as u32;
                let lower = (product & 0xFFFF) as u16;
                let upper = (product >> 16) as u16;
                self.regs.write16(Register::AX, lower);
                self.regs.write16(Register::DX, upper);
                self.regs.flags.set_zero(product == 0);
                self.regs.flags.set_sign(upper & 0x8000 != 0);
                self.regs.flags.set_parity(lower.count_ones() % 2 == 0);
                self.regs.flags.set_carry_overflow(upper != 0);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Mul, mod_byte)),
        }
        Ok(())
    }

    fn exec_div(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 | 2 => {
                let b = if mod_byte == 0 {
                    self.fetch_u8()
                } else {
                    let reg = self.fetch_register()?;
                    self.regs.read8(reg)
                };
                if b == 0 {
                    return Err(RuntimeError::DivideByZero);
                }
                let a = self.regs.read8(Register::AL);
                let (quotient, remainder) = (a / b, a % b);
                self.regs.write8(Register::AL, quotient);
                self.regs.write8(Register::AH, remainder);
                self.regs.flags.set_from_result8(quotient);
                self.regs.flags.set_carry_overflow(remainder == 0);
            }
            1 | 3 => {
                let b = if mod_byte == 1 {
                    self.fetch_u16()
                } else {
                    let reg = self.fetch_register()?;
                    self.regs.read16(reg)
                };
                if b == 0 {
                    return Err(RuntimeError::DivideByZero);
                }
                let a = self.regs.read16(Register::AX);
                let (quotient, remainder) = (a / b, a % b);
                self.regs.write16(Register::AX, quotient);
                self.regs.write16(Register::DX, remainder);
                self.regs.flags.set_from_result16(quotient);
                self.regs.flags.set_carry_overflow(remainder == 0);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Div, mod_byte)),
        }
        Ok(())
    }

    fn exec_not(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 => {
                let reg = self.fetch_register()?;
                let result = !self.regs.read8(reg);
                self.regs.write8(reg, result);
                self.apply_flags8(result, false);
            }
            1 => {
                let reg = self.fetch_register()?;
                let result = !self.regs.read16(reg);
                self.regs.write16(reg, result);
                self.apply_flags16(result, false);
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Not, mod_byte)),
        }
        Ok(())
    }

    /// BUF is an identity: it writes the operand back unchanged purely to
    /// refresh ZERO/SIGN/PARITY, which the code generator leans on to
    /// materialize a boolean into the flags after a pop.
    fn exec_buf(&mut self, mod_byte: u8) -> Result<(), RuntimeError> {
        match mod_byte {
            0 => {
                let reg = self.fetch_register()?;
                let v = self.regs.read8(reg);
                self.apply_flags8(v, self.regs.flags.carry());
            }
            1 => {
                let reg = self.fetch_register()?;
                let v = self.regs.read16(reg);
                self.apply_flags16(v, self.regs.flags.carry());
            }
            2 => {
                let imm = self.fetch_u8();
                self.apply_flags8(imm, self.regs.flags.carry());
            }
            3 => {
                let imm = self.fetch_u16();
                self.apply_flags16(imm, self.regs.flags.carry());
            }
            _ => return Err(RuntimeError::InvalidMod(Op::Buf, mod_byte)),
        }
        Ok(())
    }

    fn exec_shift(&mut self, left: bool, mod_byte: u8) -> Result<(), RuntimeError> {
        let width16 = mod_byte & 0b001 != 0;
        let count_is_reg = mod_byte & 0b010 != 0;
        let arithmetic = mod_byte & ALU_MOD_SIGNED_BIT != 0;

        let target = self.fetch_register()?;
        let count = if count_is_reg {
            let reg = self.fetch_register()?;
            self.regs.read8(reg)
        } else {
            self.fetch_u8()
        };

        if width16 {
            let v = self.regs.read16(target);
            let result = if left {
                v.wrapping_shl(count as u32)
            } else if arithmetic {
                ((v as i16) >> count.min(15)) as u16
            } else {
                v.wrapping_shr(count as u32)
            };
            self.regs.write16(target, result);
            self.apply_flags16(result, false);
        } else {
            let v = self.regs.read8(target);
            let result = if left {
                v.wrapping_shl(count as u32)
            } else if arithmetic {
                ((v as i8) >> count.min(7)) as u8
            } else {
                v.wrapping_shr(count as u32)
            };
            self.regs.write8(target, result);
            self.apply_flags8(result, false);
        }
        Ok(())
    }
}

/// computes the 8-bit result and the overflow/carry bit shared by ADD/SUB
/// (ADD: unsigned result escapes 8 bits; SUB: minuend < subtrahend).
/// AND/OR/XOR/CMP(=SUB) leave CARRY/OVERFLOW genuinely unchanged per
/// spec.md §4.3, so `prior_carry` is threaded through and handed back
/// untouched for the logical ops instead of being reset to `false`.
fn alu8(op: Op, a: u8, b: u8, prior_carry: bool) -> (u8, bool) {
    match op {
        Op::Add => a.overflowing_add(b),
        Op::Sub | Op::Cmp => a.overflowing_sub(b),
        Op::And => (a & b, prior_carry),
        Op::Or => (a | b, prior_carry),
        Op::Xor => (a ^ b, prior_carry),
        _ => unreachable!("alu8 only called for ADD/SUB/AND/OR/XOR/CMP"),
    }
}

fn alu16(op: Op, a: u16, b: u16, prior_carry: bool) -> (u16, bool) {
    match op {
        Op::Add => a.overflowing_add(b),
        Op::Sub | Op::Cmp => a.overflowing_sub(b),
        Op::And => (a & b, prior_carry),
        Op::Or => (a | b, prior_carry),
        Op::Xor => (a ^ b, prior_carry),
        _ => unreachable!("alu16 only called for ADD/SUB/AND/OR/XOR/CMP"),
    }
}
