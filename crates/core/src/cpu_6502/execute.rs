//! Instruction semantics.
//!
//! One handler per mnemonic; the match in [`Cpu::execute`] is exhaustive over
//! [`Mnemonic`], so every legal opcode reaches exactly one handler.

use super::fault::Trap;
use super::instruction::Instruction;
use super::opcodes::{AddressingMode, Mnemonic};
use super::registers::{
    Registers, FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT, FLAG_NEGATIVE,
    FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO,
};
use super::{Cpu, IRQ_VECTOR};
use crate::logging::{log, LogCategory, LogLevel};

impl Cpu {
    /// Apply `ins` to registers and bus. PC already points past it.
    pub(super) fn execute(&mut self, ins: &Instruction) -> Result<(), Trap> {
        use Mnemonic::*;
        match ins.mnemonic() {
            // Loads and stores
            Lda => {
                self.regs.a = self.resolve_operand(ins)?;
                self.regs.update_status(self.regs.a);
            }
            Ldx => {
                self.regs.x = self.resolve_operand(ins)?;
                self.regs.update_status(self.regs.x);
            }
            Ldy => {
                self.regs.y = self.resolve_operand(ins)?;
                self.regs.update_status(self.regs.y);
            }
            Sta => self.store(ins, self.regs.a)?,
            Stx => self.store(ins, self.regs.x)?,
            Sty => self.store(ins, self.regs.y)?,
            Stz => self.store(ins, 0)?,

            // Arithmetic
            Adc => {
                let m = self.resolve_operand(ins)?;
                self.adc(m);
            }
            Sbc => {
                let m = self.resolve_operand(ins)?;
                self.sbc(m);
            }

            // Logic
            And => {
                self.regs.a &= self.resolve_operand(ins)?;
                self.regs.update_status(self.regs.a);
            }
            Ora => {
                self.regs.a |= self.resolve_operand(ins)?;
                self.regs.update_status(self.regs.a);
            }
            Eor => {
                self.regs.a ^= self.resolve_operand(ins)?;
                self.regs.update_status(self.regs.a);
            }
            Bit => self.bit(ins)?,
            Trb => {
                let addr = self.effective_address(ins)?;
                let m = self.read(addr)?;
                self.regs.set_flag(FLAG_ZERO, m & self.regs.a == 0);
                self.write(addr, m & !self.regs.a)?;
            }
            Tsb => {
                let addr = self.effective_address(ins)?;
                let m = self.read(addr)?;
                self.regs.set_flag(FLAG_ZERO, m & self.regs.a == 0);
                self.write(addr, m | self.regs.a)?;
            }

            // Shifts and rotates
            Asl => self.modify(ins, |regs, v| {
                regs.set_flag(FLAG_CARRY, v & 0x80 != 0);
                v << 1
            })?,
            Lsr => self.modify(ins, |regs, v| {
                regs.set_flag(FLAG_CARRY, v & 0x01 != 0);
                v >> 1
            })?,
            Rol => self.modify(ins, |regs, v| {
                let c = regs.carry_in();
                regs.set_flag(FLAG_CARRY, v & 0x80 != 0);
                (v << 1) | c
            })?,
            Ror => self.modify(ins, |regs, v| {
                let c = regs.carry_in();
                regs.set_flag(FLAG_CARRY, v & 0x01 != 0);
                (v >> 1) | (c << 7)
            })?,

            // Increments and decrements
            Inc => self.modify(ins, |_, v| v.wrapping_add(1))?,
            Dec => self.modify(ins, |_, v| v.wrapping_sub(1))?,
            Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.update_status(self.regs.x);
            }
            Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.update_status(self.regs.y);
            }
            Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.update_status(self.regs.x);
            }
            Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.update_status(self.regs.y);
            }

            // Compares
            Cmp => {
                let m = self.resolve_operand(ins)?;
                self.compare(self.regs.a, m);
            }
            Cpx => {
                let m = self.resolve_operand(ins)?;
                self.compare(self.regs.x, m);
            }
            Cpy => {
                let m = self.resolve_operand(ins)?;
                self.compare(self.regs.y, m);
            }

            // Branches
            Bcc => self.branch(ins, !self.regs.flag(FLAG_CARRY))?,
            Bcs => self.branch(ins, self.regs.flag(FLAG_CARRY))?,
            Bne => self.branch(ins, !self.regs.flag(FLAG_ZERO))?,
            Beq => self.branch(ins, self.regs.flag(FLAG_ZERO))?,
            Bpl => self.branch(ins, !self.regs.flag(FLAG_NEGATIVE))?,
            Bmi => self.branch(ins, self.regs.flag(FLAG_NEGATIVE))?,
            Bvc => self.branch(ins, !self.regs.flag(FLAG_OVERFLOW))?,
            Bvs => self.branch(ins, self.regs.flag(FLAG_OVERFLOW))?,
            Bra => self.branch(ins, true)?,

            // Jumps and subroutines
            Jmp => self.regs.pc = self.effective_address(ins)?,
            Jsr => {
                self.push_u16(self.regs.pc.wrapping_sub(1))?;
                self.regs.pc = ins.op16();
            }
            Rts => self.regs.pc = self.pop_u16()?.wrapping_add(1),
            Brk => self.brk(ins)?,
            Rti => {
                self.regs.status = pulled_status(self.pop_u8()?);
                self.regs.pc = self.pop_u16()?;
            }

            // Stack
            Pha => self.push_u8(self.regs.a)?,
            Phx => self.push_u8(self.regs.x)?,
            Phy => self.push_u8(self.regs.y)?,
            Php => self.push_u8(self.regs.status | FLAG_BREAK | FLAG_UNUSED)?,
            Pla => {
                self.regs.a = self.pop_u8()?;
                self.regs.update_status(self.regs.a);
            }
            Plx => {
                self.regs.x = self.pop_u8()?;
                self.regs.update_status(self.regs.x);
            }
            Ply => {
                self.regs.y = self.pop_u8()?;
                self.regs.update_status(self.regs.y);
            }
            Plp => self.regs.status = pulled_status(self.pop_u8()?),

            // Transfers
            Tax => {
                self.regs.x = self.regs.a;
                self.regs.update_status(self.regs.x);
            }
            Tay => {
                self.regs.y = self.regs.a;
                self.regs.update_status(self.regs.y);
            }
            Txa => {
                self.regs.a = self.regs.x;
                self.regs.update_status(self.regs.a);
            }
            Tya => {
                self.regs.a = self.regs.y;
                self.regs.update_status(self.regs.a);
            }
            Tsx => {
                self.regs.x = self.regs.sp;
                self.regs.update_status(self.regs.x);
            }
            // No flags: SP is not a data register
            Txs => self.regs.sp = self.regs.x,

            // Flags
            Clc => self.regs.set_flag(FLAG_CARRY, false),
            Sec => self.regs.set_flag(FLAG_CARRY, true),
            Cli => self.regs.set_flag(FLAG_INTERRUPT, false),
            Sei => self.regs.set_flag(FLAG_INTERRUPT, true),
            Cld => self.regs.set_flag(FLAG_DECIMAL, false),
            Sed => self.regs.set_flag(FLAG_DECIMAL, true),
            Clv => self.regs.set_flag(FLAG_OVERFLOW, false),

            Nop => {}

            Halt => self.halt(),
        }
        Ok(())
    }

    fn store(&mut self, ins: &Instruction, value: u8) -> Result<(), Trap> {
        let addr = self.effective_address(ins)?;
        self.write(addr, value)
    }

    /// Binary add with carry. Decimal mode is not modelled.
    fn adc(&mut self, m: u8) {
        let a = self.regs.a;
        let sum = a as u16 + m as u16 + self.regs.carry_in() as u16;
        let result = sum as u8;
        self.regs.set_flag(FLAG_CARRY, sum > 0xFF);
        self.regs
            .set_flag(FLAG_OVERFLOW, (!(a ^ m) & (a ^ result) & 0x80) != 0);
        self.regs.a = result;
        self.regs.update_status(result);
    }

    /// Binary subtract with borrow. Carry is set when no borrow was needed.
    fn sbc(&mut self, m: u8) {
        let a = self.regs.a;
        let borrow = 1 - self.regs.carry_in() as i16;
        let diff = a as i16 - m as i16 - borrow;
        let result = diff as u8;
        self.regs.set_flag(FLAG_CARRY, diff >= 0);
        self.regs
            .set_flag(FLAG_OVERFLOW, ((a ^ m) & (a ^ result) & 0x80) != 0);
        self.regs.a = result;
        self.regs.update_status(result);
    }

    fn compare(&mut self, reg: u8, m: u8) {
        self.regs.set_flag(FLAG_CARRY, reg >= m);
        self.regs.update_status(reg.wrapping_sub(m));
    }

    fn bit(&mut self, ins: &Instruction) -> Result<(), Trap> {
        let m = self.resolve_operand(ins)?;
        self.regs.set_flag(FLAG_ZERO, self.regs.a & m == 0);
        // BIT #imm has no memory operand to copy N and V from
        if ins.mode() != AddressingMode::Immediate {
            self.regs.set_flag(FLAG_NEGATIVE, m & 0x80 != 0);
            self.regs.set_flag(FLAG_OVERFLOW, m & 0x40 != 0);
        }
        Ok(())
    }

    /// Read-modify-write on the accumulator or memory, then set N and Z
    /// from the result.
    fn modify<F>(&mut self, ins: &Instruction, f: F) -> Result<(), Trap>
    where
        F: FnOnce(&mut Registers, u8) -> u8,
    {
        let result = if ins.mode() == AddressingMode::Accumulator {
            let a = self.regs.a;
            let r = f(&mut self.regs, a);
            self.regs.a = r;
            r
        } else {
            let addr = self.effective_address(ins)?;
            let v = self.read(addr)?;
            let r = f(&mut self.regs, v);
            self.write(addr, r)?;
            r
        };
        self.regs.update_status(result);
        Ok(())
    }

    fn branch(&mut self, ins: &Instruction, taken: bool) -> Result<(), Trap> {
        if taken {
            self.regs.pc = self.effective_address(ins)?;
        }
        Ok(())
    }

    /// Software interrupt. The byte after BRK is a padding byte, so the
    /// pushed return address skips it.
    fn brk(&mut self, ins: &Instruction) -> Result<(), Trap> {
        let ret = self.regs.pc.wrapping_add(1);
        self.push_u16(ret)?;
        self.push_u8(self.regs.status | FLAG_BREAK | FLAG_UNUSED)?;
        self.regs.set_flag(FLAG_INTERRUPT, true);
        self.regs.pc = self.read_u16(IRQ_VECTOR)?;
        log(LogCategory::Cpu, LogLevel::Debug, || {
            format!(
                "CPU: BRK at PC={:04X}, pushed {:04X}, jumping to {:04X}",
                ins.address, ret, self.regs.pc
            )
        });
        Ok(())
    }
}

/// Status as restored by PLP and RTI: bit 5 reads as set and B does not
/// exist in the register itself.
fn pulled_status(s: u8) -> u8 {
    (s | FLAG_UNUSED) & !FLAG_BREAK
}
