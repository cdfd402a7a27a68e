//! Effective-address resolution.

use super::fault::Trap;
use super::instruction::Instruction;
use super::opcodes::AddressingMode;
use super::Cpu;

impl Cpu {
    /// Effective address of an instruction's memory operand.
    ///
    /// Must be called after PC has been advanced: relative targets are
    /// computed from the following instruction. Zero-page indexing wraps
    /// within page 0; absolute indexing wraps at 64K.
    pub(super) fn effective_address(&self, ins: &Instruction) -> Result<u16, Trap> {
        let x = self.regs.x;
        let y = self.regs.y;
        Ok(match ins.mode() {
            AddressingMode::ZeroPage => ins.op8() as u16,
            AddressingMode::ZeroPageX => ins.op8().wrapping_add(x) as u16,
            AddressingMode::ZeroPageY => ins.op8().wrapping_add(y) as u16,
            AddressingMode::Absolute => ins.op16(),
            AddressingMode::AbsoluteX => ins.op16().wrapping_add(x as u16),
            AddressingMode::AbsoluteY => ins.op16().wrapping_add(y as u16),
            AddressingMode::Relative => self.regs.pc.wrapping_add(ins.op8() as i8 as u16),
            AddressingMode::Indirect => self.read_u16(ins.op16())?,
            AddressingMode::AbsoluteIndexedIndirect => {
                self.read_u16(ins.op16().wrapping_add(x as u16))?
            }
            AddressingMode::IndirectX => {
                let zp = ins.op8().wrapping_add(x);
                // The pointer's high byte must also come from page 0
                if zp == 0xFF {
                    return Err(Trap::PointerOutsideZeroPage(zp));
                }
                self.read_u16(zp as u16)?
            }
            AddressingMode::IndirectY => {
                self.read_u16(ins.op8() as u16)?.wrapping_add(y as u16)
            }
            AddressingMode::ZeroPageIndirect => self.read_u16(ins.op8() as u16)?,
            AddressingMode::Implied | AddressingMode::Accumulator | AddressingMode::Immediate => {
                unreachable!("{} has no effective address", ins.opcode)
            }
        })
    }

    /// The 8-bit value an instruction operates on.
    pub(super) fn resolve_operand(&self, ins: &Instruction) -> Result<u8, Trap> {
        match ins.mode() {
            AddressingMode::Immediate => Ok(ins.op8()),
            AddressingMode::Accumulator => Ok(self.regs.a),
            _ => {
                let addr = self.effective_address(ins)?;
                self.read(addr)
            }
        }
    }
}
