//! Decoded instructions.

use std::fmt;

use super::fault::Fault;
use super::opcodes::{lookup, AddressingMode, Mnemonic, Opcode};
use crate::bus::AddressBus;

/// Operand bytes that followed the opcode in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    /// Immediate value, zero-page address or signed branch offset
    Byte(u8),
    /// Little-endian absolute address
    Word(u16),
}

/// An opcode descriptor plus its operand, decoded at `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub address: u16,
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    #[inline]
    pub fn mnemonic(&self) -> Mnemonic {
        self.opcode.mnemonic
    }

    #[inline]
    pub fn mode(&self) -> AddressingMode {
        self.opcode.mode
    }

    #[inline]
    pub fn len(&self) -> u8 {
        self.opcode.len
    }

    #[inline]
    pub fn cycles(&self) -> u8 {
        self.opcode.cycles
    }

    /// 8-bit operand; zero for instructions without one.
    #[inline]
    pub fn op8(&self) -> u8 {
        match self.operand {
            Operand::Byte(b) => b,
            _ => 0,
        }
    }

    /// 16-bit operand; zero for instructions without one.
    #[inline]
    pub fn op16(&self) -> u16 {
        match self.operand {
            Operand::Word(w) => w,
            _ => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Operand::None => write!(f, "{}", self.opcode),
            Operand::Byte(b) => write!(f, "{} ${:02X}", self.opcode, b),
            Operand::Word(w) => write!(f, "{} ${:04X}", self.opcode, w),
        }
    }
}

/// Read the instruction starting at `pc`. Does not move the program counter.
pub fn decode(bus: &AddressBus, pc: u16) -> Result<Instruction, Fault> {
    let code = bus.read(pc).map_err(|source| Fault::Bus {
        pc,
        opcode: None,
        source,
    })?;
    let opcode = *lookup(code).ok_or(Fault::IllegalOpcode { pc, opcode: code })?;

    let at = pc.wrapping_add(1);
    let operand = match opcode.len {
        2 => bus.read(at).map(Operand::Byte),
        3 => bus.read16(at).map(Operand::Word),
        _ => Ok(Operand::None),
    }
    .map_err(|source| Fault::Bus {
        pc,
        opcode: Some(code),
        source,
    })?;

    Ok(Instruction {
        address: pc,
        opcode,
        operand,
    })
}
