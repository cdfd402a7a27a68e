use thiserror::Error;

use crate::bus::BusError;

/// Unrecoverable emulation fault. A step that faults aborts emulation; no
/// partial rollback of the instruction is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("illegal opcode ${opcode:02X} at ${pc:04X}")]
    IllegalOpcode { pc: u16, opcode: u8 },

    /// `opcode` is `None` when fetching the opcode byte itself failed.
    #[error("bus fault at ${pc:04X}{}: {source}", fmt_opcode(.opcode))]
    Bus {
        pc: u16,
        opcode: Option<u8>,
        #[source]
        source: BusError,
    },

    #[error("indexed indirect pointer ${pointer:02X} at ${pc:04X} (opcode ${opcode:02X}) crosses out of zero page")]
    PointerOutsideZeroPage { pc: u16, opcode: u8, pointer: u8 },
}

fn fmt_opcode(opcode: &Option<u8>) -> String {
    match opcode {
        Some(op) => format!(" (opcode ${op:02X})"),
        None => String::new(),
    }
}

impl Fault {
    /// Address of the instruction that faulted
    pub fn pc(&self) -> u16 {
        match *self {
            Fault::IllegalOpcode { pc, .. }
            | Fault::Bus { pc, .. }
            | Fault::PointerOutsideZeroPage { pc, .. } => pc,
        }
    }
}

/// Failure inside an executing instruction, before the CPU attaches the
/// instruction's address and opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Trap {
    Bus(BusError),
    PointerOutsideZeroPage(u8),
}

impl From<BusError> for Trap {
    fn from(err: BusError) -> Self {
        Trap::Bus(err)
    }
}

impl Trap {
    pub(crate) fn into_fault(self, pc: u16, opcode: u8) -> Fault {
        match self {
            Trap::Bus(source) => Fault::Bus {
                pc,
                opcode: Some(opcode),
                source,
            },
            Trap::PointerOutsideZeroPage(pointer) => Fault::PointerOutsideZeroPage {
                pc,
                opcode,
                pointer,
            },
        }
    }
}
