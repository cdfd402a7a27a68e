//! Emulator host extensions.
//!
//! These do not exist on any real 6502. They give programs running under
//! the emulator, and the host driving it, a way to end emulation, and are
//! kept apart from the hardware opcode table so that nothing here is
//! mistaken for chip behavior.
//!
//! `$FF` (HALT) stops emulation and publishes the X register as the exit code
//! on the CPU's completion channel. An [`Interrupt`] raised by the host does
//! the same with [`INTERRUPT_EXIT_CODE`] once the current instruction
//! finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::opcodes::{AddressingMode, Mnemonic, Opcode};
use super::Cpu;
use crate::logging::{log, LogCategory, LogLevel};

/// Opcode byte of the halt sentinel
pub const HALT_OPCODE: u8 = 0xFF;

/// Exit code published when the host interrupts emulation
pub const INTERRUPT_EXIT_CODE: u8 = 1;

pub(super) const EXTENSIONS: &[Opcode] = &[Opcode::new(
    HALT_OPCODE,
    Mnemonic::Halt,
    AddressingMode::Implied,
    1,
)];

/// Cloneable request to stop a running CPU, safe to raise from a signal
/// handler or another thread.
#[derive(Debug, Clone)]
pub struct Interrupt {
    pending: Arc<AtomicBool>,
}

impl Interrupt {
    pub(super) fn new(pending: Arc<AtomicBool>) -> Self {
        Self { pending }
    }

    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }
}

impl Cpu {
    /// Record X as the exit code and offer it on the completion channel.
    pub(super) fn halt(&mut self) {
        let code = self.regs.x;
        log(LogCategory::Cpu, LogLevel::Info, || {
            format!(
                "CPU: halt at PC={:04X} with exit code {}",
                self.regs.pc.wrapping_sub(1),
                code
            )
        });
        self.publish(code);
    }

    /// Consume a raised [`Interrupt`], publishing [`INTERRUPT_EXIT_CODE`].
    pub(super) fn poll_interrupt(&mut self) -> Option<u8> {
        if !self.interrupt.swap(false, Ordering::AcqRel) {
            return None;
        }
        log(LogCategory::Cpu, LogLevel::Info, || {
            format!("CPU: interrupted at PC={:04X}", self.regs.pc)
        });
        self.publish(INTERRUPT_EXIT_CODE);
        Some(INTERRUPT_EXIT_CODE)
    }

    /// The channel holds one value; if it is already full the earlier
    /// code stands.
    fn publish(&mut self, code: u8) {
        self.exit_code = Some(code);
        if let Some(tx) = &self.exit {
            let _ = tx.try_send(code);
        }
    }
}
