//! MOS 6502 CPU core implementation
//!
//! The CPU owns its registers and the [`AddressBus`], and runs one
//! fetch, decode, observe, advance, execute sequence per [`Cpu::step`]:
//!
//! 1. decode the instruction at PC,
//! 2. hand it to the attached [`Monitor`], which may block,
//! 3. advance PC past the instruction,
//! 4. execute it.
//!
//! Because PC moves before execution, branch offsets and `JSR` return
//! addresses are relative to the following instruction, as on hardware.
//! Monitors observe the PC of the instruction about to run.
//!
//! Cycle counts are base costs tallied for throughput measurement; timing
//! inside an instruction is not modelled, and neither are the IRQ/NMI lines
//! or decimal-mode arithmetic.

mod addressing;
mod execute;
mod fault;
pub mod host;
mod instruction;
pub mod opcodes;
mod registers;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;

pub use fault::Fault;
pub use host::{Interrupt, HALT_OPCODE, INTERRUPT_EXIT_CODE};
pub use instruction::{decode, Instruction, Operand};
pub use opcodes::{lookup, AddressingMode, Mnemonic, Opcode, UnknownMnemonic, OPCODES};
pub use registers::{
    Registers, FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT, FLAG_NEGATIVE,
    FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO, STACK_BASE,
};

use crate::bus::AddressBus;
use crate::logging::{log, LogCategory, LogLevel};
use crate::monitor::{CpuView, Monitor};
use fault::Trap;

/// Location of the little-endian reset vector
pub const RESET_VECTOR: u16 = 0xFFFC;
/// Location of the BRK vector
pub const IRQ_VECTOR: u16 = 0xFFFE;
/// Status after reset: unused and break bits set (`0b0011_0100`)
pub const RESET_STATUS: u8 = 0x34;

/// MOS 6502 CPU state and execution engine
pub struct Cpu {
    pub regs: Registers,
    /// System address bus
    pub bus: AddressBus,
    /// Total base cycles executed
    pub cycles: u64,
    /// Total instructions executed
    pub instructions: u64,
    monitor: Option<Box<dyn Monitor>>,
    exit: Option<SyncSender<u8>>,
    exit_code: Option<u8>,
    interrupt: Arc<AtomicBool>,
}

impl Cpu {
    /// Create a CPU on `bus` with all registers zeroed. Call [`Cpu::reset`]
    /// before stepping.
    pub fn new(bus: AddressBus) -> Self {
        Self {
            regs: Registers::default(),
            bus,
            cycles: 0,
            instructions: 0,
            monitor: None,
            exit: None,
            exit_code: None,
            interrupt: Arc::default(),
        }
    }

    /// Install a monitor that sees every instruction before it executes,
    /// replacing any previous one.
    pub fn attach_monitor(&mut self, monitor: impl Monitor + 'static) {
        self.monitor = Some(Box::new(monitor));
    }

    /// Remove the monitor, returning it.
    pub fn detach_monitor(&mut self) -> Option<Box<dyn Monitor>> {
        self.monitor.take()
    }

    /// Create the single-slot completion channel the halt opcode writes to.
    pub fn exit_channel(&mut self) -> Receiver<u8> {
        let (tx, rx) = sync_channel(1);
        self.exit = Some(tx);
        rx
    }

    /// Route halts to an existing completion channel instead.
    pub fn attach_exit_sender(&mut self, tx: SyncSender<u8>) {
        self.exit = Some(tx);
    }

    /// Handle another thread can use to stop [`Cpu::run`] and
    /// [`Cpu::run_for`] between instructions.
    pub fn interrupt_handle(&self) -> Interrupt {
        Interrupt::new(self.interrupt.clone())
    }

    /// Exit code published by the last halt or interrupt, if any
    pub fn exit_code(&self) -> Option<u8> {
        self.exit_code
    }

    pub fn is_halted(&self) -> bool {
        self.exit_code.is_some()
    }

    /// Emulate the RESB line: load PC from `$FFFC/$FFFD` and set SR to
    /// `0x34`. A, X, Y and SP keep whatever they held.
    pub fn reset(&mut self) -> Result<(), Fault> {
        let pc = self.regs.pc;
        let start = self
            .bus
            .read16(RESET_VECTOR)
            .map_err(|source| Fault::Bus {
                pc,
                opcode: None,
                source,
            })?;
        self.reset_to(start);
        Ok(())
    }

    /// Reset as [`Cpu::reset`] does, but start at `pc` without reading the
    /// vector. For machines whose ROM does not cover `$FFFC`.
    pub fn reset_to(&mut self, pc: u16) {
        self.regs.pc = pc;
        self.regs.status = RESET_STATUS;
        self.exit_code = None;
        self.interrupt.store(false, Ordering::Release);
        log(LogCategory::Cpu, LogLevel::Debug, || {
            format!("CPU: reset, PC={:04X}", pc)
        });
    }

    /// Execute one instruction and return the base cycles it cost.
    pub fn step(&mut self) -> Result<u32, Fault> {
        let pc = self.regs.pc;
        let instruction = decode(&self.bus, pc)?;

        if let Some(monitor) = self.monitor.as_mut() {
            let view = CpuView {
                registers: &self.regs,
                bus: &self.bus,
                cycles: self.cycles,
            };
            monitor.before_execute(&view, &instruction);
        }
        log(LogCategory::Cpu, LogLevel::Trace, || {
            format!("CPU: {:04X}  {}", pc, instruction)
        });

        self.regs.pc = pc.wrapping_add(instruction.len() as u16);
        self.execute(&instruction)
            .map_err(|trap| trap.into_fault(pc, instruction.opcode.code))?;

        let cycles = instruction.cycles() as u32;
        self.cycles += cycles as u64;
        self.instructions += 1;
        Ok(cycles)
    }

    /// Step until the program halts or is interrupted; returns the exit
    /// code. A CPU that has already halted returns its code without
    /// stepping.
    pub fn run(&mut self) -> Result<u8, Fault> {
        loop {
            if let Some(code) = self.stopped() {
                return Ok(code);
            }
            self.step()?;
        }
    }

    /// Like [`Cpu::run`] but gives up after `max_steps` instructions,
    /// returning `None` if the program did not stop by then.
    pub fn run_for(&mut self, max_steps: u64) -> Result<Option<u8>, Fault> {
        for _ in 0..max_steps {
            if self.stopped().is_some() {
                break;
            }
            self.step()?;
        }
        Ok(self.stopped())
    }

    fn stopped(&mut self) -> Option<u8> {
        match self.exit_code {
            Some(code) => Some(code),
            None => self.poll_interrupt(),
        }
    }

    /// Tell the bus backends and the monitor that emulation is over.
    pub fn shutdown(&mut self) {
        self.bus.shutdown();
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.shutdown();
        }
    }

    #[inline]
    fn read(&self, addr: u16) -> Result<u8, Trap> {
        Ok(self.bus.read(addr)?)
    }

    #[inline]
    fn write(&mut self, addr: u16, val: u8) -> Result<(), Trap> {
        Ok(self.bus.write(addr, val)?)
    }

    fn read_u16(&self, addr: u16) -> Result<u16, Trap> {
        Ok(self.bus.read16(addr)?)
    }

    #[inline]
    fn push_u8(&mut self, v: u8) -> Result<(), Trap> {
        self.write(self.regs.stack_address(), v)?;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        Ok(())
    }

    #[inline]
    fn pop_u8(&mut self) -> Result<u8, Trap> {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        self.read(self.regs.stack_address())
    }

    /// High byte first, so the word sits little-endian in memory.
    fn push_u16(&mut self, v: u16) -> Result<(), Trap> {
        self.push_u8((v >> 8) as u8)?;
        self.push_u8((v & 0xFF) as u8)
    }

    fn pop_u16(&mut self) -> Result<u16, Trap> {
        let lo = self.pop_u8()? as u16;
        let hi = self.pop_u8()? as u16;
        Ok((hi << 8) | lo)
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("regs", &self.regs)
            .field("bus", &self.bus)
            .field("cycles", &self.cycles)
            .field("instructions", &self.instructions)
            .field("monitor", &self.monitor.is_some())
            .field("exit_code", &self.exit_code)
            .field("interrupt", &self.interrupt.load(Ordering::Relaxed))
            .finish()
    }
}
