//! Tests for the 6502 core
//!
//! Tests are organized by concern:
//! - `tests_addressing`: effective-address rules and bus faults
//! - `tests_arithmetic`: ALU operations, shifts, compares and their flags
//! - `tests_control_flow`: branches, jumps, subroutines, BRK/RTI and halt
//! - `tests_stack_transfer`: stack page handling and register transfers
//! - `tests_hardware`: cases where emulators commonly diverge from the chip
//! - `tests_misc`: reset, whole-table sweeps and determinism

mod tests_addressing;
mod tests_stack_transfer;

use super::Cpu;
use crate::bus::AddressBus;
use crate::memory::Ram;

/// CPU on 64K of RAM with `program` loaded at `origin` and the reset vector
/// pointing at it. Reset has run and SP starts at `$FF`.
fn cpu_with(origin: u16, program: &[u8]) -> Cpu {
    let mut ram = Ram::new(0x10000);
    ram.load(origin as usize, program);
    ram.load(0xFFFC, &origin.to_le_bytes());
    let mut bus = AddressBus::new();
    bus.attach(ram, "ram", 0x0000).unwrap();
    let mut cpu = Cpu::new(bus);
    cpu.reset().unwrap();
    cpu.regs.sp = 0xFF;
    cpu
}

fn poke(cpu: &mut Cpu, addr: u16, bytes: &[u8]) {
    for (i, b) in bytes.iter().enumerate() {
        cpu.bus.write(addr.wrapping_add(i as u16), *b).unwrap();
    }
}

fn peek(cpu: &Cpu, addr: u16) -> u8 {
    cpu.bus.read(addr).unwrap()
}
