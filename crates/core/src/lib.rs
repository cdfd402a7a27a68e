//! MOS 6502 emulator core: CPU, address bus, memory backends and monitors.
//!
//! ```no_run
//! use emu6502_core::{AddressBus, Cpu, Ram};
//!
//! let mut ram = Ram::new(0x10000);
//! ram.load(0x8000, &[0xA2, 0x07, 0xFF]); // LDX #7 ; HALT
//! ram.load(0xFFFC, &[0x00, 0x80]);
//!
//! let mut bus = AddressBus::new();
//! bus.attach(ram, "ram", 0x0000)?;
//! let mut cpu = Cpu::new(bus);
//! cpu.reset()?;
//! assert_eq!(cpu.run()?, 7);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bus;
pub mod config;
pub mod cpu_6502;
pub mod logging;
pub mod memory;
pub mod monitor;

pub use bus::{AddressBus, BusError};
pub use config::{ConfigError, MachineConfig};
pub use cpu_6502::{Cpu, Fault, Instruction, Registers};
pub use memory::{Memory, Ram, Rom};
pub use monitor::{CpuView, Monitor};
