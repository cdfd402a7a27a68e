//! Execution observers.
//!
//! A [`Monitor`] is called synchronously by [`Cpu::step`](crate::cpu_6502::Cpu::step)
//! after an instruction is decoded and before PC moves past it. The call
//! may block (an interactive debugger waits for input there); the CPU does
//! not proceed until it returns.

mod breakpoint;
mod speedometer;
mod trace;

pub use breakpoint::{
    BreakHandler, BreakOutcome, Breakpoint, BreakpointParseError, Breakpoints, Register,
};
pub use speedometer::{SpeedReport, Speedometer};
pub use trace::Tracer;

use crate::bus::AddressBus;
use crate::cpu_6502::{Instruction, Registers};

/// Read-only CPU and bus state as of the instruction about to execute.
#[derive(Debug, Clone, Copy)]
pub struct CpuView<'a> {
    /// Registers before the instruction runs; `pc` is its address.
    pub registers: &'a Registers,
    pub bus: &'a AddressBus,
    /// Base cycles executed so far
    pub cycles: u64,
}

/// Per-instruction hook.
pub trait Monitor: Send {
    fn before_execute(&mut self, cpu: &CpuView<'_>, instruction: &Instruction);

    /// Emulation has ended.
    fn shutdown(&mut self) {}
}

impl<M: Monitor + ?Sized> Monitor for Box<M> {
    fn before_execute(&mut self, cpu: &CpuView<'_>, instruction: &Instruction) {
        (**self).before_execute(cpu, instruction)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// Runs several monitors in attachment order.
#[derive(Default)]
pub struct MonitorChain {
    monitors: Vec<Box<dyn Monitor>>,
}

impl MonitorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, monitor: impl Monitor + 'static) {
        self.monitors.push(Box::new(monitor));
    }

    pub fn with(mut self, monitor: impl Monitor + 'static) -> Self {
        self.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl Monitor for MonitorChain {
    fn before_execute(&mut self, cpu: &CpuView<'_>, instruction: &Instruction) {
        for monitor in &mut self.monitors {
            monitor.before_execute(cpu, instruction);
        }
    }

    fn shutdown(&mut self) {
        for monitor in &mut self.monitors {
            monitor.shutdown();
        }
    }
}
