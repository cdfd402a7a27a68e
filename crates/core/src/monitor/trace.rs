//! Instruction trace.

use std::io::Write;

use super::{CpuView, Monitor};
use crate::cpu_6502::Instruction;
use crate::logging::{log, LogCategory, LogLevel};

/// Writes one line per instruction: registers, then the instruction about
/// to run. With no writer, lines go to the log at trace level.
pub struct Tracer<W: Write + Send = std::io::Stderr> {
    out: Option<W>,
}

impl Tracer {
    /// Trace through the `Monitor` log category.
    pub fn to_log() -> Self {
        Self { out: None }
    }
}

impl<W: Write + Send> Tracer<W> {
    pub fn new(out: W) -> Self {
        Self { out: Some(out) }
    }
}

impl<W: Write + Send> Monitor for Tracer<W> {
    fn before_execute(&mut self, cpu: &CpuView<'_>, instruction: &Instruction) {
        match self.out.as_mut() {
            Some(out) => {
                // A broken trace sink must not stop emulation
                let _ = writeln!(out, "{}  {}", cpu.registers, instruction);
            }
            None => log(LogCategory::Monitor, LogLevel::Trace, || {
                format!("{}  {}", cpu.registers, instruction)
            }),
        }
    }

    fn shutdown(&mut self) {
        if let Some(out) = self.out.as_mut() {
            let _ = out.flush();
        }
    }
}
