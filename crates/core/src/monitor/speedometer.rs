//! Instruction and cycle throughput counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CpuView, Monitor};
use crate::cpu_6502::Instruction;
use crate::logging::{log, LogCategory, LogLevel};

#[derive(Debug)]
struct Tally {
    instructions: AtomicU64,
    cycles: AtomicU64,
    started: Instant,
}

/// Counts executed instructions and base cycles.
///
/// Counting happens as each instruction is about to run, so an instruction
/// that faults is still counted and the tally can then lead
/// [`Cpu::cycles`](crate::cpu_6502::Cpu::cycles) by one instruction.
///
/// Clones share one tally, so a clone kept by the host can take
/// [`Speedometer::report`]s while the original runs inside the CPU thread.
#[derive(Debug, Clone)]
pub struct Speedometer {
    tally: Arc<Tally>,
}

/// Snapshot of a [`Speedometer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedReport {
    pub instructions: u64,
    pub cycles: u64,
    pub elapsed: Duration,
}

impl SpeedReport {
    /// Effective clock rate in MHz
    pub fn mhz(&self) -> f64 {
        per_micro(self.cycles, self.elapsed)
    }

    /// Millions of instructions per second
    pub fn mips(&self) -> f64 {
        per_micro(self.instructions, self.elapsed)
    }
}

fn per_micro(count: u64, elapsed: Duration) -> f64 {
    let micros = elapsed.as_secs_f64() * 1_000_000.0;
    if micros > 0.0 {
        count as f64 / micros
    } else {
        0.0
    }
}

impl fmt::Display for SpeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} instructions, {} cycles in {:.3}s ({:.2} MHz, {:.2} MIPS)",
            self.instructions,
            self.cycles,
            self.elapsed.as_secs_f64(),
            self.mhz(),
            self.mips()
        )
    }
}

impl Speedometer {
    pub fn new() -> Self {
        Self {
            tally: Arc::new(Tally {
                instructions: AtomicU64::new(0),
                cycles: AtomicU64::new(0),
                started: Instant::now(),
            }),
        }
    }

    pub fn report(&self) -> SpeedReport {
        SpeedReport {
            instructions: self.tally.instructions.load(Ordering::Relaxed),
            cycles: self.tally.cycles.load(Ordering::Relaxed),
            elapsed: self.tally.started.elapsed(),
        }
    }
}

impl Default for Speedometer {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor for Speedometer {
    fn before_execute(&mut self, _cpu: &CpuView<'_>, instruction: &Instruction) {
        self.tally.instructions.fetch_add(1, Ordering::Relaxed);
        self.tally
            .cycles
            .fetch_add(instruction.cycles() as u64, Ordering::Relaxed);
    }

    fn shutdown(&mut self) {
        let report = self.report();
        log(LogCategory::Monitor, LogLevel::Info, || {
            format!("Speedometer: {}", report)
        });
    }
}
