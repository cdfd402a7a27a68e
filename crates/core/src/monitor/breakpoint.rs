//! Breakpoint debugger core.
//!
//! [`Breakpoints`] decides when to stop; what happens while stopped is up to
//! a [`BreakHandler`], which is free to block (for example on a terminal
//! read) because the CPU waits for the monitor call to return.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{CpuView, Monitor};
use crate::config::parse_address;
use crate::cpu_6502::{Instruction, Mnemonic, Registers};
use crate::logging::{log, LogCategory, LogLevel};

/// Register a breakpoint can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    A,
    X,
    Y,
}

impl Register {
    pub fn value(self, regs: &Registers) -> u8 {
        match self {
            Register::A => regs.a,
            Register::X => regs.x,
            Register::Y => regs.y,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakpointParseError {
    #[error("unknown register '{0}', expected A, X or Y")]
    UnknownRegister(String),
    #[error("expected REGISTER=VALUE, got '{0}'")]
    MissingValue(String),
    #[error("bad register value '{0}'")]
    BadValue(String),
}

impl FromStr for Register {
    type Err = BreakpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "AC" => Ok(Register::A),
            "X" => Ok(Register::X),
            "Y" => Ok(Register::Y),
            _ => Err(BreakpointParseError::UnknownRegister(s.to_string())),
        }
    }
}

/// Condition checked before every instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    /// PC equals the address
    Address(u16),
    /// Register holds the value
    Register(Register, u8),
    /// The next instruction has this mnemonic
    Mnemonic(Mnemonic),
}

impl Breakpoint {
    /// Parse `REG=VALUE`, e.g. `X=$10` or `a=255`.
    pub fn parse_register(s: &str) -> Result<Self, BreakpointParseError> {
        let (reg, value) = s
            .split_once('=')
            .ok_or_else(|| BreakpointParseError::MissingValue(s.to_string()))?;
        let reg: Register = reg.parse()?;
        let value = parse_address(value)
            .ok()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| BreakpointParseError::BadValue(value.to_string()))?;
        Ok(Breakpoint::Register(reg, value))
    }

    pub fn matches(&self, regs: &Registers, instruction: &Instruction) -> bool {
        match *self {
            Breakpoint::Address(addr) => regs.pc == addr,
            Breakpoint::Register(reg, value) => reg.value(regs) == value,
            Breakpoint::Mnemonic(m) => instruction.mnemonic() == m,
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breakpoint::Address(addr) => write!(f, "PC=${:04X}", addr),
            Breakpoint::Register(reg, value) => write!(f, "{}=${:02X}", reg, value),
            Breakpoint::Mnemonic(m) => write!(f, "{}", m),
        }
    }
}

/// What to do after a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOutcome {
    /// Run until the next breakpoint matches
    Continue,
    /// Break again before the next instruction
    Step,
}

/// Called while the CPU is stopped at a breakpoint.
pub trait BreakHandler: Send {
    fn on_break(&mut self, cpu: &CpuView<'_>, instruction: &Instruction) -> BreakOutcome;
}

struct FnHandler<F>(F);

impl<F> BreakHandler for FnHandler<F>
where
    F: FnMut(&CpuView<'_>, &Instruction) -> BreakOutcome + Send,
{
    fn on_break(&mut self, cpu: &CpuView<'_>, instruction: &Instruction) -> BreakOutcome {
        (self.0)(cpu, instruction)
    }
}

/// Logs and continues; for unattended runs.
struct LogOnly;

impl BreakHandler for LogOnly {
    fn on_break(&mut self, _: &CpuView<'_>, _: &Instruction) -> BreakOutcome {
        BreakOutcome::Continue
    }
}

/// Breakpoint monitor.
pub struct Breakpoints {
    points: Vec<Breakpoint>,
    stepping: bool,
    hits: u64,
    handler: Box<dyn BreakHandler>,
}

impl Breakpoints {
    pub fn new(handler: impl BreakHandler + 'static) -> Self {
        Self {
            points: Vec::new(),
            stepping: false,
            hits: 0,
            handler: Box::new(handler),
        }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(&CpuView<'_>, &Instruction) -> BreakOutcome + Send + 'static,
    {
        Self::new(FnHandler(f))
    }

    /// Hits are logged and execution continues.
    pub fn log_only() -> Self {
        Self::new(LogOnly)
    }

    pub fn add(&mut self, point: Breakpoint) {
        if !self.points.contains(&point) {
            self.points.push(point);
        }
    }

    pub fn with(mut self, point: Breakpoint) -> Self {
        self.add(point);
        self
    }

    /// Returns whether the breakpoint was set.
    pub fn remove(&mut self, point: &Breakpoint) -> bool {
        let before = self.points.len();
        self.points.retain(|p| p != point);
        self.points.len() != before
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.points
    }

    /// Number of times execution stopped
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Break before the next instruction regardless of breakpoints.
    pub fn step_next(&mut self) {
        self.stepping = true;
    }
}

impl Monitor for Breakpoints {
    fn before_execute(&mut self, cpu: &CpuView<'_>, instruction: &Instruction) {
        let hit = self
            .points
            .iter()
            .find(|p| p.matches(cpu.registers, instruction));
        if hit.is_none() && !self.stepping {
            return;
        }

        self.hits += 1;
        log(LogCategory::Monitor, LogLevel::Info, || match hit {
            Some(point) => format!(
                "Breakpoint {}: {}  {}",
                point, cpu.registers, instruction
            ),
            None => format!("Step: {}  {}", cpu.registers, instruction),
        });
        self.stepping = self.handler.on_break(cpu, instruction) == BreakOutcome::Step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::AddressBus;
    use crate::cpu_6502::Cpu;
    use crate::memory::Ram;
    use std::sync::{Arc, Mutex};

    // $0200: LDX #$00 ; loop: INX ; CPX #$03 ; BNE loop ; NOP
    const COUNT_TO_THREE: &[u8] = &[0xA2, 0x00, 0xE8, 0xE0, 0x03, 0xD0, 0xFB, 0xEA];

    fn cpu() -> Cpu {
        let mut ram = Ram::new(0x10000);
        ram.load(0x0200, COUNT_TO_THREE);
        ram.load(0xFFFC, &[0x00, 0x02]);
        let mut bus = AddressBus::new();
        bus.attach(ram, "ram", 0).unwrap();
        let mut cpu = Cpu::new(bus);
        cpu.reset().unwrap();
        cpu
    }

    /// Handler that records the PC of every stop and answers from a script.
    fn recording(
        script: Vec<BreakOutcome>,
    ) -> (Breakpoints, Arc<Mutex<Vec<u16>>>) {
        let stops = Arc::new(Mutex::new(Vec::new()));
        let sink = stops.clone();
        let mut answers = script.into_iter();
        let bp = Breakpoints::from_fn(move |cpu, _| {
            sink.lock().unwrap().push(cpu.registers.pc);
            answers.next().unwrap_or(BreakOutcome::Continue)
        });
        (bp, stops)
    }

    #[test]
    fn address_breakpoint_stops_each_pass() {
        let (bp, stops) = recording(vec![]);
        let mut cpu = cpu();
        cpu.attach_monitor(bp.with(Breakpoint::Address(0x0202)));
        for _ in 0..11 {
            cpu.step().unwrap();
        }
        assert_eq!(*stops.lock().unwrap(), vec![0x0202, 0x0202, 0x0202]);
        assert_eq!(cpu.regs.x, 3);
    }

    #[test]
    fn register_breakpoint_fires_when_value_reached() {
        let (bp, stops) = recording(vec![]);
        let mut cpu = cpu();
        cpu.attach_monitor(bp.with(Breakpoint::Register(Register::X, 2)));
        for _ in 0..11 {
            cpu.step().unwrap();
        }
        // X becomes 2 after the second INX; CPX, BNE and INX run with X=2
        assert_eq!(*stops.lock().unwrap(), vec![0x0203, 0x0205, 0x0202]);
    }

    #[test]
    fn mnemonic_breakpoint() {
        let (bp, stops) = recording(vec![]);
        let mut cpu = cpu();
        cpu.attach_monitor(bp.with(Breakpoint::Mnemonic(Mnemonic::Nop)));
        for _ in 0..11 {
            cpu.step().unwrap();
        }
        assert_eq!(*stops.lock().unwrap(), vec![0x0207]);
    }

    #[test]
    fn step_outcome_breaks_on_following_instruction() {
        let (bp, stops) = recording(vec![BreakOutcome::Step, BreakOutcome::Step]);
        let mut cpu = cpu();
        cpu.attach_monitor(bp.with(Breakpoint::Address(0x0200)));
        for _ in 0..4 {
            cpu.step().unwrap();
        }
        assert_eq!(*stops.lock().unwrap(), vec![0x0200, 0x0202, 0x0203]);
    }

    #[test]
    fn step_next_stops_without_a_breakpoint() {
        let (mut bp, stops) = recording(vec![BreakOutcome::Continue]);
        bp.step_next();
        let mut cpu = cpu();
        cpu.attach_monitor(bp);
        for _ in 0..5 {
            cpu.step().unwrap();
        }
        assert_eq!(*stops.lock().unwrap(), vec![0x0200]);
    }

    #[test]
    fn hits_count_every_stop() {
        let mut bp = Breakpoints::log_only().with(Breakpoint::Mnemonic(Mnemonic::Inx));
        let cpu = cpu();
        let ins = crate::cpu_6502::decode(&cpu.bus, 0x0202).unwrap();
        let view = CpuView {
            registers: &cpu.regs,
            bus: &cpu.bus,
            cycles: 0,
        };
        bp.before_execute(&view, &ins);
        bp.before_execute(&view, &ins);
        assert_eq!(bp.hits(), 2);

        let nop = crate::cpu_6502::decode(&cpu.bus, 0x0207).unwrap();
        bp.before_execute(&view, &nop);
        assert_eq!(bp.hits(), 2);
    }

    #[test]
    fn add_ignores_duplicates_and_remove_reports() {
        let mut bp = Breakpoints::log_only();
        bp.add(Breakpoint::Address(0x1000));
        bp.add(Breakpoint::Address(0x1000));
        assert_eq!(bp.breakpoints().len(), 1);
        assert!(bp.remove(&Breakpoint::Address(0x1000)));
        assert!(!bp.remove(&Breakpoint::Address(0x1000)));
    }

    #[test]
    fn parse_register_breakpoints() {
        assert_eq!(
            Breakpoint::parse_register("x=$10"),
            Ok(Breakpoint::Register(Register::X, 0x10))
        );
        assert_eq!(
            Breakpoint::parse_register("A=255"),
            Ok(Breakpoint::Register(Register::A, 0xFF))
        );
        assert!(matches!(
            Breakpoint::parse_register("Q=1"),
            Err(BreakpointParseError::UnknownRegister(_))
        ));
        assert!(matches!(
            Breakpoint::parse_register("Y"),
            Err(BreakpointParseError::MissingValue(_))
        ));
        assert!(matches!(
            Breakpoint::parse_register("Y=256"),
            Err(BreakpointParseError::BadValue(_))
        ));
    }

    #[test]
    fn display() {
        assert_eq!(Breakpoint::Address(0x8000).to_string(), "PC=$8000");
        assert_eq!(
            Breakpoint::Register(Register::Y, 0x0A).to_string(),
            "Y=$0A"
        );
        assert_eq!(Breakpoint::Mnemonic(Mnemonic::Brk).to_string(), "BRK");
    }
}
