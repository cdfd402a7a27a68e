use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use emu6502_core::config::{parse_address, RegionKind};
use emu6502_core::cpu_6502::Mnemonic;
use emu6502_core::logging::{LogCategory, LogConfig, LogLevel};
use emu6502_core::monitor::{
    BreakOutcome, Breakpoint, Breakpoints, MonitorChain, Speedometer, Tracer,
};
use emu6502_core::{Cpu, CpuView, Fault, Instruction, MachineConfig, Registers};

#[derive(Parser)]
#[command(name = "emu6502", about = "Run a 6502 program image")]
struct Args {
    /// ROM image, mapped so that it ends at $FFFF above 32K of RAM
    rom: Option<PathBuf>,

    /// JSON machine description to use instead of the default layout
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report effective clock rate when the program stops
    #[arg(long, default_value_t = false)]
    speedometer: bool,

    /// Print registers and each instruction to stderr before it runs
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Send the trace to the log at trace level instead of stderr
    #[arg(long, default_value_t = false)]
    trace_log: bool,

    /// Stop before executing the instruction at this address (e.g. $F000)
    #[arg(long = "break-at", value_parser = parse_break_address)]
    break_at: Vec<u16>,

    /// Stop before every instruction with this mnemonic (e.g. BRK)
    #[arg(long = "break-on")]
    break_on: Vec<Mnemonic>,

    /// Stop while a register holds a value (e.g. X=$10)
    #[arg(long = "break-register", value_parser = Breakpoint::parse_register)]
    break_register: Vec<Breakpoint>,

    /// Log breakpoint hits and keep running instead of prompting
    #[arg(long, default_value_t = false)]
    no_prompt: bool,

    /// Give up after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,

    /// Write the RAM image to this file when the program stops
    #[arg(long)]
    dump_ram: Option<PathBuf>,

    /// Write final register state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Level for all core log categories
    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    #[arg(long)]
    log_cpu: Option<LogLevel>,

    #[arg(long)]
    log_bus: Option<LogLevel>,

    #[arg(long)]
    log_monitor: Option<LogLevel>,
}

fn parse_break_address(s: &str) -> Result<u16, String> {
    parse_address(s).map_err(|e| e.to_string())
}

/// Everything the CPU thread hands back once it stops.
struct Outcome {
    result: Result<Option<u8>, Fault>,
    registers: Registers,
    ram: Option<Vec<u8>>,
    instructions: u64,
}

fn init_logging(args: &Args) {
    let config = LogConfig::global();
    config.set_global_level(args.log_level);
    for (category, level) in [
        (LogCategory::Cpu, args.log_cpu),
        (LogCategory::Bus, args.log_bus),
        (LogCategory::Monitor, args.log_monitor),
    ] {
        if let Some(level) = level {
            config.set_level(category, level);
        }
    }
    if args.trace_log && args.log_monitor.is_none() {
        config.set_level(LogCategory::Monitor, LogLevel::Trace);
    }
    env_logger::Builder::new()
        .filter_level(config.max_level().as_level_filter())
        .parse_default_env()
        .init();
}

fn machine_config(args: &Args) -> Result<MachineConfig> {
    if let Some(path) = &args.config {
        return MachineConfig::load(path)
            .with_context(|| format!("loading machine description {}", path.display()));
    }
    let Some(rom) = &args.rom else {
        bail!("a ROM image or --config is required");
    };
    let len = fs::metadata(rom)
        .with_context(|| format!("reading {}", rom.display()))?
        .len();
    Ok(MachineConfig::default_for_rom(rom, len as usize))
}

/// Blocking terminal prompt used while stopped at a breakpoint.
fn prompt(cpu: &CpuView<'_>, instruction: &Instruction) -> BreakOutcome {
    println!("{}", cpu.registers);
    println!("next: ${:04X} {}", instruction.address, instruction);
    print!("[s]tep, [c]ontinue> ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => BreakOutcome::Continue,
        Ok(_) => match line.trim() {
            "c" | "continue" => BreakOutcome::Continue,
            _ => BreakOutcome::Step,
        },
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args);

    let config = machine_config(&args)?;
    let bus = config.build_bus()?;
    let ram_region = config.regions.iter().find_map(|r| match r.kind {
        RegionKind::Ram { .. } => Some(r.name.clone()),
        _ => None,
    });

    let mut cpu = Cpu::new(bus);
    match config.reset_vector {
        Some(pc) => cpu.reset_to(pc),
        None => cpu.reset().context("reset")?,
    }

    // The speedometer logs its report on shutdown
    let mut monitors = MonitorChain::new();
    if args.speedometer {
        monitors.push(Speedometer::new());
    }
    if args.trace_log {
        monitors.push(Tracer::to_log());
    } else if args.trace {
        monitors.push(Tracer::new(io::stderr()));
    }
    let points: Vec<Breakpoint> = args
        .break_at
        .iter()
        .map(|&a| Breakpoint::Address(a))
        .chain(args.break_on.iter().map(|&m| Breakpoint::Mnemonic(m)))
        .chain(args.break_register.iter().copied())
        .collect();
    if !points.is_empty() {
        let mut breakpoints = if args.no_prompt {
            Breakpoints::log_only()
        } else {
            Breakpoints::from_fn(prompt)
        };
        for point in points {
            breakpoints.add(point);
        }
        monitors.push(breakpoints);
    }
    if !monitors.is_empty() {
        cpu.attach_monitor(monitors);
    }

    let exit = cpu.exit_channel();
    let interrupt = cpu.interrupt_handle();
    ctrlc::set_handler(move || interrupt.raise()).context("installing Ctrl-C handler")?;

    let max_steps = args.max_steps;
    let handle = thread::Builder::new()
        .name("cpu".to_string())
        .spawn(move || {
            let result = match max_steps {
                Some(n) => cpu.run_for(n),
                None => cpu.run().map(Some),
            };
            cpu.shutdown();
            Outcome {
                result,
                registers: cpu.regs,
                ram: ram_region.and_then(|name| cpu.bus.contents(&name).map(<[u8]>::to_vec)),
                instructions: cpu.instructions,
            }
        })
        .context("spawning CPU thread")?;

    // Halt and Ctrl-C both publish a code; the channel closes without one
    // when the thread stops on a fault or runs out of steps.
    let halted = exit.recv().ok();
    let outcome = match handle.join() {
        Ok(outcome) => outcome,
        Err(_) => bail!("CPU thread panicked"),
    };

    println!("{}", outcome.registers);
    if let Some(path) = &args.dump_ram {
        match &outcome.ram {
            Some(bytes) => fs::write(path, bytes)
                .with_context(|| format!("dumping RAM to {}", path.display()))?,
            None => log::warn!("no RAM region to dump"),
        }
    }
    if let Some(path) = &args.save {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &outcome.registers)?;
    }

    let code = match outcome.result {
        Ok(Some(code)) => halted.unwrap_or(code),
        Ok(None) => {
            log::warn!(
                "stopped after {} instructions without halting",
                outcome.instructions
            );
            return Ok(ExitCode::FAILURE);
        }
        Err(fault) => return Err(fault).context("emulation aborted"),
    };
    Ok(ExitCode::from(code))
}
