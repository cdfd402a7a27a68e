//! Tests for effective-address computation and bus faults

use super::{cpu_with, peek, poke};
use crate::bus::{AddressBus, BusError};
use crate::cpu_6502::{Cpu, Fault, FLAG_CARRY};
use crate::memory::Ram;

#[test]
fn test_zero_page_x_wraps_within_page_zero() {
    // LDA $FF,X
    let mut cpu = cpu_with(0x0200, &[0xB5, 0xFF]);
    poke(&mut cpu, 0x0001, &[0x11]);
    poke(&mut cpu, 0x0101, &[0x22]);
    cpu.regs.x = 0x02;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x11, "effective address must be $0001, not $0101");
}

#[test]
fn test_zero_page_y_wraps_within_page_zero() {
    // LDX $F0,Y
    let mut cpu = cpu_with(0x0200, &[0xB6, 0xF0]);
    poke(&mut cpu, 0x0010, &[0x5A]);
    cpu.regs.y = 0x20;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.x, 0x5A);
}

#[test]
fn test_zero_page_x_store() {
    // STA $80,X
    let mut cpu = cpu_with(0x0200, &[0x95, 0x80]);
    cpu.regs.a = 0x99;
    cpu.regs.x = 0x90;
    cpu.step().unwrap();
    assert_eq!(peek(&cpu, 0x0010), 0x99);
    assert_eq!(peek(&cpu, 0x0110), 0x00);
}

#[test]
fn test_absolute_x_crosses_pages() {
    // LDA $20F0,X
    let mut cpu = cpu_with(0x0200, &[0xBD, 0xF0, 0x20]);
    poke(&mut cpu, 0x2110, &[0x42]);
    cpu.regs.x = 0x20;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x42);
}

#[test]
fn test_absolute_y_wraps_at_64k() {
    // LDA $FFFF,Y
    let mut cpu = cpu_with(0x0200, &[0xB9, 0xFF, 0xFF]);
    poke(&mut cpu, 0x0001, &[0x33]);
    cpu.regs.y = 0x02;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x33);
}

#[test]
fn test_indirect_x() {
    // LDA ($20,X)
    let mut cpu = cpu_with(0x0200, &[0xA1, 0x20]);
    poke(&mut cpu, 0x0024, &[0x00, 0x30]);
    poke(&mut cpu, 0x3000, &[0x77]);
    cpu.regs.x = 0x04;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x77);
}

#[test]
fn test_indirect_x_pointer_wraps_mod_256() {
    // LDA ($F0,X) with X=$14 reads the pointer from $04
    let mut cpu = cpu_with(0x0200, &[0xA1, 0xF0]);
    poke(&mut cpu, 0x0004, &[0x34, 0x12]);
    poke(&mut cpu, 0x1234, &[0xAB]);
    cpu.regs.x = 0x14;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0xAB);
}

#[test]
fn test_indirect_x_pointer_at_ff_faults() {
    // LDA ($FE,X) with X=1: pointer high byte would come from $0100
    let mut cpu = cpu_with(0x0200, &[0xA1, 0xFE]);
    cpu.regs.x = 0x01;
    assert_eq!(
        cpu.step(),
        Err(Fault::PointerOutsideZeroPage {
            pc: 0x0200,
            opcode: 0xA1,
            pointer: 0xFF
        })
    );
}

#[test]
fn test_indirect_y_adds_after_dereference() {
    // LDA ($40),Y
    let mut cpu = cpu_with(0x0200, &[0xB1, 0x40]);
    poke(&mut cpu, 0x0040, &[0xF0, 0x30]);
    poke(&mut cpu, 0x3110, &[0x5C]);
    cpu.regs.y = 0x20;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x5C);
}

#[test]
fn test_indirect_y_wraps_at_64k() {
    let mut cpu = cpu_with(0x0200, &[0xB1, 0x40]);
    poke(&mut cpu, 0x0040, &[0xF0, 0xFF]);
    poke(&mut cpu, 0x0010, &[0x66]);
    cpu.regs.y = 0x20;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x66);
}

#[test]
fn test_indirect_y_pointer_at_ff_reads_high_byte_from_page_one() {
    // LDA ($FF),Y: the pointer is read as a plain 16-bit bus access
    let mut cpu = cpu_with(0x0200, &[0xB1, 0xFF]);
    poke(&mut cpu, 0x00FF, &[0x00]);
    poke(&mut cpu, 0x0100, &[0x40]);
    poke(&mut cpu, 0x4001, &[0x8E]);
    cpu.regs.y = 0x01;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x8E);
}

#[test]
fn test_store_indirect_y() {
    // STA ($40),Y
    let mut cpu = cpu_with(0x0200, &[0x91, 0x40]);
    poke(&mut cpu, 0x0040, &[0x00, 0x30]);
    cpu.regs.a = 0xC3;
    cpu.regs.y = 0x05;
    cpu.step().unwrap();
    assert_eq!(peek(&cpu, 0x3005), 0xC3);
}

#[test]
fn test_zero_page_indirect() {
    // LDA ($40)
    let mut cpu = cpu_with(0x0200, &[0xB2, 0x40]);
    poke(&mut cpu, 0x0040, &[0x00, 0x30]);
    poke(&mut cpu, 0x3000, &[0x21]);
    cpu.regs.y = 0x10;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x21, "no index is applied");
}

#[test]
fn test_jmp_absolute_indexed_indirect() {
    // JMP ($2000,X)
    let mut cpu = cpu_with(0x0200, &[0x7C, 0x00, 0x20]);
    poke(&mut cpu, 0x2004, &[0x34, 0x12]);
    cpu.regs.x = 0x04;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, 0x1234);
}

#[test]
fn test_accumulator_mode_leaves_memory_alone() {
    // ASL A
    let mut cpu = cpu_with(0x0200, &[0x0A]);
    cpu.regs.a = 0x81;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x02);
    assert!(cpu.regs.flag(FLAG_CARRY));
    assert_eq!(peek(&cpu, 0x0000), 0x00);
}

#[test]
fn test_immediate_operand_is_used_directly() {
    // LDA #$00 would read $0000 if immediate were treated as zero page
    let mut cpu = cpu_with(0x0200, &[0xA9, 0x00]);
    poke(&mut cpu, 0x0000, &[0xFF]);
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x00);
}

fn half_mapped_cpu(program: &[u8]) -> Cpu {
    let mut ram = Ram::new(0x8000);
    ram.load(0x0200, program);
    let mut bus = AddressBus::new();
    bus.attach(ram, "low", 0x0000).unwrap();
    let mut cpu = Cpu::new(bus);
    cpu.regs.pc = 0x0200;
    cpu
}

#[test]
fn test_unmapped_operand_read_faults_with_context() {
    // LDA $9000
    let mut cpu = half_mapped_cpu(&[0xAD, 0x00, 0x90]);
    assert_eq!(
        cpu.step(),
        Err(Fault::Bus {
            pc: 0x0200,
            opcode: Some(0xAD),
            source: BusError::Unmapped { address: 0x9000 }
        })
    );
}

#[test]
fn test_unmapped_write_faults() {
    // STA $C000
    let mut cpu = half_mapped_cpu(&[0x8D, 0x00, 0xC0]);
    let fault = cpu.step().unwrap_err();
    assert_eq!(fault.pc(), 0x0200);
    assert!(matches!(
        fault,
        Fault::Bus {
            source: BusError::Unmapped { address: 0xC000 },
            ..
        }
    ));
}

#[test]
fn test_unmapped_fetch_faults_without_opcode() {
    let mut cpu = half_mapped_cpu(&[]);
    cpu.regs.pc = 0x8000;
    assert_eq!(
        cpu.step(),
        Err(Fault::Bus {
            pc: 0x8000,
            opcode: None,
            source: BusError::Unmapped { address: 0x8000 }
        })
    );
}
