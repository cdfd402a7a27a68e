//! Tests for stack page handling and register transfers

use super::{cpu_with, peek, poke};
use crate::cpu_6502::{FLAG_BREAK, FLAG_CARRY, FLAG_NEGATIVE, FLAG_UNUSED, FLAG_ZERO};

#[test]
fn test_pha_pla_round_trip() {
    // PHA ; LDA #$00 ; PLA
    let mut cpu = cpu_with(0x0200, &[0x48, 0xA9, 0x00, 0x68]);
    cpu.regs.a = 0x9C;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.sp, 0xFE);
    assert_eq!(peek(&cpu, 0x01FF), 0x9C);

    cpu.step().unwrap();
    assert!(cpu.regs.flag(FLAG_ZERO));

    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x9C);
    assert_eq!(cpu.regs.sp, 0xFF);
    assert!(!cpu.regs.flag(FLAG_ZERO));
    assert!(cpu.regs.flag(FLAG_NEGATIVE));
}

#[test]
fn test_stack_pointer_wraps_within_page_one() {
    // PHA with SP=$00 writes $0100, then SP wraps to $FF; PLA reads it back
    let mut cpu = cpu_with(0x0200, &[0x48, 0x68]);
    cpu.regs.sp = 0x00;
    cpu.regs.a = 0x42;
    cpu.step().unwrap();
    assert_eq!(peek(&cpu, 0x0100), 0x42);
    assert_eq!(peek(&cpu, 0x0000), 0x00);
    assert_eq!(cpu.regs.sp, 0xFF);

    cpu.regs.a = 0;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.regs.sp, 0x00);
}

#[test]
fn test_php_plp() {
    // PHP ; CLC ; PLP
    let mut cpu = cpu_with(0x0200, &[0x08, 0x18, 0x28]);
    cpu.regs.status = FLAG_CARRY | FLAG_NEGATIVE;
    cpu.step().unwrap();
    assert_eq!(
        peek(&cpu, 0x01FF),
        FLAG_CARRY | FLAG_NEGATIVE | FLAG_BREAK | FLAG_UNUSED
    );
    cpu.step().unwrap();
    assert!(!cpu.regs.flag(FLAG_CARRY));
    cpu.step().unwrap();
    assert_eq!(cpu.regs.status, FLAG_CARRY | FLAG_NEGATIVE | FLAG_UNUSED);
}

#[test]
fn test_phx_phy_plx_ply() {
    // PHX ; PHY ; PLX ; PLY
    let mut cpu = cpu_with(0x0200, &[0xDA, 0x5A, 0xFA, 0x7A]);
    cpu.regs.x = 0x11;
    cpu.regs.y = 0x80;
    for _ in 0..4 {
        cpu.step().unwrap();
    }
    // Pulled in reverse order, so the registers swap
    assert_eq!(cpu.regs.x, 0x80);
    assert_eq!(cpu.regs.y, 0x11);
    assert_eq!(cpu.regs.sp, 0xFF);
    assert!(!cpu.regs.flag(FLAG_NEGATIVE), "PLY of $11 clears N");
}

#[test]
fn test_transfers_update_flags() {
    // TAX ; TAY ; LDA #$00 ; TXA ; TYA
    let mut cpu = cpu_with(0x0200, &[0xAA, 0xA8, 0xA9, 0x00, 0x8A, 0x98]);
    cpu.regs.a = 0x80;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.x, 0x80);
    assert!(cpu.regs.flag(FLAG_NEGATIVE));
    cpu.step().unwrap();
    assert_eq!(cpu.regs.y, 0x80);
    cpu.step().unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.flag(FLAG_NEGATIVE));
    cpu.regs.y = 0;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.a, 0);
    assert!(cpu.regs.flag(FLAG_ZERO));
}

#[test]
fn test_tsx_updates_flags() {
    let mut cpu = cpu_with(0x0200, &[0xBA]);
    cpu.regs.sp = 0xF0;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.x, 0xF0);
    assert!(cpu.regs.flag(FLAG_NEGATIVE));
}

#[test]
fn test_txs_moves_stack() {
    // LDX #$80 ; TXS ; PHA
    let mut cpu = cpu_with(0x0200, &[0xA2, 0x80, 0x9A, 0x48]);
    cpu.regs.a = 0x5E;
    for _ in 0..3 {
        cpu.step().unwrap();
    }
    assert_eq!(cpu.regs.sp, 0x7F);
    assert_eq!(peek(&cpu, 0x0180), 0x5E);
}

#[test]
fn test_rts_pops_from_stack_page() {
    // RTS with a hand-built return address of $1233
    let mut cpu = cpu_with(0x0200, &[0x60]);
    poke(&mut cpu, 0x01FE, &[0x33, 0x12]);
    cpu.regs.sp = 0xFD;
    cpu.step().unwrap();
    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.regs.sp, 0xFF);
}
