//! Static opcode table.
//!
//! Every legal opcode byte maps to exactly one [`Opcode`] descriptor. The
//! table is built at compile time; a duplicated opcode byte fails the build.

use std::fmt;
use std::str::FromStr;

use super::host;

/// Instruction mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,

    // 65C02 additions
    Bra,
    Phx,
    Phy,
    Plx,
    Ply,
    Stz,
    Trb,
    Tsb,

    /// Emulator host extension, not a 6502 instruction. See [`host`].
    Halt,
}

impl Mnemonic {
    pub const fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC",
            And => "AND",
            Asl => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol => "ROL",
            Ror => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
            Bra => "BRA",
            Phx => "PHX",
            Phy => "PHY",
            Plx => "PLX",
            Ply => "PLY",
            Stz => "STZ",
            Trb => "TRB",
            Tsb => "TSB",
            Halt => "HALT",
        }
    }

    /// True for opcodes that exist only inside this emulator.
    pub const fn is_host_extension(self) -> bool {
        matches!(self, Mnemonic::Halt)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mnemonic '{0}'")]
pub struct UnknownMnemonic(pub String);

impl FromStr for Mnemonic {
    type Err = UnknownMnemonic;

    /// Case-insensitive lookup by name, e.g. `"nop"` or `"LDA"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OPCODES
            .iter()
            .flatten()
            .map(|op| op.mnemonic)
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

/// How an instruction's operand bytes become a value or an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `JMP ($nnnn)`
    Indirect,
    /// `($nn,X)`
    IndirectX,
    /// `($nn),Y`
    IndirectY,
    /// `($nn)`, 65C02
    ZeroPageIndirect,
    /// `JMP ($nnnn,X)`, 65C02
    AbsoluteIndexedIndirect,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub const fn operand_bytes(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | Relative | IndirectX | IndirectY
            | ZeroPageIndirect => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect | AbsoluteIndexedIndirect => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        use AddressingMode::*;
        match self {
            Implied => "implied",
            Accumulator => "accumulator",
            Immediate => "immediate",
            ZeroPage => "zeropage",
            ZeroPageX => "zeropageX",
            ZeroPageY => "zeropageY",
            Relative => "relative",
            Absolute => "absolute",
            AbsoluteX => "absoluteX",
            AbsoluteY => "absoluteY",
            Indirect => "(indirect)",
            IndirectX => "(indirect,X)",
            IndirectY => "(indirect),Y",
            ZeroPageIndirect => "(zeropage)",
            AbsoluteIndexedIndirect => "(absolute,X)",
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor for one opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub code: u8,
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Instruction length including the opcode byte (1..=3)
    pub len: u8,
    /// Base cycle cost, used for throughput accounting only
    pub cycles: u8,
}

impl Opcode {
    pub const fn new(code: u8, mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Self {
        Self {
            code,
            mnemonic,
            mode,
            len: 1 + mode.operand_bytes(),
            cycles,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mnemonic, self.mode)
    }
}

use AddressingMode::*;
use Mnemonic::*;

const fn op(code: u8, mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode::new(code, mnemonic, mode, cycles)
}

const NMOS: &[Opcode] = &[
    op(0x69, Adc, Immediate, 2),
    op(0x65, Adc, ZeroPage, 3),
    op(0x75, Adc, ZeroPageX, 4),
    op(0x6D, Adc, Absolute, 4),
    op(0x7D, Adc, AbsoluteX, 4),
    op(0x79, Adc, AbsoluteY, 4),
    op(0x61, Adc, IndirectX, 6),
    op(0x71, Adc, IndirectY, 5),
    op(0x29, And, Immediate, 2),
    op(0x25, And, ZeroPage, 3),
    op(0x35, And, ZeroPageX, 4),
    op(0x2D, And, Absolute, 4),
    op(0x3D, And, AbsoluteX, 4),
    op(0x39, And, AbsoluteY, 4),
    op(0x21, And, IndirectX, 6),
    op(0x31, And, IndirectY, 5),
    op(0x0A, Asl, Accumulator, 2),
    op(0x06, Asl, ZeroPage, 5),
    op(0x16, Asl, ZeroPageX, 6),
    op(0x0E, Asl, Absolute, 6),
    op(0x1E, Asl, AbsoluteX, 7),
    op(0x90, Bcc, Relative, 2),
    op(0xB0, Bcs, Relative, 2),
    op(0xF0, Beq, Relative, 2),
    op(0x24, Bit, ZeroPage, 3),
    op(0x2C, Bit, Absolute, 4),
    op(0x30, Bmi, Relative, 2),
    op(0xD0, Bne, Relative, 2),
    op(0x10, Bpl, Relative, 2),
    op(0x00, Brk, Implied, 7),
    op(0x50, Bvc, Relative, 2),
    op(0x70, Bvs, Relative, 2),
    op(0x18, Clc, Implied, 2),
    op(0xD8, Cld, Implied, 2),
    op(0x58, Cli, Implied, 2),
    op(0xB8, Clv, Implied, 2),
    op(0xC9, Cmp, Immediate, 2),
    op(0xC5, Cmp, ZeroPage, 3),
    op(0xD5, Cmp, ZeroPageX, 4),
    op(0xCD, Cmp, Absolute, 4),
    op(0xDD, Cmp, AbsoluteX, 4),
    op(0xD9, Cmp, AbsoluteY, 4),
    op(0xC1, Cmp, IndirectX, 6),
    op(0xD1, Cmp, IndirectY, 5),
    op(0xE0, Cpx, Immediate, 2),
    op(0xE4, Cpx, ZeroPage, 3),
    op(0xEC, Cpx, Absolute, 4),
    op(0xC0, Cpy, Immediate, 2),
    op(0xC4, Cpy, ZeroPage, 3),
    op(0xCC, Cpy, Absolute, 4),
    op(0xC6, Dec, ZeroPage, 5),
    op(0xD6, Dec, ZeroPageX, 6),
    op(0xCE, Dec, Absolute, 6),
    op(0xDE, Dec, AbsoluteX, 7),
    op(0xCA, Dex, Implied, 2),
    op(0x88, Dey, Implied, 2),
    op(0x49, Eor, Immediate, 2),
    op(0x45, Eor, ZeroPage, 3),
    op(0x55, Eor, ZeroPageX, 4),
    op(0x4D, Eor, Absolute, 4),
    op(0x5D, Eor, AbsoluteX, 4),
    op(0x59, Eor, AbsoluteY, 4),
    op(0x41, Eor, IndirectX, 6),
    op(0x51, Eor, IndirectY, 5),
    op(0xE6, Inc, ZeroPage, 5),
    op(0xF6, Inc, ZeroPageX, 6),
    op(0xEE, Inc, Absolute, 6),
    op(0xFE, Inc, AbsoluteX, 7),
    op(0xE8, Inx, Implied, 2),
    op(0xC8, Iny, Implied, 2),
    op(0x4C, Jmp, Absolute, 3),
    op(0x6C, Jmp, Indirect, 5),
    op(0x20, Jsr, Absolute, 6),
    op(0xA9, Lda, Immediate, 2),
    op(0xA5, Lda, ZeroPage, 3),
    op(0xB5, Lda, ZeroPageX, 4),
    op(0xAD, Lda, Absolute, 4),
    op(0xBD, Lda, AbsoluteX, 4),
    op(0xB9, Lda, AbsoluteY, 4),
    op(0xA1, Lda, IndirectX, 6),
    op(0xB1, Lda, IndirectY, 5),
    op(0xA2, Ldx, Immediate, 2),
    op(0xA6, Ldx, ZeroPage, 3),
    op(0xB6, Ldx, ZeroPageY, 4),
    op(0xAE, Ldx, Absolute, 4),
    op(0xBE, Ldx, AbsoluteY, 4),
    op(0xA0, Ldy, Immediate, 2),
    op(0xA4, Ldy, ZeroPage, 3),
    op(0xB4, Ldy, ZeroPageX, 4),
    op(0xAC, Ldy, Absolute, 4),
    op(0xBC, Ldy, AbsoluteX, 4),
    op(0x4A, Lsr, Accumulator, 2),
    op(0x46, Lsr, ZeroPage, 5),
    op(0x56, Lsr, ZeroPageX, 6),
    op(0x4E, Lsr, Absolute, 6),
    op(0x5E, Lsr, AbsoluteX, 7),
    op(0xEA, Nop, Implied, 2),
    op(0x09, Ora, Immediate, 2),
    op(0x05, Ora, ZeroPage, 3),
    op(0x15, Ora, ZeroPageX, 4),
    op(0x0D, Ora, Absolute, 4),
    op(0x1D, Ora, AbsoluteX, 4),
    op(0x19, Ora, AbsoluteY, 4),
    op(0x01, Ora, IndirectX, 6),
    op(0x11, Ora, IndirectY, 5),
    op(0x48, Pha, Implied, 3),
    op(0x08, Php, Implied, 3),
    op(0x68, Pla, Implied, 4),
    op(0x28, Plp, Implied, 4),
    op(0x2A, Rol, Accumulator, 2),
    op(0x26, Rol, ZeroPage, 5),
    op(0x36, Rol, ZeroPageX, 6),
    op(0x2E, Rol, Absolute, 6),
    op(0x3E, Rol, AbsoluteX, 7),
    op(0x6A, Ror, Accumulator, 2),
    op(0x66, Ror, ZeroPage, 5),
    op(0x76, Ror, ZeroPageX, 6),
    op(0x6E, Ror, Absolute, 6),
    op(0x7E, Ror, AbsoluteX, 7),
    op(0x40, Rti, Implied, 6),
    op(0x60, Rts, Implied, 6),
    op(0xE9, Sbc, Immediate, 2),
    op(0xE5, Sbc, ZeroPage, 3),
    op(0xF5, Sbc, ZeroPageX, 4),
    op(0xED, Sbc, Absolute, 4),
    op(0xFD, Sbc, AbsoluteX, 4),
    op(0xF9, Sbc, AbsoluteY, 4),
    op(0xE1, Sbc, IndirectX, 6),
    op(0xF1, Sbc, IndirectY, 5),
    op(0x38, Sec, Implied, 2),
    op(0xF8, Sed, Implied, 2),
    op(0x78, Sei, Implied, 2),
    op(0x85, Sta, ZeroPage, 3),
    op(0x95, Sta, ZeroPageX, 4),
    op(0x8D, Sta, Absolute, 4),
    op(0x9D, Sta, AbsoluteX, 5),
    op(0x99, Sta, AbsoluteY, 5),
    op(0x81, Sta, IndirectX, 6),
    op(0x91, Sta, IndirectY, 6),
    op(0x86, Stx, ZeroPage, 3),
    op(0x96, Stx, ZeroPageY, 4),
    op(0x8E, Stx, Absolute, 4),
    op(0x84, Sty, ZeroPage, 3),
    op(0x94, Sty, ZeroPageX, 4),
    op(0x8C, Sty, Absolute, 4),
    op(0xAA, Tax, Implied, 2),
    op(0xA8, Tay, Implied, 2),
    op(0xBA, Tsx, Implied, 2),
    op(0x8A, Txa, Implied, 2),
    op(0x9A, Txs, Implied, 2),
    op(0x98, Tya, Implied, 2),
];

const CMOS: &[Opcode] = &[
    // New addressing modes for existing instructions
    op(0x12, Ora, ZeroPageIndirect, 5),
    op(0x32, And, ZeroPageIndirect, 5),
    op(0x52, Eor, ZeroPageIndirect, 5),
    op(0x72, Adc, ZeroPageIndirect, 5),
    op(0x92, Sta, ZeroPageIndirect, 5),
    op(0xB2, Lda, ZeroPageIndirect, 5),
    op(0xD2, Cmp, ZeroPageIndirect, 5),
    op(0xF2, Sbc, ZeroPageIndirect, 5),
    op(0x89, Bit, Immediate, 2),
    op(0x34, Bit, ZeroPageX, 4),
    op(0x3C, Bit, AbsoluteX, 4),
    op(0x3A, Dec, Accumulator, 2),
    op(0x1A, Inc, Accumulator, 2),
    op(0x7C, Jmp, AbsoluteIndexedIndirect, 6),
    // New instructions
    op(0x80, Bra, Relative, 3),
    op(0xDA, Phx, Implied, 3),
    op(0x5A, Phy, Implied, 3),
    op(0xFA, Plx, Implied, 4),
    op(0x7A, Ply, Implied, 4),
    op(0x64, Stz, ZeroPage, 3),
    op(0x74, Stz, ZeroPageX, 4),
    op(0x9C, Stz, Absolute, 4),
    op(0x9E, Stz, AbsoluteX, 5),
    op(0x14, Trb, ZeroPage, 5),
    op(0x1C, Trb, Absolute, 6),
    op(0x04, Tsb, ZeroPage, 5),
    op(0x0C, Tsb, Absolute, 6),
];

const fn insert(mut table: [Option<Opcode>; 256], entries: &[Opcode]) -> [Option<Opcode>; 256] {
    let mut i = 0;
    while i < entries.len() {
        let entry = entries[i];
        if table[entry.code as usize].is_some() {
            panic!("opcode byte defined twice");
        }
        table[entry.code as usize] = Some(entry);
        i += 1;
    }
    table
}

const fn build_table() -> [Option<Opcode>; 256] {
    let table = insert([None; 256], NMOS);
    let table = insert(table, CMOS);
    insert(table, host::EXTENSIONS)
}

/// Opcode descriptors indexed by opcode byte; `None` marks an illegal opcode.
pub static OPCODES: [Option<Opcode>; 256] = build_table();

/// Descriptor for `code`, or `None` if the byte is not a legal opcode.
#[inline]
pub fn lookup(code: u8) -> Option<&'static Opcode> {
    OPCODES[code as usize].as_ref()
}
