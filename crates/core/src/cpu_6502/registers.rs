use std::fmt;

use serde::{Deserialize, Serialize};

pub const FLAG_CARRY: u8 = 0x01;
pub const FLAG_ZERO: u8 = 0x02;
pub const FLAG_INTERRUPT: u8 = 0x04;
pub const FLAG_DECIMAL: u8 = 0x08;
pub const FLAG_BREAK: u8 = 0x10;
pub const FLAG_UNUSED: u8 = 0x20;
pub const FLAG_OVERFLOW: u8 = 0x40;
pub const FLAG_NEGATIVE: u8 = 0x80;

/// Base of the fixed stack page; SP is an offset into `$0100-$01FF`.
pub const STACK_BASE: u16 = 0x0100;

/// Programmer-visible register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter
    pub pc: u16,
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (low byte of `$0100 + sp`)
    pub sp: u8,
    /// Status register (NV-BDIZC)
    pub status: u8,
}

impl Registers {
    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        self.status & mask != 0
    }

    #[inline]
    pub fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    #[inline]
    pub(crate) fn carry_in(&self) -> u8 {
        self.status & FLAG_CARRY
    }

    /// Zero and Negative from a result byte.
    #[inline]
    pub fn update_status(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    /// Address SP currently points at inside the stack page
    #[inline]
    pub fn stack_address(&self) -> u16 {
        STACK_BASE | self.sp as u16
    }

    /// Flags as `nv_bdizc`, with `-` for each clear bit.
    pub fn status_string(&self) -> String {
        const LETTERS: &[u8; 8] = b"nv_bdizc";
        (0..8)
            .map(|i| {
                if self.status & (0x80 >> i) != 0 {
                    LETTERS[i] as char
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU PC:0x{:04X} AC:0x{:02X} X:0x{:02X} Y:0x{:02X} SP:0x{:02X} SR:{}",
            self.pc,
            self.a,
            self.x,
            self.y,
            self.sp,
            self.status_string()
        )
    }
}
