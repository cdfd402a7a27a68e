//! Memory backends that can be attached to the address bus.
//!
//! Backends are written against a zero-based local address space: the bus
//! subtracts the base address of a binding before delegating, so a ROM mapped
//! at `$E000` sees a read of `$E010` as a read of `$0010`.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::logging::{log, LogCategory, LogLevel};

/// Default RAM size of the reference board (lower 32K of the address space).
pub const DEFAULT_RAM_SIZE: usize = 0x8000;

/// A block of byte-addressable storage that can be mounted on the bus.
pub trait Memory: Send {
    /// Read a byte at the given local address
    fn read(&self, addr: u16) -> u8;

    /// Write a byte at the given local address
    fn write(&mut self, addr: u16, val: u8);

    /// Number of addressable bytes (at most 64K)
    fn size(&self) -> usize;

    /// Best-effort cleanup when emulation halts
    fn shutdown(&mut self) {}

    /// Backing bytes, for backends that have a plain byte image
    fn contents(&self) -> Option<&[u8]> {
        None
    }
}

impl<M: Memory + ?Sized> Memory for Box<M> {
    fn read(&self, addr: u16) -> u8 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        (**self).write(addr, val)
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn contents(&self) -> Option<&[u8]> {
        (**self).contents()
    }
}

/// Zero-initialized read/write memory.
#[derive(Debug, Clone)]
pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    /// Create RAM with `size` bytes, all zero
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Copy `bytes` into RAM starting at local `offset`.
    ///
    /// Panics if the data does not fit.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new(DEFAULT_RAM_SIZE)
    }
}

impl Memory for Ram {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    #[inline]
    fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn contents(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}

impl fmt::Display for Ram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RAM[{}k]", self.data.len() / 1024)
    }
}

/// Read-only memory, usually loaded from an image file.
///
/// Writes have no effect on the contents; they are reported on the bus log
/// category since a program writing into ROM is almost always a bug.
#[derive(Debug, Clone)]
pub struct Rom {
    name: String,
    data: Vec<u8>,
}

impl Rom {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Load a ROM image; its size is the size of the file.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        Ok(Self::new(path.display().to_string(), data))
    }
}

impl Memory for Rom {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        log(LogCategory::Bus, LogLevel::Warn, || {
            format!(
                "Bus: ignored write of ${:02X} to {} offset ${:04X}",
                val, self, addr
            )
        });
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn contents(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}

impl fmt::Display for Rom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ROM[{}k:{}]", self.data.len() / 1024, self.name)
    }
}
