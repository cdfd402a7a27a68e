//! 16-bit address, 8-bit data bus.
//!
//! The bus maps address ranges onto [`Memory`] backends: for example the lower
//! 32K could be RAM, the upper 8K ROM, and some I/O chip in the middle.
//! Lookups scan the bindings in attachment order and the first covering
//! binding wins, so overlapping regions shadow each other silently.

use std::fmt;

use thiserror::Error;

use crate::logging::{log, LogCategory, LogLevel};
use crate::memory::Memory;

/// Size of the full 6502 address space
pub const ADDRESS_SPACE: usize = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("no backend mapped at ${address:04X}")]
    Unmapped { address: u16 },
    #[error("region '{name}' has zero size")]
    EmptyRegion { name: String },
    #[error("region '{name}' at ${base:04X} with {size} bytes runs past $FFFF")]
    RegionOutOfRange { name: String, base: u16, size: usize },
}

/// Presents a backend at a base address: bus addresses are rebased to the
/// backend's zero-based local space before delegating.
pub struct OffsetMemory {
    base: u16,
    inner: Box<dyn Memory>,
}

impl OffsetMemory {
    pub fn new(base: u16, inner: Box<dyn Memory>) -> Self {
        Self { base, inner }
    }
}

impl Memory for OffsetMemory {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        self.inner.read(addr.wrapping_sub(self.base))
    }

    #[inline]
    fn write(&mut self, addr: u16, val: u8) {
        self.inner.write(addr.wrapping_sub(self.base), val)
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn shutdown(&mut self) {
        self.inner.shutdown()
    }

    fn contents(&self) -> Option<&[u8]> {
        self.inner.contents()
    }
}

struct Binding {
    name: String,
    start: u16,
    end: u16,
    memory: OffsetMemory,
}

impl Binding {
    #[inline]
    fn covers(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }
}

/// A mapped region as seen from outside the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region<'a> {
    pub name: &'a str,
    pub start: u16,
    pub end: u16,
}

/// The system address bus.
///
/// 16-bit accesses are two independent byte accesses, so a word may span
/// two backends at a region boundary.
#[derive(Default)]
pub struct AddressBus {
    bindings: Vec<Binding>,
}

impl AddressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `memory` over `[base, base + size - 1]`.
    pub fn attach<M>(&mut self, memory: M, name: impl Into<String>, base: u16) -> Result<(), BusError>
    where
        M: Memory + 'static,
    {
        let name = name.into();
        let size = memory.size();
        if size == 0 {
            return Err(BusError::EmptyRegion { name });
        }
        if base as usize + size > ADDRESS_SPACE {
            return Err(BusError::RegionOutOfRange { name, base, size });
        }
        let end = (base as usize + size - 1) as u16;
        log(LogCategory::Bus, LogLevel::Info, || {
            format!("Bus: attached {} at ${:04X}-${:04X}", name, base, end)
        });
        self.bindings.push(Binding {
            name,
            start: base,
            end,
            memory: OffsetMemory::new(base, Box::new(memory)),
        });
        Ok(())
    }

    pub fn regions(&self) -> impl Iterator<Item = Region<'_>> {
        self.bindings.iter().map(|b| Region {
            name: &b.name,
            start: b.start,
            end: b.end,
        })
    }

    fn binding(&self, addr: u16) -> Result<&Binding, BusError> {
        self.bindings
            .iter()
            .find(|b| b.covers(addr))
            .ok_or(BusError::Unmapped { address: addr })
    }

    fn binding_mut(&mut self, addr: u16) -> Result<&mut Binding, BusError> {
        self.bindings
            .iter_mut()
            .find(|b| b.covers(addr))
            .ok_or(BusError::Unmapped { address: addr })
    }

    /// Read the byte mapped at `addr`
    #[inline]
    pub fn read(&self, addr: u16) -> Result<u8, BusError> {
        Ok(self.binding(addr)?.memory.read(addr))
    }

    /// Write a byte to the backend mapped at `addr`
    #[inline]
    pub fn write(&mut self, addr: u16, val: u8) -> Result<(), BusError> {
        self.binding_mut(addr)?.memory.write(addr, val);
        Ok(())
    }

    /// Little-endian word: low byte at `addr`, high byte at `addr + 1`.
    pub fn read16(&self, addr: u16) -> Result<u16, BusError> {
        let lo = self.read(addr)? as u16;
        let hi = self.read(addr.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    pub fn write16(&mut self, addr: u16, val: u16) -> Result<(), BusError> {
        self.write(addr, (val & 0xFF) as u8)?;
        self.write(addr.wrapping_add(1), (val >> 8) as u8)
    }

    /// Byte image of the first region called `name`, if its backend has one.
    pub fn contents(&self, name: &str) -> Option<&[u8]> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .and_then(|b| b.memory.contents())
    }

    /// Pass the shutdown notice on to every backend
    pub fn shutdown(&mut self) {
        for binding in &mut self.bindings {
            binding.memory.shutdown();
        }
    }
}

impl fmt::Display for AddressBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address bus:")?;
        for region in self.regions() {
            write!(f, "\n  ${:04X}-${:04X} {}", region.start, region.end, region.name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AddressBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.regions()).finish()
    }
}
