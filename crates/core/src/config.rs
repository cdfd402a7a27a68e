//! Machine description: which backends sit where on the address bus.
//!
//! Stored as JSON:
//!
//! ```json
//! {
//!   "regions": [
//!     { "name": "ram", "base": 0, "kind": "ram", "size": 32768 },
//!     { "name": "kernal", "base": "$C000", "kind": "rom", "path": "kernal.bin" }
//!   ],
//!   "reset_vector": "0xC000"
//! }
//! ```
//!
//! Addresses may be JSON integers or strings in `$hex`, `0xhex` or decimal
//! form. Regions are attached in order, so earlier regions win overlaps.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::bus::{AddressBus, BusError, ADDRESS_SPACE};
use crate::logging::{log, LogCategory, LogLevel};
use crate::memory::{Ram, Rom, DEFAULT_RAM_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid machine description: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bus(#[from] BusError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address '{0}'")]
pub struct ParseAddressError(pub String);

/// Parse `$C000`, `0xC000` or `49152`.
pub fn parse_address(s: &str) -> Result<u16, ParseAddressError> {
    let t = s.trim();
    let parsed = if let Some(hex) = t.strip_prefix('$') {
        u16::from_str_radix(hex, 16)
    } else if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        t.parse::<u16>()
    };
    parsed.map_err(|_| ParseAddressError(s.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Int(u64),
    Text(String),
}

impl AddressRepr {
    fn into_address<E: serde::de::Error>(self) -> Result<u16, E> {
        match self {
            AddressRepr::Int(n) => {
                u16::try_from(n).map_err(|_| E::custom(format!("address {} out of range", n)))
            }
            AddressRepr::Text(s) => parse_address(&s).map_err(E::custom),
        }
    }
}

fn de_address<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
    AddressRepr::deserialize(d)?.into_address()
}

fn de_opt_address<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
    match Option::<AddressRepr>::deserialize(d)? {
        Some(repr) => repr.into_address().map(Some),
        None => Ok(None),
    }
}

fn default_ram_size() -> usize {
    DEFAULT_RAM_SIZE
}

/// Backend behind a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegionKind {
    Ram {
        #[serde(default = "default_ram_size")]
        size: usize,
    },
    Rom {
        path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    #[serde(deserialize_with = "de_address")]
    pub base: u16,
    #[serde(flatten)]
    pub kind: RegionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub regions: Vec<RegionConfig>,
    /// Initial PC used instead of the value stored at `$FFFC`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_opt_address"
    )]
    pub reset_vector: Option<u16>,
}

impl MachineConfig {
    /// Load a description from a JSON file. Relative ROM paths are taken
    /// relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: MachineConfig = serde_json::from_str(&text)?;
        if let Some(dir) = path.parent() {
            for region in &mut config.regions {
                if let RegionKind::Rom { path: rom } = &mut region.kind {
                    if rom.is_relative() {
                        *rom = dir.join(&*rom);
                    }
                }
            }
        }
        Ok(config)
    }

    /// RAM from `$0000` and the ROM image mapped so that it ends at `$FFFF`,
    /// holding the vectors. RAM shrinks to make room for ROMs over 32K.
    pub fn default_for_rom(path: impl Into<PathBuf>, rom_len: usize) -> Self {
        let rom_base = ADDRESS_SPACE.saturating_sub(rom_len);
        let mut regions = Vec::new();
        let ram_size = DEFAULT_RAM_SIZE.min(rom_base);
        if ram_size > 0 {
            regions.push(RegionConfig {
                name: "ram".to_string(),
                base: 0x0000,
                kind: RegionKind::Ram { size: ram_size },
            });
        }
        regions.push(RegionConfig {
            name: "rom".to_string(),
            base: rom_base as u16,
            kind: RegionKind::Rom { path: path.into() },
        });
        Self {
            regions,
            reset_vector: None,
        }
    }

    /// Create the backends and attach them in order.
    pub fn build_bus(&self) -> Result<AddressBus, ConfigError> {
        let mut bus = AddressBus::new();
        for region in &self.regions {
            match &region.kind {
                RegionKind::Ram { size } => {
                    bus.attach(Ram::new(*size), region.name.clone(), region.base)?;
                }
                RegionKind::Rom { path } => {
                    let rom = Rom::from_file(path).map_err(|source| ConfigError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    bus.attach(rom, region.name.clone(), region.base)?;
                }
            }
        }
        log(LogCategory::Bus, LogLevel::Debug, || format!("{}", bus));
        Ok(bus)
    }
}
