//! The PC-header probe: reads the first word of `.gopclntab` and maps it to the toolchain era it
//! implies. This is the fallback version source used when no build-info section and no
//! `runtime.buildVersion` symbol survive stripping.

use crate::Elf;
use crate::symbol::version::Version;

/// Go 1.12 - 1.15 `.gopclntab` magic.
pub const MAGIC_112: u32 = 0xFFFFFFFB;

/// Go 1.16 - 1.17 `.gopclntab` magic.
pub const MAGIC_116: u32 = 0xFFFFFFFA;

/// Go 1.18 - 1.19 `.gopclntab` magic.
pub const MAGIC_118: u32 = 0xFFFFFFF0;

/// Go 1.20+ `.gopclntab` magic.
pub const MAGIC_120: u32 = 0xFFFFFFF1;

/// This structure carries the outcome of probing a `.gopclntab` header: the minimum version the
/// magic implies and the size of the fixed header that precedes the function table proper.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct PcHeader {
    pub version: Version,
    pub header_size: u64,
}

impl PcHeader {
    /// This function reads the first four bytes at `address` and classifies them against the
    /// four known magic constants. An unrecognized magic is treated as pre-1.10 rather than an
    /// error, matching the pclntab fallback in the version-detection strategy (spec.md §4.1 step
    /// 3: "Unknown → treat as 1.10").
    pub fn probe(elf: &Elf, address: u64, ptr_size: u64) -> Option<Self> {
        let buffer = elf.read_virtual_memory(address, 4).ok()?;
        let magic = elf.endian().convert(&buffer, 4).ok()? as u32;

        let (version, header_size) = match magic {
            MAGIC_120 => (Version::new(1, 20), 8 + 7 * ptr_size),
            MAGIC_118 => (Version::new(1, 18), 8 + 7 * ptr_size),
            MAGIC_116 => (Version::new(1, 16), 8 + 6 * ptr_size),
            MAGIC_112 => (Version::new(1, 12), 8),
            _ => (Version::new(1, 10), 8),
        };

        Some(Self { version, header_size })
    }
}
