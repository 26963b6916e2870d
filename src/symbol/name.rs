//! Go name encoding changed once, at 1.17, from a flag byte plus a big-endian 2-byte length to a
//! flag byte plus a varint length. Both the itab type names (§4.7) and struct field names (§4.8)
//! go through this single decision point so the threshold only lives in one place.

use crate::Elf;
use crate::symbol::varint;
use crate::symbol::version::Version;

/// Go 1.17 is the first version whose name encoding uses a varint length instead of a big-endian
/// 2-byte length.
const VARINT_NAMES_SINCE: Version = Version::new(1, 17);

/// Reads a Go name (the `flag byte, length, data` encoding used for both rtype names and struct
/// field names) at `address`. `legacy_cap`, when set, rejects a decoded length above the bound
/// (struct field names are capped at 4096 bytes in the legacy encoding; type names carry no such
/// cap in `original_source`).
pub fn read(elf: &Elf, address: u64, version: Version, legacy_cap: Option<u64>) -> Option<crate::std::string::String> {
    if version < VARINT_NAMES_SINCE {
        let length_bytes = elf.read_virtual_memory(address + 1, 2).ok()?;
        let length = ((length_bytes[0] as u64) << 8) | length_bytes[1] as u64;

        if let Some(cap) = legacy_cap {
            if length > cap {
                return None;
            }
        }

        let data = elf.read_virtual_memory(address + 3, length).ok()?;
        return crate::std::string::String::from_utf8(data).ok();
    }

    let header = elf.read_virtual_memory(address + 1, 10).ok()?;
    let (length, consumed) = varint::decode(&header).ok()?;

    let data = elf.read_virtual_memory(address + 1 + consumed as u64, length).ok()?;
    crate::std::string::String::from_utf8(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::synthetic::SyntheticElf;

    #[test]
    fn decodes_legacy_big_endian_length_below_1_17() {
        let mut synth = SyntheticElf::new_64_le();
        let addr = synth.write_name_legacy("runtime.g");

        let elf = synth.build();
        assert_eq!(read(&elf, addr, Version::new(1, 16), None).as_deref(), Some("runtime.g"));
    }

    #[test]
    fn decodes_varint_length_at_and_after_1_17() {
        let mut synth = SyntheticElf::new_64_le();
        let addr = synth.write_name_varint("stack");

        let elf = synth.build();
        assert_eq!(read(&elf, addr, Version::new(1, 18), None).as_deref(), Some("stack"));
    }

    #[test]
    fn rejects_legacy_name_past_the_4096_byte_cap() {
        let mut synth = SyntheticElf::new_64_le();
        let addr = synth.alloc(4);
        synth.write_u8(addr, 0);
        synth.write_u16(addr + 1, 5000);

        let elf = synth.build();
        assert_eq!(read(&elf, addr, Version::new(1, 16), Some(4096)), None);
    }
}
