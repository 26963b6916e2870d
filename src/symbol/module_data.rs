//! The `moduledata` accessor: a thin reader that, given a validated `moduledata` address, extracts
//! `pcHeader`, `types`, `etypes` and the two slice headers `typelinks`/`itablinks`. It owns no
//! data and touches the locator in no way; constructing one does not, by itself, search for
//! anything.

use crate::Elf;
use crate::Error;
use crate::symbol::offsets::offsets;
use crate::symbol::version::Version;

/// The virtual-address window `[types, etypes)` in which every type descriptor produced by a
/// typelinks offset lives.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct ModuleRange {
    pub types: u64,
    pub etypes: u64,
}

/// A handle over a `moduledata` record at a known virtual address. All reads are on demand; the
/// handle itself holds only the address, the resolved version and pointer size.
pub struct ModuleData<'elf> {
    elf: &'elf Elf,
    address: u64,
    version: Version,
    ptr_size: u64,
}

impl<'elf> ModuleData<'elf> {
    pub fn new(elf: &'elf Elf, address: u64, version: Version, ptr_size: u64) -> Self {
        Self { elf, address, version, ptr_size }
    }

    fn read_word(&self, address: u64) -> Option<u64> {
        let buffer = self.elf.read_virtual_memory(address, self.ptr_size).ok()?;
        self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()
    }

    /// This function returns the first word of the `moduledata` record, which is a pointer back
    /// to the `.gopclntab` header. Only present from Go 1.16 onward.
    pub fn pc_header(&self) -> Option<u64> {
        if self.version < Version::new(1, 16) {
            return None;
        }
        self.read_word(self.address)
    }

    pub fn types(&self) -> Option<u64> {
        let o = offsets(self.version, self.ptr_size).ok()?;
        self.read_word(self.address + o.types)
    }

    pub fn etypes(&self) -> Option<u64> {
        let o = offsets(self.version, self.ptr_size).ok()?;
        self.read_word(self.address + o.etypes)
    }

    pub fn ranges(&self) -> Option<ModuleRange> {
        Some(ModuleRange { types: self.types()?, etypes: self.etypes()? })
    }

    /// This function resolves the `typelinks` slice header, returning the virtual address of the
    /// array's first element and its element count. A zero-length slice is a valid, non-error
    /// outcome: the base address is simply not dereferenced by callers in that case.
    pub fn type_links(&self) -> Option<(u64, u64)> {
        self.slice_header(|o| o.typelinks_ptr, |o| o.typelinks_len)
    }

    /// This function resolves the `itablinks` slice header, mirroring [ModuleData::type_links].
    pub fn itab_links(&self) -> Option<(u64, u64)> {
        self.slice_header(|o| o.itablinks_ptr, |o| o.itablinks_len)
    }

    fn slice_header(
        &self,
        ptr_offset: impl Fn(&crate::symbol::offsets::ModuleDataOffsets) -> u64,
        len_offset: impl Fn(&crate::symbol::offsets::ModuleDataOffsets) -> u64,
    ) -> Option<(u64, u64)> {
        let o = offsets(self.version, self.ptr_size).ok()?;
        let ptr_address = self.address + ptr_offset(&o);
        let array_addr = self.read_word(ptr_address)?;

        let len_address = if self.version < Version::new(1, 16) {
            self.address + len_offset(&o)
        } else {
            ptr_address + self.ptr_size
        };

        let count = self.read_word(len_address)?;
        if count == 0 {
            return Some((0, 0));
        }

        log::debug!("resolved slice header at {len_address:#x}: base={array_addr:#x} count={count}");
        Some((array_addr, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::synthetic::SyntheticElf;

    #[test]
    fn reads_types_and_etypes_at_mapped_offsets() {
        let mut synth = SyntheticElf::new_64_le();
        let module_data_addr = synth.alloc(1024);

        let o = offsets(Version::new(1, 20), 8).unwrap();
        synth.write_u64(module_data_addr + o.types, 0x4000);
        synth.write_u64(module_data_addr + o.etypes, 0x5000);

        let elf = synth.build();
        let md = ModuleData::new(&elf, module_data_addr, Version::new(1, 20), 8);

        assert_eq!(md.types(), Some(0x4000));
        assert_eq!(md.etypes(), Some(0x5000));
        assert_eq!(md.ranges(), Some(ModuleRange { types: 0x4000, etypes: 0x5000 }));
    }

    #[test]
    fn resolves_typelinks_length_after_pointer_for_modern_versions() {
        let mut synth = SyntheticElf::new_64_le();
        let module_data_addr = synth.alloc(1024);

        let o = offsets(Version::new(1, 20), 8).unwrap();
        synth.write_u64(module_data_addr + o.typelinks_ptr, 0x9000);
        synth.write_u64(module_data_addr + o.typelinks_ptr + 8, 3);

        let elf = synth.build();
        let md = ModuleData::new(&elf, module_data_addr, Version::new(1, 20), 8);

        assert_eq!(md.type_links(), Some((0x9000, 3)));
    }

    #[test]
    fn empty_slice_yields_zero_without_dereferencing_base() {
        let mut synth = SyntheticElf::new_64_le();
        let module_data_addr = synth.alloc(1024);

        let o = offsets(Version::new(1, 20), 8).unwrap();
        synth.write_u64(module_data_addr + o.itablinks_ptr, 0);
        synth.write_u64(module_data_addr + o.itablinks_ptr + 8, 0);

        let elf = synth.build();
        let md = ModuleData::new(&elf, module_data_addr, Version::new(1, 20), 8);

        assert_eq!(md.itab_links(), Some((0, 0)));
    }

    #[test]
    fn pc_header_is_absent_before_1_16() {
        let mut synth = SyntheticElf::new_64_le();
        let module_data_addr = synth.alloc(64);
        synth.write_u64(module_data_addr, 0x1234);

        let elf = synth.build();
        let md = ModuleData::new(&elf, module_data_addr, Version::new(1, 12), 8);
        assert_eq!(md.pc_header(), None);
    }
}
