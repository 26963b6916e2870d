//! The interface (`itab`) table: one pointer-word array, each entry the address of an `itab`
//! record pairing an interface type with a concrete type's method set.

use crate::Elf;
use crate::symbol::name;
use crate::symbol::version::Version;

/// `methodCount`/`method` read the interface-type descriptor's `methods` slice length and the
/// `itab.fun` array respectively. The slice-length field sits at a fixed byte offset inside the
/// interface-type descriptor that does not depend on toolchain version.
const METHOD_COUNT_OFFSET_64: u64 = 64;
const METHOD_COUNT_OFFSET_32: u64 = 40;

/// This function returns the fixed method-vector offset inside an `itab` record for the given
/// pointer size, following the `3*ptr_size`/`2*ptr_size` formula documented for this table. The
/// real Go `itab` layout (`inter`, `_type`, a 4-byte `hash` plus a padded 1-byte `inited`) puts the
/// 32-bit method vector at byte 16 rather than 8; this table follows the documented formula rather
/// than that padding-driven value.
fn method_vector_offset(ptr_size: u64) -> u64 {
    if ptr_size == 8 { 3 * ptr_size } else { 2 * ptr_size }
}

/// A collection of `itab` pointers, either a direct slice of a `.itablink` section or the
/// `itablinks` array resolved out of `moduledata`.
pub struct InterfaceTable<'elf> {
    elf: &'elf Elf,
    base: u64,
    count: u64,
    relocation: u64,
    types: u64,
    ptr_size: u64,
    version: Version,
}

impl<'elf> InterfaceTable<'elf> {
    pub fn new(elf: &'elf Elf, base: u64, count: u64, relocation: u64, types: u64, ptr_size: u64, version: Version) -> Self {
        Self { elf, base, count, relocation, types, ptr_size, version }
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// This function resolves the `itab` pointer stored at slot `index` of the table and returns
    /// the [Interface] handle over it, or `None` if `index` is out of range or the pointer word
    /// cannot be read.
    pub fn get(&self, index: u64) -> Option<Interface<'elf>> {
        if index >= self.count {
            return None;
        }

        let entry_addr = self.base + index * self.ptr_size;
        let buffer = self.elf.read_virtual_memory(entry_addr, self.ptr_size).ok()?;
        let itab_addr = self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()? + self.relocation;

        Some(Interface { elf: self.elf, address: itab_addr, types: self.types, ptr_size: self.ptr_size, version: self.version })
    }

    pub fn iter(&self) -> impl Iterator<Item = Interface<'elf>> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }
}

/// A single `itab` record: an interface type, a concrete type, and the concrete type's method
/// implementations for that interface.
pub struct Interface<'elf> {
    elf: &'elf Elf,
    address: u64,
    types: u64,
    ptr_size: u64,
    version: Version,
}

impl<'elf> Interface<'elf> {
    pub fn address(&self) -> u64 {
        self.address
    }

    /// This function returns the name of the interface type implemented by this `itab`, read
    /// through the first pointer word.
    pub fn interface_name(&self) -> Option<crate::std::string::String> {
        self.type_name_at(self.address)
    }

    /// This function returns the name of the concrete type satisfying the interface, read through
    /// the second pointer word.
    pub fn concrete_name(&self) -> Option<crate::std::string::String> {
        self.type_name_at(self.address + self.ptr_size)
    }

    fn type_name_at(&self, pointer_slot: u64) -> Option<crate::std::string::String> {
        let buffer = self.elf.read_virtual_memory(pointer_slot, self.ptr_size).ok()?;
        let descriptor = self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()?;

        let name_offset_field = if self.ptr_size == 8 { 40 } else { 24 };
        let field = self.elf.read_virtual_memory(descriptor + name_offset_field, 4).ok()?;
        let name_offset = self.elf.endian().convert(&field, 4).ok()?;
        if name_offset == 0 {
            return None;
        }

        name::read(self.elf, self.types + name_offset, self.version, None)
    }

    /// This function returns the number of methods the interface type declares, read from the
    /// interface-type descriptor's `methods` slice length. A failed indirection anywhere along the
    /// way yields `0` rather than an error.
    pub fn method_count(&self) -> u64 {
        let Ok(buffer) = self.elf.read_virtual_memory(self.address, self.ptr_size) else {
            return 0;
        };
        let Ok(interface_type) = self.elf.endian().convert(&buffer, self.ptr_size as usize) else {
            return 0;
        };

        let offset = if self.ptr_size == 8 { METHOD_COUNT_OFFSET_64 } else { METHOD_COUNT_OFFSET_32 };
        let Ok(length_buf) = self.elf.read_virtual_memory(interface_type + offset, self.ptr_size) else {
            return 0;
        };
        self.elf.endian().convert(&length_buf, self.ptr_size as usize).unwrap_or(0)
    }

    /// This function returns the address of the `i`th method implementation in the `itab`'s method
    /// vector, or `0` if it cannot be read.
    pub fn method(&self, index: u64) -> u64 {
        let offset = method_vector_offset(self.ptr_size) + index * self.ptr_size;
        let Ok(buffer) = self.elf.read_virtual_memory(self.address + offset, self.ptr_size) else {
            return 0;
        };
        self.elf.endian().convert(&buffer, self.ptr_size as usize).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::synthetic::SyntheticElf;

    #[test]
    fn resolves_interface_and_concrete_names_through_double_indirection() {
        let mut synth = SyntheticElf::new_64_le();

        let types_base = synth.alloc(0x1000);
        let interface_name_addr = synth.write_name_varint("io.Writer");
        let concrete_name_addr = synth.write_name_varint("os.File");

        let interface_descriptor = synth.alloc(64);
        synth.write_u32(interface_descriptor + 40, (interface_name_addr - types_base) as u32);

        let concrete_descriptor = synth.alloc(64);
        synth.write_u32(concrete_descriptor + 40, (concrete_name_addr - types_base) as u32);

        let itab = synth.alloc(64);
        synth.write_u64(itab, interface_descriptor);
        synth.write_u64(itab + 8, concrete_descriptor);

        let table_slot = synth.alloc(8);
        synth.write_u64(table_slot, itab);

        let elf = synth.build();
        let table = InterfaceTable::new(&elf, table_slot, 1, 0, types_base, 8, Version::new(1, 20));
        let entry = table.get(0).unwrap();

        assert_eq!(entry.interface_name().as_deref(), Some("io.Writer"));
        assert_eq!(entry.concrete_name().as_deref(), Some("os.File"));
    }

    #[test]
    fn reads_method_count_and_method_vector() {
        let mut synth = SyntheticElf::new_64_le();

        let interface_descriptor = synth.alloc(80);
        synth.write_u64(interface_descriptor + METHOD_COUNT_OFFSET_64, 2);

        let itab = synth.alloc(64);
        synth.write_u64(itab, interface_descriptor);
        synth.write_u64(itab + 24, 0xAAAA);
        synth.write_u64(itab + 32, 0xBBBB);

        let elf = synth.build();
        let interface = Interface { elf: &elf, address: itab, types: 0, ptr_size: 8, version: Version::new(1, 20) };

        assert_eq!(interface.method_count(), 2);
        assert_eq!(interface.method(0), 0xAAAA);
        assert_eq!(interface.method(1), 0xBBBB);
    }

    #[test]
    fn out_of_range_index_yields_none() {
        let synth = SyntheticElf::new_64_le();
        let elf = synth.build();
        let table = InterfaceTable::new(&elf, 0, 0, 0, 0, 8, Version::new(1, 20));
        assert!(table.get(0).is_none());
    }
}
