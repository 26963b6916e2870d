//! The type (`rtype`) table: the full `reflect.Kind` space with the recursion needed to walk
//! through `Array`/`Chan`/`Map`/`Ptr`/`Slice` wrappers down to the `Struct` descriptors they
//! eventually name, and the field list each struct descriptor carries.

use bitflags::bitflags;

use crate::Elf;
use crate::symbol::name;
use crate::symbol::version::Version;

/// The struct field-name legacy encoding is capped at 4096 bytes; beyond that the name is treated
/// as absent rather than read in full.
const FIELD_NAME_LEGACY_CAP: u64 = 4096;

/// Struct field offsets were packed one bit left of their true value up to and including 1.18, to
/// make room for an embedded-field flag in the low bit.
const EMBEDDED_OFFSET_SHIFT_UNTIL: Version = Version::new(1, 18);

/// The full `reflect.Kind` space, as carried by the low 5 bits of an `rtype`'s `kind` byte.
/// `UnsafePointer` is not assigned a kind constant in the wrapper-recursion table below since no Go
/// `rtype` reports it directly, but it completes the documented enum range.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[repr(u8)]
pub enum Kind {
    Invalid = 0,
    Bool = 1,
    Int = 2,
    Int8 = 3,
    Int16 = 4,
    Int32 = 5,
    Int64 = 6,
    Uint = 7,
    Uint8 = 8,
    Uint16 = 9,
    Uint32 = 10,
    Uint64 = 11,
    Uintptr = 12,
    Float32 = 13,
    Float64 = 14,
    Complex64 = 15,
    Complex128 = 16,
    Array = 17,
    Chan = 18,
    Func = 19,
    Interface = 20,
    Map = 21,
    Pointer = 22,
    Slice = 23,
    String = 24,
    Struct = 25,
    UnsafePointer = 26,
}

impl Kind {
    fn from_byte(byte: u8) -> Self {
        match byte & 0x1F {
            0 => Kind::Invalid,
            1 => Kind::Bool,
            2 => Kind::Int,
            3 => Kind::Int8,
            4 => Kind::Int16,
            5 => Kind::Int32,
            6 => Kind::Int64,
            7 => Kind::Uint,
            8 => Kind::Uint8,
            9 => Kind::Uint16,
            10 => Kind::Uint32,
            11 => Kind::Uint64,
            12 => Kind::Uintptr,
            13 => Kind::Float32,
            14 => Kind::Float64,
            15 => Kind::Complex64,
            16 => Kind::Complex128,
            17 => Kind::Array,
            18 => Kind::Chan,
            19 => Kind::Func,
            20 => Kind::Interface,
            21 => Kind::Map,
            22 => Kind::Pointer,
            23 => Kind::Slice,
            24 => Kind::String,
            25 => Kind::Struct,
            _ => Kind::UnsafePointer,
        }
    }
}

bitflags! {
    /// The upper 3 bits of an `rtype`'s `kind` byte.
    #[derive(Clone, Copy, Eq, PartialEq, Debug)]
    pub struct KindFlags: u8 {
        const DIRECT_IFACE = 0x20;
        const GC_PROG = 0x40;
        const REGULAR_MEMORY = 0x80;
    }
}

fn kind_byte_offset(ptr_size: u64) -> u64 {
    if ptr_size == 8 { 23 } else { 15 }
}

fn rtype_size(ptr_size: u64) -> u64 {
    if ptr_size == 8 { 48 } else { 32 }
}

fn name_offset_field(ptr_size: u64) -> u64 {
    if ptr_size == 8 { 40 } else { 24 }
}

fn fields_slice_offset(ptr_size: u64) -> u64 {
    if ptr_size == 8 { 56 } else { 36 }
}

/// A collection of `rtype` descriptors, either a direct slice of `.typelink` offsets relative to
/// `runtime.types` or the `typelinks` array resolved out of `moduledata`.
pub struct StructTable<'elf> {
    elf: &'elf Elf,
    base: u64,
    count: u64,
    types: u64,
    ptr_size: u64,
    version: Version,
}

impl<'elf> StructTable<'elf> {
    pub fn new(elf: &'elf Elf, base: u64, count: u64, types: u64, ptr_size: u64, version: Version) -> Self {
        Self { elf, base, count, types, ptr_size, version }
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// This function resolves the `i`th entry of the `.typelink` table: a 4-byte offset relative to
    /// `runtime.types`, identifying the `rtype` descriptor at `types + offset`.
    pub fn get(&self, index: u64) -> Option<Struct<'elf>> {
        if index >= self.count {
            return None;
        }

        let entry_addr = self.base + index * 4;
        let buffer = self.elf.read_virtual_memory(entry_addr, 4).ok()?;
        let offset = self.elf.endian().convert(&buffer, 4).ok()?;

        Some(Struct { elf: self.elf, address: self.types + offset, types: self.types, ptr_size: self.ptr_size, version: self.version })
    }

    pub fn iter(&self) -> impl Iterator<Item = Struct<'elf>> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }
}

/// A handle over a single `rtype` descriptor. Despite the name, this wraps every `reflect.Kind`,
/// not only `Struct`; [Struct::field_count]/[Struct::field] recurse through wrapper kinds down to
/// the eventual struct descriptor they name.
pub struct Struct<'elf> {
    elf: &'elf Elf,
    address: u64,
    types: u64,
    ptr_size: u64,
    version: Version,
}

impl<'elf> Struct<'elf> {
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn kind(&self) -> Option<Kind> {
        let byte = self.elf.read_virtual_memory(self.address + kind_byte_offset(self.ptr_size), 1).ok()?;
        Some(Kind::from_byte(byte[0]))
    }

    pub fn kind_flags(&self) -> Option<KindFlags> {
        let byte = self.elf.read_virtual_memory(self.address + kind_byte_offset(self.ptr_size), 1).ok()?;
        Some(KindFlags::from_bits_truncate(byte[0] & 0xE0))
    }

    pub fn name(&self) -> Option<crate::std::string::String> {
        let field = self.elf.read_virtual_memory(self.address + name_offset_field(self.ptr_size), 4).ok()?;
        let name_offset = self.elf.endian().convert(&field, 4).ok()?;
        if name_offset == 0 {
            return None;
        }

        name::read(self.elf, self.types + name_offset, self.version, None)
    }

    /// This function returns the number of fields a `Struct`-kind descriptor carries, or the
    /// element/key-value arity implied by wrapper kinds once they are unwrapped down to their
    /// eventual `Struct`. Non-struct, non-wrapper kinds report `0`.
    pub fn field_count(&self) -> u64 {
        match self.resolve_struct() {
            Some(descriptor) => descriptor.raw_field_count().unwrap_or(0),
            None => 0,
        }
    }

    pub fn field(&self, index: u64) -> Option<StructField<'elf>> {
        self.resolve_struct()?.raw_field(index)
    }

    /// This function follows `Array`/`Chan`/`Map`/`Pointer`/`Slice` element pointers down to the
    /// `Struct` descriptor they eventually name, returning `self` unchanged if it is already a
    /// `Struct`, and `None` for every other kind or on a broken indirection.
    fn resolve_struct(&self) -> Option<Struct<'elf>> {
        let mut current = Struct { elf: self.elf, address: self.address, types: self.types, ptr_size: self.ptr_size, version: self.version };

        loop {
            match current.kind()? {
                Kind::Struct => return Some(current),
                Kind::Array | Kind::Chan | Kind::Pointer | Kind::Slice => {
                    let element = current.read_pointer(rtype_size(current.ptr_size))?;
                    current = Struct { elf: current.elf, address: element, types: current.types, ptr_size: current.ptr_size, version: current.version };
                }
                Kind::Map => {
                    let element = current.read_pointer(rtype_size(current.ptr_size) + current.ptr_size)?;
                    current = Struct { elf: current.elf, address: element, types: current.types, ptr_size: current.ptr_size, version: current.version };
                }
                _ => return None,
            }
        }
    }

    fn read_pointer(&self, offset: u64) -> Option<u64> {
        let buffer = self.elf.read_virtual_memory(self.address + offset, self.ptr_size).ok()?;
        self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()
    }

    fn raw_field_count(&self) -> Option<u64> {
        let header_addr = self.address + fields_slice_offset(self.ptr_size) + self.ptr_size;
        let buffer = self.elf.read_virtual_memory(header_addr, self.ptr_size).ok()?;
        self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()
    }

    fn raw_field(&self, index: u64) -> Option<StructField<'elf>> {
        let count = self.raw_field_count()?;
        if index >= count {
            return None;
        }

        let slice_ptr_addr = self.address + fields_slice_offset(self.ptr_size);
        let buffer = self.elf.read_virtual_memory(slice_ptr_addr, self.ptr_size).ok()?;
        let fields_ptr = self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()?;

        let stride = 3 * self.ptr_size;
        let entry_addr = fields_ptr + index * stride;

        let name_buf = self.elf.read_virtual_memory(entry_addr, self.ptr_size).ok()?;
        let name_ptr = self.elf.endian().convert(&name_buf, self.ptr_size as usize).ok()?;
        if name_ptr == 0 {
            return None;
        }

        Some(StructField {
            elf: self.elf,
            name_address: name_ptr,
            entry_address: entry_addr,
            types: self.types,
            ptr_size: self.ptr_size,
            version: self.version,
        })
    }
}

/// A single entry in a struct descriptor's field list: its name, its embedded type, and its byte
/// offset within the struct.
pub struct StructField<'elf> {
    elf: &'elf Elf,
    name_address: u64,
    entry_address: u64,
    types: u64,
    ptr_size: u64,
    version: Version,
}

impl<'elf> StructField<'elf> {
    pub fn name(&self) -> Option<crate::std::string::String> {
        let cap = if self.version < Version::new(1, 17) { Some(FIELD_NAME_LEGACY_CAP) } else { None };
        name::read(self.elf, self.name_address, self.version, cap)
    }

    pub fn field_type(&self) -> Option<Struct<'elf>> {
        let buffer = self.elf.read_virtual_memory(self.entry_address + self.ptr_size, self.ptr_size).ok()?;
        let address = self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()?;

        Some(Struct { elf: self.elf, address, types: self.types, ptr_size: self.ptr_size, version: self.version })
    }

    /// This function returns the field's byte offset within its struct, undoing the embedded-field
    /// bit packed into the low bit of the raw offset word for toolchains at or before 1.18.
    pub fn offset(&self) -> Option<u64> {
        let offset_addr = self.entry_address + 2 * self.ptr_size;
        let buffer = self.elf.read_virtual_memory(offset_addr, self.ptr_size).ok()?;
        let raw = self.elf.endian().convert(&buffer, self.ptr_size as usize).ok()?;

        if self.version <= EMBEDDED_OFFSET_SHIFT_UNTIL { Some(raw >> 1) } else { Some(raw) }
    }
}
