#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(test)]
pub mod tests;
pub mod endian;
pub mod header;

#[cfg(feature = "std")]
pub mod symbol;

use thiserror_no_std::Error;

#[cfg(feature = "std")]
pub use std;

#[cfg(not(feature = "std"))]
pub use core as std;

use crate::std::mem::size_of;
use crate::header::FileHeader;
use crate::header::ident::{ElfClass, ElfIdent};

#[cfg(feature = "std")]
use crate::header::ProgramHeader;
#[cfg(feature = "std")]
use crate::header::{Section, SectionHeader, SegmentType};
#[cfg(feature = "std")]
use crate::header::symtab::SymbolTable;
#[cfg(feature = "std")]
use std::string::String;
#[cfg(feature = "std")]
use std::sync::Arc;
#[cfg(feature = "std")]
use std::vec::Vec;

/// This enum represents all possible recoverable error codes in this library. This error is used
/// on any operation that can fail, from the raw ELF header parser up to the Go metadata discovery
/// engine built on top of it.
#[derive(Error, Debug)]
pub enum Error {
    /// The ELF magic bytes can't be found in the specified ELF data or data holder
    #[error("Unable to find magic bytes in specified ELF")]
    InvalidMagic,

    /// The specified ELF data's size is not high enough to be a ELF file
    #[error("The size {0} is too low for an ELF file, please check your parameters")]
    NotEnoughBytes(usize),

    /// The provided ELF file's class is neither `ELFCLASS32` nor `ELFCLASS64`
    #[error("Invalid or unsupported ELF class")]
    InvalidClass,

    /// A section that is required for the requested operation is absent from the ELF file
    #[error("Required section {0} is missing")]
    SectionMissing(&'static str),

    /// No Go toolchain version could be determined from build info, the symbol table, or the
    /// `.gopclntab` magic, or the determined version predates the supported range (< go1.10)
    #[error("Unable to determine a supported Go toolchain version")]
    UnsupportedVersion,

    /// The `.go.buildinfo` section is present but its magic does not match, or the module-info
    /// payload it carries is shorter than the 32-byte prefix+suffix framing requires
    #[error("Go build info section is malformed")]
    BuildInfoInvalid,

    /// No `runtime.firstmoduledata` symbol was present and no scan candidate in `.rodata`,
    /// `.noptrdata` or `.data` validated against the `.gopclntab` address
    #[error("Unable to locate the runtime moduledata descriptor")]
    ModuleDataNotFound,

    /// The first word of `.gopclntab` did not match any of the four known magic constants
    #[error("Unrecognized .gopclntab magic")]
    PclntabMagicUnknown,

    /// A virtual memory read failed, either because no loaded segment covers the address or
    /// because the underlying ELF reader could not produce the requested bytes
    #[error("Unable to read {length} byte(s) of virtual memory at address {address:#x}")]
    MemoryUnreadable { address: u64, length: u64 },

    /// The endian converter was asked to read an integer width other than 1, 2, 4 or 8 bytes
    #[error("Invalid integer width for endian conversion")]
    InvalidSize,

    /// A variable-length integer or length-prefixed string ran past the end of the available
    /// buffer before it could be fully decoded
    #[error("Truncated data while decoding")]
    Truncated,

    /// A variable-length integer decoded to a value wider than the target integer type
    #[error("Varint value overflowed the target integer type")]
    Overflow,

    /// Some std I/O operation fails (Only available with `std`-feature)
    #[error(transparent)]
    #[cfg(feature = "std")]
    IO(#[from] std::io::Error)
}

/// This structure represents a fully parsed ELF object: its file header, program headers and
/// section headers (with resolved names), plus an owned copy of the raw bytes used to satisfy
/// virtual-memory reads on demand.
///
/// [Elf] is cheap to clone — the underlying bytes are held behind an [Arc], matching the
/// pass-by-value semantics the Go metadata engine expects from its ELF reader collaborator (see
/// [symbol::Reader](crate::symbol::Reader)).
#[cfg_attr(feature = "std", derive(Clone))]
pub struct Elf {
    header: FileHeader,
    #[cfg(feature = "std")]
    data: Arc<[u8]>,
    #[cfg(feature = "std")]
    program_headers: Vec<ProgramHeader>,
    #[cfg(feature = "std")]
    sections: Vec<Section>,
}

impl Elf {
    /// This field contains the magic bytes of an ELF file
    const MAGIC_BYTES: [u8; 4] = [0x7F, 0x45, 0x4C, 0x46];

    /// This field contains the minimal size of an ELF file
    const MIN_ELF_SIZE: usize = size_of::<ElfIdent>();

    /// This function accepts a byte slice and parses it into the content of the ELF file. But this
    /// conversion can fail, if the validation of the values in the header or other section data is
    /// invalid.
    ///
    /// With the `std` feature (the default), this also parses the program header table and the
    /// section header table (resolving section names against the section header string table),
    /// and retains an owned copy of the bytes so that later virtual-memory reads succeed without
    /// borrowing from the caller.
    ///
    /// Here is a list with all errors, which can occur while this operation:
    /// - [Error::InvalidMagic] - The magic bytes of the file can't be found
    /// - [Error::NotEnoughBytes] - The specified ELF data's size is not high enough to be a ELF file
    /// - [Error::InvalidClass] - The provided ELF file's class is not valid
    pub fn from_bytes(bytes: &[u8]) -> Result<Elf, Error> {
        // Get index of ELF header and validate size of the file with magic bytes index as start
        // point
        let index = Self::elf_index(bytes).ok_or(Error::InvalidMagic)? + 4;
        if (bytes.len() - index) < Self::MIN_ELF_SIZE {
            return Err(Error::NotEnoughBytes(bytes.len() - index));
        }

        let header = FileHeader::read(bytes, index)?;

        #[cfg(feature = "std")]
        {
            let program_headers = Self::read_program_headers(&header.ident, bytes, &header)?;
            let sections = Self::read_sections(&header.ident, bytes, &header)?;

            Ok(Elf { header, data: Arc::from(bytes), program_headers, sections })
        }

        #[cfg(not(feature = "std"))]
        {
            Ok(Elf { header })
        }
    }

    /// This function accepts the specified path, opens the file and reads the content into a byte
    /// slice. The byte slice is given to the [Elf::from_bytes] function.
    ///
    /// **This function uses heap allocations to read the file into a in-memory structure**
    ///
    /// Here is a list with all errors, which can occur while this operation:
    /// - [Error::InvalidMagic] - The magic bytes of the file can't be found
    /// - [Error::IO] - Some std I/O operation fails (Only available with `std`-feature)
    /// - [Error::NotEnoughBytes] - The specified ELF file's is not big enough to be a ELF file
    #[inline(always)]
    #[cfg(feature = "std")]
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Elf, Error> {
        use std::{fs::File, io::Read};

        // Read file into bytes
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        let length = file.read_to_end(&mut bytes)?;

        // Validate file length
        if length < Self::MIN_ELF_SIZE {
            return Err(Error::NotEnoughBytes(length));
        }

        // Give from_bytes to bytes as slice
        Self::from_bytes(bytes.as_slice())
    }

    /// This function scans the specified data for the ELF magic bytes. If no magic bytes are found
    /// the function returns a None. Otherwise this function returns the index of the magic bytes in
    /// the specified data.
    fn elf_index(bytes: &[u8]) -> Option<usize> {
        if bytes.len() < Self::MAGIC_BYTES.len() {
            return None;
        }

        for i in 0..=(bytes.len() - Self::MAGIC_BYTES.len()) {
            if bytes[i..=(i + 3)].eq(Self::MAGIC_BYTES.as_slice()) {
                return Some(i);
            }
        }
        None
    }

    /// This function returns a reference to the file header.
    #[inline]
    pub fn file_header(&self) -> &FileHeader {
        &self.header
    }

    #[cfg(feature = "std")]
    fn read_program_headers(ident: &ElfIdent, bytes: &[u8], header: &FileHeader) -> Result<Vec<ProgramHeader>, Error> {
        let mut program_headers = Vec::with_capacity(header.program_header_count as usize);

        for i in 0..header.program_header_count as usize {
            let offset = header.program_header_offset as usize + i * header.program_header_size as usize;
            program_headers.push(ProgramHeader::read(ident, bytes, offset)?);
        }

        Ok(program_headers)
    }

    #[cfg(feature = "std")]
    fn read_sections(ident: &ElfIdent, bytes: &[u8], header: &FileHeader) -> Result<Vec<Section>, Error> {
        let mut headers = Vec::with_capacity(header.section_header_count as usize);

        for i in 0..header.section_header_count as usize {
            let offset = header.section_header_offset as usize + i * header.section_header_size as usize;
            headers.push(SectionHeader::read(ident, bytes, offset)?);
        }

        let strtab = headers.get(header.string_table_index as usize);

        let mut sections = Vec::with_capacity(headers.len());
        for section_header in headers.iter().cloned() {
            let name = strtab
                .and_then(|strtab| {
                    let start = strtab.offset as usize + section_header.name as usize;
                    bytes.get(start..)
                })
                .map(|slice| {
                    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
                    String::from_utf8_lossy(&slice[..end]).into_owned()
                })
                .unwrap_or_default();

            sections.push(Section { name, header: section_header });
        }

        Ok(sections)
    }

    /// This function returns every section parsed from the section header table, with names
    /// already resolved against the section header string table.
    #[cfg(feature = "std")]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// This function looks up a section by its exact name (e.g. `.gopclntab`).
    #[cfg(feature = "std")]
    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// This function looks up a section whose name contains the given substring, matching the
    /// original Go symbol reader's lenient match against `.go.buildinfo` (which it locates by
    /// substring `buildinfo`, not exact name, to tolerate prefixed section names some linkers
    /// emit).
    #[cfg(feature = "std")]
    pub fn section_containing(&self, needle: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name.contains(needle))
    }

    /// This function returns every program header (segment) parsed from the program header table.
    #[cfg(feature = "std")]
    pub fn segments(&self) -> &[ProgramHeader] {
        &self.program_headers
    }

    /// This function returns the size, in bytes, of a pointer on the target architecture: 4 for
    /// 32-bit objects, 8 for 64-bit objects.
    #[cfg(feature = "std")]
    pub fn ptr_size(&self) -> usize {
        match self.header.ident.class {
            ElfClass::Class64 => 8,
            _ => 4,
        }
    }

    /// This function returns the byte order the object was encoded with.
    #[cfg(feature = "std")]
    pub fn endian(&self) -> header::ident::ElfEndian {
        self.header.ident.endian
    }

    /// This function translates a virtual address into a file offset by walking the loadable
    /// (`PT_LOAD`) program headers, returning the first segment whose mapped range contains the
    /// address.
    #[cfg(feature = "std")]
    fn translate(&self, address: u64) -> Option<u64> {
        self.program_headers
            .iter()
            .filter(|segment| segment.ty == SegmentType::Load)
            .find(|segment| {
                address >= segment.virtual_address
                    && address < segment.virtual_address + segment.memory_size
            })
            .map(|segment| segment.offset + (address - segment.virtual_address))
    }

    /// This function reads `length` bytes of virtual memory at the given address, translating
    /// through the loadable segments. Returns [Error::MemoryUnreadable] if no segment covers the
    /// address or the translated range falls outside the file.
    #[cfg(feature = "std")]
    pub fn read_virtual_memory(&self, address: u64, length: u64) -> Result<Vec<u8>, Error> {
        let offset = self
            .translate(address)
            .ok_or(Error::MemoryUnreadable { address, length })? as usize;

        self.data
            .get(offset..offset + length as usize)
            .map(|slice| slice.to_vec())
            .ok_or(Error::MemoryUnreadable { address, length })
    }

    /// This function returns a direct reference into the mapped image of the binary starting at
    /// the given virtual address, running to the end of the underlying buffer. This mirrors the
    /// original reader's `virtualMemory(address) -> const byte*` — callers that only need a
    /// handful of bytes at a known offset from `address` can slice the result themselves instead
    /// of paying for another bounded read.
    #[cfg(feature = "std")]
    pub fn virtual_memory(&self, address: u64) -> Result<&[u8], Error> {
        let offset = self
            .translate(address)
            .ok_or(Error::MemoryUnreadable { address, length: 0 })? as usize;

        self.data
            .get(offset..)
            .ok_or(Error::MemoryUnreadable { address, length: 0 })
    }

    /// This function locates the lowest virtual address mapped by any `PT_LOAD` segment, rounded
    /// down to a 0x1000 page boundary. This is the `minVA` term in the `ET_DYN` base-relocation
    /// arithmetic (`base - minVA`) used when a caller supplies the runtime load base of a
    /// position-independent binary.
    #[cfg(feature = "std")]
    pub fn min_load_address(&self) -> Option<u64> {
        const PAGE_SIZE: u64 = 0x1000;

        self.program_headers
            .iter()
            .filter(|segment| segment.ty == SegmentType::Load)
            .map(|segment| segment.virtual_address)
            .min()
            .map(|addr| addr & !(PAGE_SIZE - 1))
    }

    /// This function returns whether this object is a shared object or position-independent
    /// executable (`ET_DYN`), which is exactly the case in which callers need to apply the
    /// `base - minVA` correction before translating a runtime address.
    #[cfg(feature = "std")]
    pub fn is_dynamic(&self) -> bool {
        self.header.ty == header::FileType::SharedObject
    }

    /// This function parses the `.symtab` section (falling back to `.dynsym` if no static symbol
    /// table is present), resolving symbol names against its linked string table section.
    ///
    /// Here is a list with all errors, which can occur while this operation:
    /// - [Error::SectionMissing] - Neither `.symtab` nor `.dynsym` is present
    /// - [Error::InvalidClass] - The provided ELF file's class is not valid
    #[cfg(feature = "std")]
    pub fn symbol_table(&self) -> Result<SymbolTable, Error> {
        let symtab = self
            .section_by_name(".symtab")
            .or_else(|| self.section_by_name(".dynsym"))
            .ok_or(Error::SectionMissing(".symtab"))?;

        let strtab = self
            .sections
            .get(symtab.header.link as usize)
            .ok_or(Error::SectionMissing(".strtab"))?;

        let data = self.section_data(symtab)?;
        let strtab_data = self.section_data(strtab)?;

        SymbolTable::parse(&self.header.ident, data, strtab_data)
    }

    /// This function returns the raw bytes backing a section, as read from the file (not the
    /// virtual-address space). `SHT_NOBITS` sections (e.g. `.bss`) occupy no file space and yield
    /// an empty slice.
    #[cfg(feature = "std")]
    pub fn section_data(&self, section: &Section) -> Result<&[u8], Error> {
        if section.header.ty == header::SectionType::NoBits {
            return Ok(&[]);
        }

        let start = section.header.offset as usize;
        let end = start + section.header.size as usize;

        self.data.get(start..end).ok_or(Error::MemoryUnreadable {
            address: section.header.offset,
            length: section.header.size,
        })
    }
}
