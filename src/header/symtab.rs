//! This module contains the ELF symbol table parser. A symbol table section (`SHT_SYMTAB` or
//! `SHT_DYNSYM`) is a flat array of fixed-size entries whose layout differs between 32-bit and
//! 64-bit objects; each entry's name is an index into a linked string table section (`sh_link`).
//!
//! ## See also
//! - [Symbol Table](https://www.sco.com/developers/gabi/latest/ch4.symtab.html) by SCO, Inc.
use std::string::String;
use std::vec::Vec;
use crate::Error;
use crate::header::ident::{ElfClass, ElfIdent};

/// This structure represents a single entry of an ELF symbol table.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ElfSymbol {
    /// This field indicates the name of the symbol, resolved against the linked string table. An
    /// empty string indicates an unnamed symbol (`st_name == 0`).
    pub name: String,

    /// This field indicates the value of the symbol. Depending on the symbol, this may be a
    /// virtual address, an absolute value or an section-relative offset.
    pub value: u64,

    /// This field indicates the size of the object the symbol refers to, or zero if unknown.
    pub size: u64,

    /// This field holds the symbol's type and binding attributes (`ELF32_ST_INFO`).
    pub info: u8,

    /// This field currently holds the symbol's visibility.
    pub other: u8,

    /// This field indicates the section header table index the symbol is defined in.
    pub section_index: u16,
}

/// This structure represents a parsed ELF symbol table. It is built once by
/// [Elf::symbol_table](crate::Elf::symbol_table) and then queried by name, matching the `(name,
/// value)` symbol table accessor that the metadata discovery engine consumes.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<ElfSymbol>,
}

impl SymbolTable {
    /// This function parses the raw bytes of a `SHT_SYMTAB`/`SHT_DYNSYM` section together with
    /// its linked string table section's bytes into a [SymbolTable].
    ///
    /// Here is a list with all errors, which can occur while this operation:
    /// - [Error::InvalidClass] - The provided ELF file's class is not valid
    /// - [Error::Truncated] - The symbol table section's size is not a multiple of the entry size
    pub fn parse(ident: &ElfIdent, data: &[u8], strtab: &[u8]) -> Result<Self, Error> {
        let entry_size = match ident.class {
            ElfClass::Invalid => return Err(Error::InvalidClass),
            ElfClass::Class32 => 16,
            ElfClass::Class64 => 24,
        };

        if data.len() % entry_size != 0 {
            return Err(Error::Truncated);
        }

        let mut symbols = Vec::with_capacity(data.len() / entry_size);
        for chunk in data.chunks_exact(entry_size) {
            symbols.push(Self::parse_entry(ident, chunk, strtab)?);
        }

        Ok(Self { symbols })
    }

    fn parse_entry(ident: &ElfIdent, entry: &[u8], strtab: &[u8]) -> Result<ElfSymbol, Error> {
        let mut offset = 0usize;
        let name_index = ident.endian.read::<u32>(entry, Some(&mut offset)).ok_or(Error::Truncated)?;

        let symbol = match ident.class {
            ElfClass::Invalid => return Err(Error::InvalidClass),
            ElfClass::Class32 => {
                let value = ident.endian.read::<u32>(entry, Some(&mut offset)).ok_or(Error::Truncated)? as u64;
                let size = ident.endian.read::<u32>(entry, Some(&mut offset)).ok_or(Error::Truncated)? as u64;
                let info = *entry.get(offset).ok_or(Error::Truncated)?;
                offset += 1;
                let other = *entry.get(offset).ok_or(Error::Truncated)?;
                offset += 1;
                let section_index = ident.endian.read::<u16>(entry, Some(&mut offset)).ok_or(Error::Truncated)?;

                ElfSymbol { name: String::new(), value, size, info, other, section_index }
            }
            ElfClass::Class64 => {
                let info = *entry.get(offset).ok_or(Error::Truncated)?;
                offset += 1;
                let other = *entry.get(offset).ok_or(Error::Truncated)?;
                offset += 1;
                let section_index = ident.endian.read::<u16>(entry, Some(&mut offset)).ok_or(Error::Truncated)?;
                let value = ident.endian.read::<u64>(entry, Some(&mut offset)).ok_or(Error::Truncated)?;
                let size = ident.endian.read::<u64>(entry, Some(&mut offset)).ok_or(Error::Truncated)?;

                ElfSymbol { name: String::new(), value, size, info, other, section_index }
            }
        };

        Ok(ElfSymbol {
            name: Self::resolve_name(strtab, name_index),
            ..symbol
        })
    }

    fn resolve_name(strtab: &[u8], index: u32) -> String {
        if index == 0 {
            return String::new();
        }

        let start = index as usize;
        let Some(bytes) = strtab.get(start..) else {
            return String::new();
        };

        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    /// This function returns the symbol with the specified name, or `None` if no such symbol is
    /// defined in this table.
    pub fn find(&self, name: &str) -> Option<&ElfSymbol> {
        self.symbols.iter().find(|symbol| symbol.name == name)
    }

    /// This function returns the number of symbols in this table.
    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// This function returns an iterator over all symbols in this table.
    pub fn iter(&self) -> impl Iterator<Item = &ElfSymbol> {
        self.symbols.iter()
    }
}
