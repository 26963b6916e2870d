//! The `.go.buildinfo` decoder: a small, self-contained section (not reached through virtual
//! memory) carrying the build magic, a pointer-size/flags byte pair, and either pointer-based or
//! pointer-free encoded version and module-info strings.

use crate::Elf;
use crate::Error;
use crate::symbol::varint;
use crate::symbol::version::Version;

const MAGIC: &[u8; 14] = b"\xff Go buildinf:";
const MAGIC_SIZE: u64 = 14;
const INFO_OFFSET: u64 = 16;
const POINTER_FREE_OFFSET: u64 = 32;
const POINTER_FREE_FLAG: u8 = 0x2;

/// A single entry in the module graph recorded by the Go linker: a module path, its resolved
/// version, its content hash, and an optional `replace` directive pointing at another module.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Module {
    pub path: crate::std::string::String,
    pub version: crate::std::string::String,
    pub sum: crate::std::string::String,
    pub replace: Option<crate::std::boxed::Box<Module>>,
}

/// The decoded `mod` line for the main module and every `dep`/`=>` line that follows it.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ModuleInfo {
    pub path: crate::std::string::String,
    pub main: Option<Module>,
    pub deps: crate::std::vec::Vec<Module>,
}

/// A handle over a validated `.go.buildinfo` section.
pub struct BuildInfo<'elf> {
    elf: &'elf Elf,
    data: &'elf [u8],
    ptr_size: u64,
    pointer_free: bool,
}

impl<'elf> BuildInfo<'elf> {
    /// This function validates the magic at the start of `data` and reads the pointer-size and
    /// flags bytes that immediately follow it.
    ///
    /// Here is a list with all errors, which can occur while this operation:
    /// - [Error::BuildInfoInvalid] - `data` is shorter than the magic or the magic does not match
    pub fn new(elf: &'elf Elf, data: &'elf [u8]) -> Result<Self, Error> {
        let prefix = data.get(..MAGIC_SIZE as usize).ok_or(Error::BuildInfoInvalid)?;
        if prefix != MAGIC.as_slice() {
            return Err(Error::BuildInfoInvalid);
        }

        let ptr_size = *data.get(MAGIC_SIZE as usize).ok_or(Error::BuildInfoInvalid)? as u64;
        let flags = *data.get(MAGIC_SIZE as usize + 1).ok_or(Error::BuildInfoInvalid)?;
        let pointer_free = flags & POINTER_FREE_FLAG != 0;

        Ok(Self { elf, data, ptr_size, pointer_free })
    }

    /// This function returns the toolchain version string recorded in the build info, e.g.
    /// `"go1.20.4"`.
    pub fn version(&self) -> Option<Version> {
        let text = if self.pointer_free {
            self.read_varint_string(POINTER_FREE_OFFSET)?
        } else {
            self.read_pointer_string(INFO_OFFSET)?
        };

        Version::parse(&text)
    }

    /// This function returns the decoded module-info graph: the main module path, the `mod` line,
    /// and every `dep`/`=>` line.
    ///
    /// Here is a list with all errors, which can occur while this operation:
    /// - [Error::BuildInfoInvalid] - the module-info payload is absent or shorter than the 32-byte
    ///   prefix+suffix framing requires
    pub fn module_info(&self) -> Result<ModuleInfo, Error> {
        let payload = if self.pointer_free {
            let (length, consumed) = varint::decode(&self.data[POINTER_FREE_OFFSET as usize..])?;
            self.read_varint_string(POINTER_FREE_OFFSET + length + consumed as u64).ok_or(Error::BuildInfoInvalid)?
        } else {
            self.read_pointer_string(INFO_OFFSET + self.ptr_size).ok_or(Error::BuildInfoInvalid)?
        };

        if payload.len() < 32 {
            return Err(Error::BuildInfoInvalid);
        }

        Ok(Self::parse_module_info(&payload[16..payload.len() - 16]))
    }

    fn parse_module_info(body: &str) -> ModuleInfo {
        let mut info = ModuleInfo::default();

        for line in body.split('\n') {
            let tokens: crate::std::vec::Vec<&str> = line.split('\t').collect();

            if line.starts_with("path") {
                if tokens.len() == 2 {
                    info.path = tokens[1].to_string();
                }
            } else if line.starts_with("mod") {
                if let Some(module) = Self::read_entry(&tokens) {
                    info.main = Some(module);
                }
            } else if line.starts_with("dep") {
                if let Some(module) = Self::read_entry(&tokens) {
                    info.deps.push(module);
                }
            } else if line.starts_with("=>") {
                if let (Some(module), Some(last)) = (Self::read_entry(&tokens), info.deps.last_mut()) {
                    last.replace = Some(crate::std::boxed::Box::new(module));
                }
            }
        }

        info
    }

    fn read_entry(tokens: &[&str]) -> Option<Module> {
        if tokens.len() != 4 {
            return None;
        }

        Some(Module {
            path: tokens[1].to_string(),
            version: tokens[2].to_string(),
            sum: tokens[3].to_string(),
            replace: None,
        })
    }

    /// The legacy encoding stores, at `offset` in the section itself, a pointer to a
    /// `(data_ptr, length)` string header living in virtual memory — not the header inline. This
    /// function follows both indirections: the section-local pointer word to the header's address,
    /// then the header to the string's bytes.
    fn read_pointer_string(&self, offset: u64) -> Option<crate::std::string::String> {
        let pointer_word = self.data.get(offset as usize..(offset as usize + self.ptr_size as usize))?;
        let header_addr = self.elf.endian().convert(pointer_word, self.ptr_size as usize).ok()?;

        let header = self.elf.read_virtual_memory(header_addr, self.ptr_size * 2).ok()?;
        let data_ptr = self.elf.endian().convert(&header[..self.ptr_size as usize], self.ptr_size as usize).ok()?;
        let length = self.elf.endian().convert(&header[self.ptr_size as usize..], self.ptr_size as usize).ok()?;

        let bytes = self.elf.read_virtual_memory(data_ptr, length).ok()?;
        crate::std::string::String::from_utf8(bytes).ok()
    }

    fn read_varint_string(&self, offset: u64) -> Option<crate::std::string::String> {
        let header = self.data.get(offset as usize..)?;
        let (length, consumed) = varint::decode(header).ok()?;

        let start = offset as usize + consumed;
        let bytes = self.data.get(start..start + length as usize)?;
        crate::std::string::String::from_utf8(bytes.to_vec()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::synthetic::SyntheticElf;

    fn encode_varint(mut value: u64) -> crate::std::vec::Vec<u8> {
        let mut out = crate::std::vec::Vec::new();
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if value == 0 {
                break;
            }
        }
        out
    }

    fn framed_module_info() -> crate::std::string::String {
        let lines = [
            "path\texample.com/app",
            "mod\texample.com/app\tv1.0.0\th1:abc=",
            "dep\texample.com/dep\tv1.2.3\th1:def=",
            "=>\texample.com/replacement\tv9.9.9\th1:xyz=",
        ];
        let body = lines.join("\n");

        let mut framed = crate::std::string::String::new();
        framed.push_str(&"\0".repeat(16));
        framed.push_str(&body);
        framed.push_str(&"\0".repeat(16));
        framed
    }

    #[test]
    fn decodes_pointer_free_version_and_module_info_with_a_replace() {
        let mut synth = SyntheticElf::new_64_le();

        let mut bytes = crate::std::vec::Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.push(8); // ptr size
        bytes.push(POINTER_FREE_FLAG); // little endian, pointer-free
        bytes.resize(POINTER_FREE_OFFSET as usize, 0);

        let version_text = b"go1.18.2";
        bytes.extend_from_slice(&encode_varint(version_text.len() as u64));
        bytes.extend_from_slice(version_text);

        let framed = framed_module_info();
        bytes.extend_from_slice(&encode_varint(framed.len() as u64));
        bytes.extend_from_slice(framed.as_bytes());

        let addr = synth.alloc(bytes.len() as u64);
        synth.write_bytes(addr, &bytes);
        synth.add_section(".go.buildinfo", 1, addr, bytes.len() as u64);

        let elf = synth.build();
        let section = elf.section_by_name(".go.buildinfo").unwrap();
        let data = elf.section_data(section).unwrap();

        let build_info = BuildInfo::new(&elf, data).unwrap();
        assert_eq!(build_info.version(), Some(Version::new(1, 18)));

        let info = build_info.module_info().unwrap();
        assert_eq!(info.path, "example.com/app");
        assert_eq!(info.deps.len(), 1);
        assert_eq!(info.deps[0].path, "example.com/dep");
        let replace = info.deps[0].replace.as_ref().unwrap();
        assert_eq!(replace.path, "example.com/replacement");
    }

    #[test]
    fn decodes_legacy_pointer_based_version_and_module_info() {
        let mut synth = SyntheticElf::new_64_le();

        let version_text = b"go1.16.5";
        let version_data_addr = synth.alloc(version_text.len() as u64);
        synth.write_bytes(version_data_addr, version_text);
        let version_header_addr = synth.alloc(16);
        synth.write_u64(version_header_addr, version_data_addr);
        synth.write_u64(version_header_addr + 8, version_text.len() as u64);

        let framed = framed_module_info();
        let modinfo_data_addr = synth.alloc(framed.len() as u64);
        synth.write_bytes(modinfo_data_addr, framed.as_bytes());
        let modinfo_header_addr = synth.alloc(16);
        synth.write_u64(modinfo_header_addr, modinfo_data_addr);
        synth.write_u64(modinfo_header_addr + 8, framed.len() as u64);

        let mut bytes = crate::std::vec::Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.push(8); // ptr size
        bytes.push(0); // little endian, pointer-based (flags bit 1 clear)
        bytes.resize(INFO_OFFSET as usize, 0);
        bytes.extend_from_slice(&version_header_addr.to_le_bytes());
        bytes.extend_from_slice(&modinfo_header_addr.to_le_bytes());

        let addr = synth.alloc(bytes.len() as u64);
        synth.write_bytes(addr, &bytes);
        synth.add_section(".go.buildinfo", 1, addr, bytes.len() as u64);

        let elf = synth.build();
        let section = elf.section_by_name(".go.buildinfo").unwrap();
        let data = elf.section_data(section).unwrap();

        let build_info = BuildInfo::new(&elf, data).unwrap();
        assert_eq!(build_info.version(), Some(Version::new(1, 16)));

        let info = build_info.module_info().unwrap();
        assert_eq!(info.path, "example.com/app");
        assert_eq!(info.deps.len(), 1);
        assert_eq!(info.deps[0].path, "example.com/dep");
        let replace = info.deps[0].replace.as_ref().unwrap();
        assert_eq!(replace.path, "example.com/replacement");
    }

    #[test]
    fn rejects_a_section_with_the_wrong_magic() {
        let mut synth = SyntheticElf::new_64_le();
        let addr = synth.alloc(16);
        synth.write_bytes(addr, b"not-a-buildinfo!");
        synth.add_section(".go.buildinfo", 1, addr, 16);

        let elf = synth.build();
        let section = elf.section_by_name(".go.buildinfo").unwrap();
        let data = elf.section_data(section).unwrap();
        assert!(matches!(BuildInfo::new(&elf, data), Err(Error::BuildInfoInvalid)));
    }
}
