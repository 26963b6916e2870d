//! The top-level orchestrator: given a parsed ELF object, lazily determines the Go toolchain
//! version and `moduledata` address, then hands out the build-info, symbol, interface and type
//! table accessors built on top of them.

use std::cell::RefCell;

use crate::Elf;
use crate::header::symtab::SymbolTable;
use crate::symbol::build_info::BuildInfo;
use crate::symbol::interface::InterfaceTable;
use crate::symbol::locator;
use crate::symbol::module_data::ModuleData;
use crate::symbol::pc_header::PcHeader;
use crate::symbol::struct_type::StructTable;
use crate::symbol::version::Version;

const SYMBOL_SECTION: &str = ".gopclntab";
const BUILD_INFO_SECTION: &str = "buildinfo";
const INTERFACE_SECTION: &str = ".itablink";
const TYPELINK_SECTION: &str = ".typelink";

const TYPES_SYMBOL: &str = "runtime.types";
const VERSION_SYMBOL: &str = "runtime.buildVersion";
const MODULE_DATA_SYMBOL: &str = "runtime.firstmoduledata";

const PAGE_SIZE: u64 = 0x1000;

/// The in-memory access strategy requested for [Reader::symbols]. `original_source` distinguishes
/// these at the point where a Go binary's own function symbol table is mapped into the reading
/// process; since this crate already holds the whole ELF image resident (see [crate::Elf]), every
/// variant currently returns the same [SymbolTable] and exists for API parity with that contract.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum AccessMethod {
    FileMapping,
    AnonymousMemory,
    Attached,
}

/// A lazily-computed field that remembers a prior failure. `Missing` is sticky: once a query
/// fails, later calls don't retry it.
#[derive(Clone)]
enum Lazy<T> {
    Unqueried,
    Found(T),
    Missing,
}

impl<T: Clone> Lazy<T> {
    fn get_or_try_init(cell: &RefCell<Self>, query: impl FnOnce() -> Option<T>) -> Option<T> {
        {
            match &*cell.borrow() {
                Lazy::Found(value) => return Some(value.clone()),
                Lazy::Missing => return None,
                Lazy::Unqueried => {}
            }
        }

        let result = query();
        *cell.borrow_mut() = match &result {
            Some(value) => Lazy::Found(value.clone()),
            None => Lazy::Missing,
        };
        result
    }
}

/// The entry point of the metadata discovery engine. Holds a borrowed [Elf] and caches the
/// results of version detection, `moduledata` location and symbol table parsing across calls.
pub struct Reader<'elf> {
    elf: &'elf Elf,
    version: RefCell<Lazy<Version>>,
    module_data_address: RefCell<Lazy<u64>>,
    symbol_table: RefCell<Lazy<SymbolTable>>,
}

impl<'elf> Reader<'elf> {
    pub fn new(elf: &'elf Elf) -> Self {
        Self { elf, version: RefCell::new(Lazy::Unqueried), module_data_address: RefCell::new(Lazy::Unqueried), symbol_table: RefCell::new(Lazy::Unqueried) }
    }

    fn ptr_size(&self) -> u64 {
        self.elf.ptr_size() as u64
    }

    /// This function returns the Go toolchain version, trying build info, then the
    /// `runtime.buildVersion` symbol, then the `.gopclntab` magic, in that order. The result is
    /// memoized; a failed lookup stays failed for the lifetime of this `Reader`.
    pub fn version(&self) -> Option<Version> {
        let result = Lazy::get_or_try_init(&self.version, || self.detect_version());
        if result.is_none() {
            log::error!("failed to determine Go version");
        }
        result
    }

    fn detect_version(&self) -> Option<Version> {
        if let Some(build_info) = self.build_info() {
            if let Some(version) = build_info.version() {
                return Some(version);
            }
        }

        if let Some(text) = self.find_symtab_by_key(VERSION_SYMBOL) {
            if let Some(version) = Version::parse(&text) {
                return Some(version);
            }
        }

        let pclntab = self.elf.section_by_name(SYMBOL_SECTION)?;
        let header = PcHeader::probe(self.elf, pclntab.address(), self.ptr_size())?;
        Some(header.version)
    }

    /// This function validates and decodes the `.go.buildinfo` section, matched by substring
    /// (`original_source` tolerates a prefixed section name) rather than an exact name.
    pub fn build_info(&self) -> Option<BuildInfo<'elf>> {
        let Some(section) = self.elf.section_containing(BUILD_INFO_SECTION) else {
            log::error!("build info section not found");
            return None;
        };
        let data = self.elf.section_data(section).ok()?;

        match BuildInfo::new(self.elf, data) {
            Ok(build_info) => Some(build_info),
            Err(_) => {
                log::error!("invalid build info magic");
                None
            }
        }
    }

    /// This function returns the parsed `SHT_SYMTAB`/`SHT_DYNSYM` symbol table. `method` selects
    /// no distinct behavior today (see [AccessMethod]); `base` is accepted for API parity and is
    /// unused since this table is read straight out of the file, not through virtual memory.
    pub fn symbols(&self, _method: AccessMethod, _base: u64) -> Option<SymbolTable> {
        self.ensure_symbol_table()
    }

    fn ensure_symbol_table(&self) -> Option<SymbolTable> {
        Lazy::get_or_try_init(&self.symbol_table, || self.elf.symbol_table().ok())
    }

    /// This function resolves the virtual address of a symbol by name out of the cached ELF
    /// symbol table.
    pub fn find_symbol_address(&self, key: &str) -> Option<u64> {
        let table = self.ensure_symbol_table()?;
        table.find(key).map(|symbol| symbol.value)
    }

    /// This function resolves a symbol's value as a Go string header (`{data_ptr, length}`, two
    /// pointer-sized words in virtual memory) and decodes the referenced bytes as UTF-8.
    pub fn find_symtab_by_key(&self, key: &str) -> Option<crate::std::string::String> {
        let table = self.ensure_symbol_table()?;
        let address = table.find(key)?.value;

        let ptr_size = self.ptr_size();
        let header = self.elf.read_virtual_memory(address, ptr_size * 2).ok()?;
        let data_ptr = self.elf.endian().convert(&header[..ptr_size as usize], ptr_size as usize).ok()?;
        let length = self.elf.endian().convert(&header[ptr_size as usize..], ptr_size as usize).ok()?;

        let bytes = self.elf.read_virtual_memory(data_ptr, length).ok()?;
        crate::std::string::String::from_utf8(bytes).ok()
    }

    fn ensure_module_data(&self) -> Option<u64> {
        let version = self.version()?;
        Lazy::get_or_try_init(&self.module_data_address, || self.find_module_data(version))
    }

    fn find_module_data(&self, version: Version) -> Option<u64> {
        if let Some(table) = self.ensure_symbol_table() {
            if let Some(symbol) = table.find(MODULE_DATA_SYMBOL) {
                return Some(symbol.value);
            }
        }

        locator::locate(self.elf, version, self.ptr_size())
    }

    /// This function computes the `(section, base_addr)` pair for a virtual-address-relocated
    /// section lookup: `base_addr` is `0` for non-`ET_DYN` objects and `base - min_va` otherwise,
    /// where `min_va` is the lowest page-aligned `PT_LOAD` virtual address.
    fn section_and_base(&self, name: &str, base: u64) -> Option<(&'elf crate::header::Section, u64)> {
        let section = self.elf.section_by_name(name)?;

        let base_addr = if self.elf.is_dynamic() {
            let min_va = self.elf.min_load_address().unwrap_or(0) & !(PAGE_SIZE - 1);
            base.wrapping_sub(min_va)
        } else {
            0
        };

        Some((section, base_addr))
    }

    /// This function returns the interface (`itab`) table, preferring the direct
    /// `.itablink`-section path (when a `runtime.types` symbol resolves) and falling back to the
    /// `moduledata`-derived `itablinks` slice otherwise.
    pub fn interfaces(&self, base: u64) -> Option<InterfaceTable<'elf>> {
        log::debug!("start to get interfaces");
        let Some(version) = self.version() else {
            log::error!("initialization failed: no version");
            return None;
        };
        let ptr_size = self.ptr_size();

        if let Some(types_addr) = self.find_symbol_address(TYPES_SYMBOL) {
            if let Some((section, relocation)) = self.section_and_base(INTERFACE_SECTION, base) {
                let count = section.size() / ptr_size;
                return Some(InterfaceTable::new(self.elf, section.address(), count, relocation, types_addr, ptr_size, version));
            }
        }

        let Some(module_data_addr) = self.ensure_module_data() else {
            log::error!("initialization failed or moduledata not found");
            return None;
        };
        let module_data = ModuleData::new(self.elf, module_data_addr, version, ptr_size);
        let (Some(types_base), Some((base_addr, count))) = (module_data.types(), module_data.itab_links()) else {
            log::error!("failed to get types or itablinks from moduledata");
            return None;
        };

        Some(InterfaceTable::new(self.elf, base_addr, count, 0, types_base, ptr_size, version))
    }

    /// This function returns the type (`rtype`) table, mirroring [Reader::interfaces]'s
    /// direct-section-then-moduledata fallback strategy.
    pub fn type_links(&self, base: u64) -> Option<StructTable<'elf>> {
        log::debug!("start to get typeLinks");
        let Some(version) = self.version() else {
            log::error!("initialization failed: no version");
            return None;
        };
        let ptr_size = self.ptr_size();

        if let Some(types_addr) = self.find_symbol_address(TYPES_SYMBOL) {
            if let Some((section, relocation)) = self.section_and_base(TYPELINK_SECTION, base) {
                let count = section.size() / 4;
                return Some(StructTable::new(self.elf, section.address(), count, types_addr, ptr_size, version));
            }
        }

        let Some(module_data_addr) = self.ensure_module_data() else {
            log::error!("initialization failed or moduledata not found");
            return None;
        };
        let module_data = ModuleData::new(self.elf, module_data_addr, version, ptr_size);
        let (Some(types_base), Some((base_addr, count))) = (module_data.types(), module_data.type_links()) else {
            log::error!("failed to get types or typelinks from moduledata");
            return None;
        };

        Some(StructTable::new(self.elf, base_addr, count, types_base, ptr_size, version))
    }
}
