//! The Go runtime metadata discovery engine: given a parsed ELF object, determines the toolchain
//! version that built it and walks its `moduledata` to expose the interface (`itab`) table and the
//! type (struct) table. Everything here operates purely on virtual addresses resolved through
//! [crate::Elf]; no module in this tree opens a file or owns bytes of its own.

pub mod build_info;
pub mod interface;
pub mod locator;
pub mod module_data;
pub mod name;
pub mod offsets;
pub mod pc_header;
pub mod reader;
pub mod struct_type;
pub mod varint;
pub mod version;

pub use build_info::{BuildInfo, Module, ModuleInfo};
pub use interface::{Interface, InterfaceTable};
pub use module_data::{ModuleData, ModuleRange};
pub use offsets::ModuleDataOffsets;
pub use pc_header::PcHeader;
pub use reader::Reader;
pub use struct_type::{Kind, KindFlags, Struct, StructTable};
pub use version::Version;
