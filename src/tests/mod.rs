
use crate::header::ident::{ElfClass, ElfEndian as IdentEndian, ElfOsABI, ElfVersion};
use crate::tests::synthetic::SyntheticElf;

#[test]
fn parses_ident_of_a_minimal_synthetic_binary() {
    let synth = SyntheticElf::new_64_le();
    let elf = synth.build();

    let ident = elf.file_header().ident;
    assert_eq!(ident.abi, ElfOsABI::Unspecified);
    assert_eq!(ident.class, ElfClass::Class64);
    assert_eq!(ident.endian, IdentEndian::Little);
    assert_eq!(ident.version, ElfVersion::Current);
    assert_eq!(ident.abi_version, 0);
}

#[test]
fn resolves_section_names_and_data_through_the_string_table() {
    let mut synth = SyntheticElf::new_64_le();
    let addr = synth.alloc(16);
    synth.write_bytes(addr, b"hello-section-go");
    synth.add_section(".gopclntab", 1, addr, 16);

    let elf = synth.build();
    let section = elf.section_by_name(".gopclntab").expect("section must resolve by name");
    assert_eq!(elf.section_data(section).unwrap(), b"hello-section-go");
}

#[test]
fn translates_virtual_addresses_through_the_load_segment() {
    let mut synth = SyntheticElf::new_64_le();
    let addr = synth.alloc(8);
    synth.write_u64(addr, 0xDEADBEEF);

    let elf = synth.build();
    let bytes = elf.read_virtual_memory(addr, 8).unwrap();
    assert_eq!(elf.endian().convert(&bytes, 8).unwrap(), 0xDEADBEEF);
}

#[test]
fn thirty_two_bit_images_parse_with_the_narrower_class_dependent_fields() {
    let mut synth = SyntheticElf::new_32_le();
    let addr = synth.alloc(4);
    synth.write_u32(addr, 0x1234);

    let elf = synth.build();
    assert_eq!(elf.file_header().ident.class, ElfClass::Class32);
    assert_eq!(elf.ptr_size(), 4);

    let bytes = elf.read_virtual_memory(addr, 4).unwrap();
    assert_eq!(elf.endian().convert(&bytes, 4).unwrap(), 0x1234);
}

/// Seed scenarios, exercised end-to-end through [crate::symbol::Reader] against synthetic images
/// rather than a shipped fixture binary.
mod seed_scenarios {
    use crate::symbol::offsets::offsets;
    use crate::symbol::pc_header::{MAGIC_112, MAGIC_120};
    use crate::symbol::struct_type::Kind;
    use crate::symbol::version::Version;
    use crate::symbol::{Reader, locator};
    use crate::tests::synthetic::SyntheticElf;

    fn write_rtype(synth: &mut SyntheticElf, kind: Kind, name_offset: u32) -> u64 {
        let addr = synth.alloc(80);
        synth.write_u8(addr + 23, kind as u8);
        synth.write_u32(addr + 40, name_offset);
        addr
    }

    fn encode_varint(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
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

    fn write_pointer_free_build_info(synth: &mut SyntheticElf, version_text: &str) -> u64 {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"\xff Go buildinf:");
        bytes.push(8);
        bytes.push(0x2);
        bytes.resize(32, 0);
        bytes.extend_from_slice(&encode_varint(version_text.len() as u64));
        bytes.extend_from_slice(version_text.as_bytes());

        let addr = synth.alloc(bytes.len() as u64);
        synth.write_bytes(addr, &bytes);
        synth.add_section(".go.buildinfo", 1, addr, bytes.len() as u64);
        addr
    }

    /// S1: 64-bit, toolchain 1.20, `runtime.firstmoduledata` symbol present; `type_links()`
    /// surfaces a struct named `runtime.g` with a field named `stack` at offset 0.
    #[test]
    fn s1_64_bit_1_20_end_to_end_version_build_info_and_type_links() {
        let mut synth = SyntheticElf::new_64_le();

        write_pointer_free_build_info(&mut synth, "go1.20.1");

        let pclntab_addr = synth.alloc(16);
        synth.write_u32(pclntab_addr, MAGIC_120);
        synth.add_section(".gopclntab", 1, pclntab_addr, 16);

        let types_base = synth.alloc(0x1000);

        let field_name_addr = synth.write_name_varint("stack");
        let field_type_addr = write_rtype(&mut synth, Kind::Uintptr, 0);
        let fields_array = synth.alloc(3 * 8);
        synth.write_u64(fields_array, field_name_addr);
        synth.write_u64(fields_array + 8, field_type_addr);
        synth.write_u64(fields_array + 16, 0);

        let struct_name_addr = synth.write_name_varint("runtime.g");
        let struct_rtype = write_rtype(&mut synth, Kind::Struct, (struct_name_addr - types_base) as u32);
        synth.write_u64(struct_rtype + 56, fields_array);
        synth.write_u64(struct_rtype + 64, 1);

        let typelinks = synth.alloc(4);
        synth.write_u32(typelinks, (struct_rtype - types_base) as u32);

        let module_data_addr = synth.alloc(512);
        let o = offsets(Version::new(1, 20), 8).unwrap();
        synth.write_u64(module_data_addr + o.types, types_base);
        synth.write_u64(module_data_addr + o.typelinks_ptr, typelinks);
        synth.write_u64(module_data_addr + o.typelinks_ptr + 8, 1);

        synth.add_symtab(&[("runtime.firstmoduledata", module_data_addr, 0)]);

        let elf = synth.build();
        let reader = Reader::new(&elf);

        assert_eq!(reader.version(), Some(Version::new(1, 20)));
        assert_eq!(reader.build_info().unwrap().version(), Some(Version::new(1, 20)));

        let table = reader.type_links(0).unwrap();
        let g = table.iter().find(|s| s.name().as_deref() == Some("runtime.g")).expect("runtime.g must be present");
        assert_eq!(g.field_count(), 1);
        let stack = g.field(0).unwrap();
        assert_eq!(stack.name().as_deref(), Some("stack"));
        assert_eq!(stack.offset(), Some(0));
    }

    /// S2: 32-bit, toolchain 1.16, no symbol table; the scanning locator finds and validates the
    /// single `moduledata` candidate via its `pcHeader` back-pointer.
    #[test]
    fn s2_32_bit_1_16_scanning_path_validates_via_pc_header() {
        let mut synth = SyntheticElf::new_32_le();

        let pclntab_addr = synth.alloc(16);
        synth.write_u32(pclntab_addr, crate::symbol::pc_header::MAGIC_116);
        synth.add_section(".gopclntab", 1, pclntab_addr, 16);

        let module_data_addr = synth.alloc(512);
        synth.write_u32(module_data_addr, pclntab_addr as u32);

        let noise = synth.alloc(32);
        synth.add_section(".rodata", 1, noise, 32);
        synth.add_section(".noptrdata", 1, module_data_addr, 512);

        let elf = synth.build();
        let found = locator::find_module_data(&elf, pclntab_addr, Version::new(1, 16), 4);
        assert_eq!(found, Some(module_data_addr));
    }

    /// S3: stripped 1.12 binary; version falls back to the pclntab magic and the legacy validator
    /// confirms `minpc`/`maxpc` against `.text`'s bounds.
    #[test]
    fn s3_stripped_1_12_falls_back_to_pclntab_magic_and_legacy_validation() {
        let mut synth = SyntheticElf::new_64_le();

        let text_addr = synth.alloc(64);
        synth.add_section(".text", 1, text_addr, 64);

        let pclntab_addr = synth.alloc(64);
        synth.write_u32(pclntab_addr, MAGIC_112);
        synth.write_u64(pclntab_addr + 8 + 8, text_addr);
        synth.add_section(".gopclntab", 1, pclntab_addr, 64);

        let module_data_addr = synth.alloc(1024);
        synth.write_u64(module_data_addr, pclntab_addr);
        synth.write_u64(module_data_addr + 12 * 8, text_addr);
        synth.write_u64(module_data_addr + 10 * 8, text_addr);
        synth.write_u64(module_data_addr + 11 * 8, text_addr + 64);
        synth.add_section(".rodata", 1, module_data_addr, 1024);

        let elf = synth.build();
        let reader = Reader::new(&elf);

        assert_eq!(reader.version(), Some(Version::new(1, 12)));

        let found = locator::locate(&elf, Version::new(1, 12), 8).unwrap();
        assert_eq!(found, module_data_addr);
        assert!(locator::validate_module_data(&elf, found, pclntab_addr, Version::new(1, 12), 8));
    }

    /// S5: a Map whose element is a three-field struct; `field_count()` recurses through the one
    /// wrapper level down to the struct it names.
    #[test]
    fn s5_map_of_struct_recurses_to_three_fields() {
        let mut synth = SyntheticElf::new_64_le();

        let names = ["X", "Y", "Z"];
        let mut field_bytes = Vec::new();
        for name in names {
            let name_addr = synth.write_name_varint(name);
            let field_type = write_rtype(&mut synth, Kind::Int64, 0);
            field_bytes.push((name_addr, field_type));
        }

        let fields_array = synth.alloc(3 * 3 * 8);
        for (i, (name_addr, field_type)) in field_bytes.iter().enumerate() {
            let entry = fields_array + i as u64 * 24;
            synth.write_u64(entry, *name_addr);
            synth.write_u64(entry + 8, *field_type);
            synth.write_u64(entry + 16, i as u64);
        }

        let element_struct = write_rtype(&mut synth, Kind::Struct, 0);
        synth.write_u64(element_struct + 56, fields_array);
        synth.write_u64(element_struct + 64, 3);

        let map_rtype = write_rtype(&mut synth, Kind::Map, 0);
        synth.write_u64(map_rtype + 48, 0);
        synth.write_u64(map_rtype + 56, element_struct);

        let typelinks_addr = synth.alloc(4);
        synth.write_u32(typelinks_addr, 0);

        let elf = synth.build();
        let table = crate::symbol::StructTable::new(&elf, typelinks_addr, 1, map_rtype, 8, Version::new(1, 20));
        let map = table.get(0).expect("single typelinks entry must resolve");

        assert_eq!(map.kind(), Some(Kind::Map));
        assert_eq!(map.field_count(), 3);
        for (i, name) in names.iter().enumerate() {
            let field = map.field(i as u64).unwrap();
            assert_eq!(field.name().as_deref(), Some(*name));
        }
    }
}
