//! The `moduledata` locator: scans `.rodata`, `.noptrdata` and `.data` for a pointer-word equal
//! to the `.gopclntab` address, validating every candidate before accepting it. Split from
//! [crate::symbol::module_data], which only ever reads a `moduledata` whose address is already
//! known to be correct.

use crate::Elf;
use crate::symbol::module_data::ModuleData;
use crate::symbol::version::Version;

const SYMBOL_SECTION: &str = ".gopclntab";
const SCAN_SECTIONS: [&str; 3] = [".rodata", ".noptrdata", ".data"];

/// This function validates that `address` is a plausible `moduledata` record pointing back at
/// `pclntab_address`. From Go 1.16 onward this is a single check: the candidate's own `pcHeader`
/// pointer must equal `pclntab_address`. Before 1.16, `moduledata` carries no such back-pointer,
/// so four independent checks stand in for it: the first word at `address` equals
/// `pclntab_address`, the candidate's recorded text-start (`address + 12*ptr_size`) matches the
/// pclntab header's own text-start (`pclntab_address + 8 + ptr_size`), and the candidate's
/// `minpc`/`maxpc` fields fall within the `.text` section's bounds.
pub fn validate_module_data(elf: &Elf, address: u64, pclntab_address: u64, version: Version, ptr_size: u64) -> bool {
    if version >= Version::new(1, 16) {
        let candidate = ModuleData::new(elf, address, version, ptr_size);
        return candidate.pc_header() == Some(pclntab_address);
    }

    let Some(pointer) = read_word(elf, address, ptr_size) else { return false };
    if pointer != pclntab_address {
        return false;
    }

    let Some(candidate_text) = read_word(elf, address + 12 * ptr_size, ptr_size) else { return false };
    let Some(pclntab_text) = read_word(elf, pclntab_address + 8 + ptr_size, ptr_size) else { return false };
    if candidate_text != pclntab_text {
        log::warn!("candidate text addr {candidate_text:#x} does not match pclntab text addr {pclntab_text:#x}");
        return false;
    }

    let Some(text_section) = elf.section_by_name(".text") else { return false };

    let Some(min_pc) = read_word(elf, address + 10 * ptr_size, ptr_size) else { return false };
    let Some(max_pc) = read_word(elf, address + 11 * ptr_size, ptr_size) else { return false };

    min_pc == text_section.address() && max_pc <= text_section.address() + text_section.size()
}

/// This function scans `.rodata`, `.noptrdata` and `.data`, in that order, in `ptr_size` strides,
/// for a pointer-word equal to `pclntab_address`, validating every match with
/// [validate_module_data] and returning the first that passes. No `ET_DYN` base correction is
/// applied; every address compared here is the raw link-time virtual address.
pub fn find_module_data(elf: &Elf, pclntab_address: u64, version: Version, ptr_size: u64) -> Option<u64> {
    for section_name in SCAN_SECTIONS {
        let Some(section) = elf.section_by_name(section_name) else {
            log::warn!("data section not found: {section_name}");
            continue;
        };

        let start = section.address();
        let end = start + section.size();

        let mut current = start;
        while current < end {
            if let Some(value) = read_word(elf, current, ptr_size) {
                if value == pclntab_address {
                    if validate_module_data(elf, current, pclntab_address, version, ptr_size) {
                        return Some(current);
                    }
                    log::warn!("failed to validate moduledata at address {current:#x} against pclntab {pclntab_address:#x}");
                }
            }
            current += ptr_size;
        }
    }

    log::error!("failed to find valid moduledata");
    None
}

/// This function resolves `.gopclntab`'s own address and delegates to [find_module_data]. Callers
/// that already have a `runtime.firstmoduledata` symbol should use its value directly instead of
/// calling this function, since a symbol hit needs no validation.
pub fn locate(elf: &Elf, version: Version, ptr_size: u64) -> Option<u64> {
    let pclntab = elf.section_by_name(SYMBOL_SECTION)?;
    find_module_data(elf, pclntab.address(), version, ptr_size)
}

fn read_word(elf: &Elf, address: u64, ptr_size: u64) -> Option<u64> {
    let buffer = elf.read_virtual_memory(address, ptr_size).ok()?;
    elf.endian().convert(&buffer, ptr_size as usize).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::synthetic::SyntheticElf;

    #[test]
    fn finds_and_validates_moduledata_via_pc_header_from_1_16_onward() {
        let mut synth = SyntheticElf::new_64_le();

        let pclntab_addr = synth.alloc(16);
        synth.write_u32(pclntab_addr, crate::symbol::pc_header::MAGIC_120);

        let module_data_addr = synth.alloc(1024);
        synth.write_u64(module_data_addr, pclntab_addr);

        synth.add_section(".gopclntab", 1, pclntab_addr, 16);
        let noise = synth.alloc(32);
        synth.add_section(".rodata", 1, noise, 32);
        synth.add_section(".noptrdata", 1, module_data_addr, 1024);

        let elf = synth.build();
        let found = find_module_data(&elf, pclntab_addr, Version::new(1, 20), 8);
        assert_eq!(found, Some(module_data_addr));
    }

    #[test]
    fn rejects_a_pointer_match_that_fails_the_legacy_four_point_check() {
        let mut synth = SyntheticElf::new_64_le();

        let text_addr = synth.alloc(64);
        synth.add_section(".text", 1, text_addr, 64);

        let pclntab_addr = synth.alloc(64);
        synth.write_u64(pclntab_addr + 8 + 8, text_addr); // pclntab's own text-start

        let module_data_addr = synth.alloc(1024);
        synth.write_u64(module_data_addr, pclntab_addr);
        synth.write_u64(module_data_addr + 12 * 8, 0xBAD); // mismatched candidate text-start

        synth.add_section(".gopclntab", 1, pclntab_addr, 64);
        synth.add_section(".rodata", 1, module_data_addr, 1024);

        let elf = synth.build();
        let found = find_module_data(&elf, pclntab_addr, Version::new(1, 12), 8);
        assert_eq!(found, None);
    }

    #[test]
    fn accepts_a_legacy_candidate_passing_all_four_checks() {
        let mut synth = SyntheticElf::new_64_le();

        let text_addr = synth.alloc(64);
        synth.add_section(".text", 1, text_addr, 64);

        let pclntab_addr = synth.alloc(64);
        synth.write_u64(pclntab_addr + 8 + 8, text_addr);

        let module_data_addr = synth.alloc(1024);
        synth.write_u64(module_data_addr, pclntab_addr);
        synth.write_u64(module_data_addr + 12 * 8, text_addr);
        synth.write_u64(module_data_addr + 10 * 8, text_addr); // minpc
        synth.write_u64(module_data_addr + 11 * 8, text_addr + 32); // maxpc

        synth.add_section(".gopclntab", 1, pclntab_addr, 64);
        synth.add_section(".rodata", 1, module_data_addr, 1024);

        let elf = synth.build();
        let found = find_module_data(&elf, pclntab_addr, Version::new(1, 12), 8);
        assert_eq!(found, Some(module_data_addr));
    }
}
