//! The offset map: a pure, version-indexed function selecting the byte offsets of the six
//! `moduledata` fields this crate reads. Adding a new toolchain era means adding a row here, not a
//! new type hierarchy.

use crate::Error;
use crate::symbol::version::Version;

/// This structure holds the six field offsets (already multiplied by `ptr_size`) needed to read
/// `types`, `etypes`, `typelinks` and `itablinks` out of a `moduledata` record.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct ModuleDataOffsets {
    pub types: u64,
    pub etypes: u64,
    pub typelinks_ptr: u64,
    pub typelinks_len: u64,
    pub itablinks_ptr: u64,
    pub itablinks_len: u64,
}

/// This function selects the `moduledata` field offsets for the given toolchain version and
/// pointer size. Every returned offset is strictly monotonically non-decreasing across `types →
/// etypes → typelinks_ptr → typelinks_len → itablinks_ptr → itablinks_len`, by construction of
/// the table below.
///
/// Here is a list with all errors, which can occur while this operation:
/// - [Error::UnsupportedVersion] - `version` predates Go 1.10
pub fn offsets(version: Version, ptr_size: u64) -> Result<ModuleDataOffsets, Error> {
    let indices: [u64; 6] = if version >= Version::new(1, 20) {
        [39, 40, 44, 45, 47, 48]
    } else if version >= Version::new(1, 18) {
        [35, 36, 42, 43, 45, 46]
    } else if version >= Version::new(1, 16) {
        [35, 36, 40, 41, 43, 44]
    } else if version >= Version::new(1, 10) {
        [25, 26, 30, 31, 33, 34]
    } else {
        return Err(Error::UnsupportedVersion);
    };

    Ok(ModuleDataOffsets {
        types: indices[0] * ptr_size,
        etypes: indices[1] * ptr_size,
        typelinks_ptr: indices[2] * ptr_size,
        typelinks_len: indices[3] * ptr_size,
        itablinks_ptr: indices[4] * ptr_size,
        itablinks_len: indices[5] * ptr_size,
    })
}
