//! The toolchain version model: a total-ordered `(major, minor)` pair used as the dispatch key
//! for every version-dependent layout decision in this module.

use std::fmt;

/// This structure represents a Go toolchain version as its major and minor release numbers. Patch
/// versions and pre-release suffixes are parsed but discarded, since no layout decision in this
/// crate depends on anything finer than minor.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    /// This field contains the constructor shorthand used throughout the offset tables.
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// This function parses a version string of the shape `"go1.20.3"` or `"go1.20"`, extracting
    /// the first two dotted integers following the `go` prefix. Returns `None` if the string does
    /// not start with `go` or the major component cannot be parsed.
    pub fn parse(input: &str) -> Option<Self> {
        let rest = input.strip_prefix("go")?;
        let mut parts = rest.split('.');

        let major = parts.next()?.parse().ok()?;
        let minor = parts
            .next()
            .and_then(|part| {
                let digits: std::string::String =
                    part.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
            .unwrap_or(0);

        Some(Self { major, minor })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "go{}.{}", self.major, self.minor)
    }
}
