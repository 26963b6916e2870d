use crate::header::ident::ElfEndian;
use crate::Error;

impl ElfEndian {
    #[inline]
    pub fn read<T: EndianReader>(&self, slice: &[u8], offset: Option<&mut usize>) -> Option<T> {
        T::read_with_endian(slice, *self, offset)
    }

    /// This function reads an unsigned integer of the specified width (1, 2, 4 or 8 bytes) from
    /// the start of the given slice, honoring this endianness. Every multi-byte integer read in
    /// the metadata discovery engine goes through this function rather than an ad-hoc cast, so a
    /// single site governs byte order.
    ///
    /// Here is a list with all errors, which can occur while this operation:
    /// - [Error::InvalidSize] - `size` is not one of 1, 2, 4 or 8
    /// - [Error::Truncated] - `slice` is shorter than `size`
    pub fn convert(&self, slice: &[u8], size: usize) -> Result<u64, Error> {
        let bytes = slice.get(..size).ok_or(Error::Truncated)?;

        Ok(match size {
            1 => bytes[0] as u64,
            2 => self.read::<u16>(bytes, None).ok_or(Error::Truncated)? as u64,
            4 => self.read::<u32>(bytes, None).ok_or(Error::Truncated)? as u64,
            8 => self.read::<u64>(bytes, None).ok_or(Error::Truncated)?,
            _ => return Err(Error::InvalidSize),
        })
    }
}

pub trait EndianReader {
    fn read_with_endian(slice: &[u8], endian: ElfEndian, offset: Option<&mut usize>) -> Option<Self> where Self: Sized;
}

macro_rules! impl_endian_reader {
    ($ty: ty) => {
        impl EndianReader for $ty {
            fn read_with_endian(slice: &[u8], endian: ElfEndian, offset: Option<&mut usize>) -> Option<Self> {
                const SELF_SIZE: usize = crate::std::mem::size_of::<$ty>();

                let offset_usize = offset.as_ref().map(|value| **value).unwrap_or(0);
                let slice = slice.get(offset_usize..(offset_usize + SELF_SIZE))?;
                if let Some(offset) = offset {
                    *offset += SELF_SIZE;
                }

                match endian {
                    ElfEndian::Big => Some(Self::from_be_bytes(slice.try_into().ok()?)),
                    ElfEndian::Little => Some(Self::from_le_bytes(slice.try_into().ok()?)),
                    _ => None
                }
            }
        }
    }
}

impl_endian_reader!(u16);
impl_endian_reader!(u32);
impl_endian_reader!(u64);

#[cfg(test)]
mod tests {
    use super::*;

    fn to_bytes(endian: ElfEndian, value: u64, size: usize) -> crate::std::vec::Vec<u8> {
        let full = match endian {
            ElfEndian::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        };
        match endian {
            ElfEndian::Big => full[8 - size..].to_vec(),
            _ => full[..size].to_vec(),
        }
    }

    #[test]
    fn round_trips_every_supported_width_in_both_endians() {
        for &endian in &[ElfEndian::Little, ElfEndian::Big] {
            for &size in &[1usize, 2, 4, 8] {
                let max = if size == 8 { u64::MAX } else { (1u64 << (size * 8)) - 1 };
                for value in [0u64, 1, max] {
                    let bytes = to_bytes(endian, value, size);
                    assert_eq!(endian.convert(&bytes, size).unwrap(), value);
                }
            }
        }
    }

    #[test]
    fn rejects_unsupported_width() {
        assert!(matches!(ElfEndian::Little.convert(&[0, 0, 0], 3), Err(Error::InvalidSize)));
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(matches!(ElfEndian::Little.convert(&[0, 0], 4), Err(Error::Truncated)));
    }
}
