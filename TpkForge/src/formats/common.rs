//! Helpers shared by the binary formats: fixed-width ASCII strings and alignment

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Read a NUL-padded ASCII string occupying exactly `width` bytes.
///
/// The string ends at the first NUL; bytes after it are ignored.
pub fn read_fixed_string<R: Read>(reader: &mut R, width: usize) -> Result<String> {
    let mut bytes = vec![0u8; width];
    reader.read_exact(&mut bytes)?;
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

/// Write `value` NUL-padded to exactly `width` bytes.
///
/// A value of exactly `width` bytes is written without a terminator.
pub fn write_fixed_string<W: Write>(writer: &mut W, value: &str, width: usize) -> Result<()> {
    check_fixed_string(value, width)?;
    let mut buf = vec![0u8; width];
    buf[..value.len()].copy_from_slice(value.as_bytes());
    writer.write_all(&buf)?;
    Ok(())
}

/// Validate that `value` fits a fixed-width ASCII field.
pub fn check_fixed_string(value: &str, width: usize) -> Result<()> {
    if !value.is_ascii() {
        return Err(Error::NonAsciiName {
            name: value.to_string(),
        });
    }
    if value.len() > width {
        return Err(Error::NameTooLong {
            name: value.to_string(),
            max: width,
        });
    }
    Ok(())
}

/// Round `value` up to the next multiple of `alignment` (a power of two).
#[must_use]
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    let rem = value % alignment;
    if rem == 0 { value } else { value + (alignment - rem) }
}
