//! Text format of the table resources.
//!
//! A resource holds one table as whitespace separated hex tokens. Every byte
//! is two hex digits and multi-byte elements are stored little-endian, so the
//! `u32` value `0x12345678` is written as `78563412`. A token may hold any
//! whole number of bytes, which keeps byte-per-token files readable. `//`
//! starts a comment running to the end of the line.
//!
//! ```text
//! // hex_u16_exp.mem [256 x 2 bytes]
//!
//! 0000 0300 0600 0800 0b00 0e00 1100 1400
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use num_traits::{NumCast, PrimInt, ToBytes};

use crate::error::ConfigError;

const BYTES_PER_LINE: usize = 16;

/// Integer types a table can be made of.
pub trait TableElement: PrimInt + ToBytes {}

impl<T: PrimInt + ToBytes> TableElement for T {}

/// Fills `out` from resource text. The text must hold exactly
/// `out.len()` elements.
pub fn parse<T: TableElement>(name: &str, text: &str, out: &mut [T]) -> Result<(), ConfigError> {
    let width = core::mem::size_of::<T>();
    let capacity = out.len() * width;
    let mut count = 0;

    for line in text.lines() {
        let data = line.split("//").next().unwrap_or_default();

        for token in data.split_whitespace() {
            if token.len() % 2 != 0 {
                return Err(malformed(
                    name,
                    format!("token '{token}' has an odd number of digits"),
                ));
            }

            for pair in token.as_bytes().chunks(2) {
                let byte = match (hex_digit(pair[0]), hex_digit(pair[1])) {
                    (Some(high), Some(low)) => (high << 4) | low,
                    _ => {
                        return Err(malformed(name, format!("token '{token}' is not hex")));
                    }
                };

                if count == capacity {
                    return Err(malformed(
                        name,
                        format!("more than {} elements", out.len()),
                    ));
                }

                let shift = (count % width) * 8;
                let byte = <T as NumCast>::from(byte)
                    .ok_or_else(|| malformed(name, "unsupported element type".into()))?;
                let element = &mut out[count / width];
                *element = if shift == 0 {
                    byte
                } else {
                    *element | (byte << shift)
                };

                count += 1;
            }
        }
    }

    if count != capacity {
        return Err(malformed(
            name,
            format!(
                "expected {} elements of {width} bytes, found {count} bytes",
                out.len()
            ),
        ));
    }

    Ok(())
}

/// Formats a table as resource text, headed by a comment naming the table
/// and its dimensions.
pub fn format<T: TableElement>(name: &str, data: &[T]) -> String {
    let width = core::mem::size_of::<T>();
    let words_per_line = (BYTES_PER_LINE / width).max(1);

    let mut text = String::new();
    let _ = writeln!(text, "// {name} [{} x {width} bytes]", data.len());
    text.push('\n');

    for line in data.chunks(words_per_line) {
        for (i, word) in line.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            for byte in word.to_le_bytes().as_ref() {
                let _ = write!(text, "{byte:02x}");
            }
        }
        text.push('\n');
    }

    text
}

/// Reads a resource file into `out`.
pub fn read_file<T: TableElement>(path: impl AsRef<Path>, out: &mut [T]) -> Result<(), ConfigError> {
    let path = path.as_ref();

    let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadTable {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&file_name(path), &text, out)
}

/// Writes `data` as a resource file, replacing any existing file.
pub fn write_file<T: TableElement>(path: impl AsRef<Path>, data: &[T]) -> Result<(), ConfigError> {
    let path = path.as_ref();

    fs::write(path, format(&file_name(path), data)).map_err(|source| ConfigError::WriteTable {
        path: path.to_path_buf(),
        source,
    })
}

#[inline]
fn hex_digit(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn malformed(name: &str, reason: String) -> ConfigError {
    ConfigError::MalformedTable {
        name: name.into(),
        reason,
    }
}
