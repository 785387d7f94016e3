//! Conversion between sparse byte-image formats for embedded firmware:
//! Motorola S-Record, Intel HEX, TI-TXT, Verilog VMEM, raw binary and
//! read-only ELF input.
//!
//! The building blocks are [`SegmentStore`], a sorted set of
//! non-overlapping, maximally coalesced byte runs, and [`MemoryImage`],
//! which pairs a store with the format-level metadata (header, execution
//! start address, word size). Each format exposes a `parse_*` function that
//! merges records into an image and, ELF excepted, a `write_*` function
//! that serializes one.
//!
//! ```
//! use hexcat::{MemoryImage, WriteOptions, parse_ihex, write_srec};
//!
//! let mut image = MemoryImage::new();
//! parse_ihex(&mut image, ":0100000042BD\n:00000001FF\n").unwrap();
//! let srec = write_srec(&image, &WriteOptions::default()).unwrap();
//! assert_eq!(srec, "S3060000000042B7\nS5030001FB\n");
//! ```

use std::path::Path;

mod error;
mod image;
pub mod io;
mod segment;
mod store;

pub use error::Error;
pub use image::{DEFAULT_FILL_PATTERN, DEFAULT_RECORD_LENGTH, FillOptions, MemoryImage};
pub use io::{
    AddressWidth, BinaryWriteOptions, Format, LineTerminator, ParseError, SerializeError,
    WriteOptions, parse_binary, parse_elf, parse_ihex, parse_srec, parse_ti_txt, parse_vmem,
    write_binary, write_ihex, write_srec, write_ti_txt, write_vmem,
};
pub use segment::Segment;
pub use store::{InsertPolicy, SegmentStore, StoreError};

/// Read and parse `path`. The format is detected from the file extension
/// when `format` is `None`.
pub fn load_file(
    path: impl AsRef<Path>,
    format: Option<Format>,
) -> Result<(MemoryImage, Format), Error> {
    let path = path.as_ref();
    let input = std::fs::read(path)?;
    let format = format.unwrap_or_else(|| Format::from_path(path));
    let mut image = MemoryImage::new();
    format.parse(&mut image, &input)?;
    Ok((image, format))
}

/// Serialize `image` and write it to `path`. The format is detected from
/// the file extension when `format` is `None`.
pub fn save_file(
    path: impl AsRef<Path>,
    image: &MemoryImage,
    format: Option<Format>,
    options: &WriteOptions,
) -> Result<(), Error> {
    let path = path.as_ref();
    let format = format.unwrap_or_else(|| Format::from_path(path));
    let bytes = format.serialize(image, options)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
