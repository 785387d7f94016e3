use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::MemoryImage;

mod binary;
mod elf;
mod error;
mod intel_hex;
mod srec;
mod ti_txt;
mod vmem;

pub use binary::{BinaryWriteOptions, parse_binary, write_binary};
pub use elf::parse_elf;
pub use error::{ParseError, SerializeError};
pub use intel_hex::{parse_ihex, write_ihex};
pub use srec::{parse_srec, write_srec};
pub use ti_txt::{parse_ti_txt, write_ti_txt};
pub use vmem::{parse_vmem, write_vmem};

/// Address field width for record serializers.
///
/// `Auto` picks the narrowest width that covers the image's maximum
/// address; the explicit widths fail with [`SerializeError::Capacity`] when
/// the image does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressWidth {
    Auto,
    Width16,
    Width24,
    #[default]
    Width32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTerminator {
    #[default]
    Lf,
    CrLf,
}

impl LineTerminator {
    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
        }
    }
}

/// Per-call serializer options. Never held as shared state: every
/// serialization entry point takes its options explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Maximum data bytes per record. `None` falls back to the image's
    /// preferred record length.
    pub record_length: Option<usize>,
    pub address_width: AddressWidth,
    pub line_terminator: LineTerminator,
}

impl WriteOptions {
    pub(crate) fn record_length_for(&self, image: &MemoryImage) -> usize {
        self.record_length.unwrap_or(image.record_length()).max(1)
    }
}

/// The closed set of supported formats, selected explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Srec,
    IntelHex,
    TiTxt,
    Vmem,
    Binary,
    Elf,
}

impl Format {
    /// Guess the format from a file extension; unknown extensions are
    /// treated as raw binary.
    pub fn from_path(path: &Path) -> Format {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("s19" | "s28" | "s37" | "srec" | "mot") => Format::Srec,
            Some("hex" | "ihex" | "ihx") => Format::IntelHex,
            Some("txt") => Format::TiTxt,
            Some("vmem" | "mem") => Format::Vmem,
            Some("elf" | "axf") => Format::Elf,
            _ => Format::Binary,
        }
    }

    /// Parse `input` and merge its chunks into `image`.
    pub fn parse(self, image: &mut MemoryImage, input: &[u8]) -> Result<(), ParseError> {
        match self {
            Format::Srec => parse_srec(image, text(input)?),
            Format::IntelHex => parse_ihex(image, text(input)?),
            Format::TiTxt => parse_ti_txt(image, text(input)?),
            Format::Vmem => parse_vmem(image, text(input)?),
            Format::Binary => parse_binary(image, input, 0),
            Format::Elf => parse_elf(image, input),
        }
    }

    /// Serialize `image` in this format. ELF is read-only.
    pub fn serialize(
        self,
        image: &MemoryImage,
        options: &WriteOptions,
    ) -> Result<Vec<u8>, SerializeError> {
        match self {
            Format::Srec => write_srec(image, options).map(String::into_bytes),
            Format::IntelHex => write_ihex(image, options).map(String::into_bytes),
            Format::TiTxt => write_ti_txt(image, options).map(String::into_bytes),
            Format::Vmem => write_vmem(image, options).map(String::into_bytes),
            Format::Binary => Ok(write_binary(image, &BinaryWriteOptions::default())?),
            Format::Elf => Err(SerializeError::UnsupportedFormat(self)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Srec => "srec",
            Format::IntelHex => "ihex",
            Format::TiTxt => "ti_txt",
            Format::Vmem => "vmem",
            Format::Binary => "binary",
            Format::Elf => "elf",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "srec" => Ok(Format::Srec),
            "ihex" => Ok(Format::IntelHex),
            "ti_txt" => Ok(Format::TiTxt),
            "vmem" => Ok(Format::Vmem),
            "binary" => Ok(Format::Binary),
            "elf" => Ok(Format::Elf),
            _ => Err(format!(
                "unknown format '{s}', expected srec, ihex, ti_txt, vmem, binary or elf"
            )),
        }
    }
}

fn text(input: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(input).map_err(|e| ParseError::InvalidRecord {
        line: 1,
        message: format!("invalid UTF-8: {e}"),
    })
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

pub(crate) fn push_hex_byte(out: &mut String, byte: u8) {
    out.push(HEX_CHARS[(byte >> 4) as usize] as char);
    out.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
}

pub(crate) fn hex_digit(b: u8, line: usize) -> Result<u8, ParseError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        _ => Err(ParseError::InvalidHexDigit {
            line,
            char: b as char,
        }),
    }
}

/// Decode an even run of hex digits into bytes.
pub(crate) fn parse_hex_bytes(hex: &str, line: usize) -> Result<Vec<u8>, ParseError> {
    let bytes = hex.as_bytes();
    if !bytes.len().is_multiple_of(2) {
        return Err(ParseError::InvalidRecord {
            line,
            message: "odd number of hex digits".to_string(),
        });
    }

    let mut out = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let high = hex_digit(pair[0], line)?;
        let low = hex_digit(pair[1], line)?;
        out.push((high << 4) | low);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("fw.s19")), Format::Srec);
        assert_eq!(Format::from_path(Path::new("fw.MOT")), Format::Srec);
        assert_eq!(Format::from_path(Path::new("fw.hex")), Format::IntelHex);
        assert_eq!(Format::from_path(Path::new("fw.txt")), Format::TiTxt);
        assert_eq!(Format::from_path(Path::new("fw.vmem")), Format::Vmem);
        assert_eq!(Format::from_path(Path::new("fw.elf")), Format::Elf);
        assert_eq!(Format::from_path(Path::new("fw.bin")), Format::Binary);
        assert_eq!(Format::from_path(Path::new("fw")), Format::Binary);
    }

    #[test]
    fn test_format_round_trips_through_str() {
        for format in [
            Format::Srec,
            Format::IntelHex,
            Format::TiTxt,
            Format::Vmem,
            Format::Binary,
            Format::Elf,
        ] {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
        }
        assert!("coff".parse::<Format>().is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("00ff10", 1).unwrap(), vec![0x00, 0xFF, 0x10]);
        assert!(matches!(
            parse_hex_bytes("0f0", 1),
            Err(ParseError::InvalidRecord { .. })
        ));
        assert!(matches!(
            parse_hex_bytes("0g", 7),
            Err(ParseError::InvalidHexDigit { line: 7, char: 'g' })
        ));
    }
}
