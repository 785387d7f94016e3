use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    #[error("checksum mismatch at line {line}: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch {
        line: usize,
        expected: u8,
        actual: u8,
    },

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("address overflow: {0}")]
    AddressOverflow(String),

    #[error("invalid hex digit at line {line}: {char}")]
    InvalidHexDigit { line: usize, char: char },

    #[error("unsupported record type '{record_type}' at line {line}")]
    UnsupportedRecordType { line: usize, record_type: String },

    #[error("invalid ELF: {0}")]
    InvalidElf(String),
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("address {address:#X} exceeds the {limit:#X} limit of {what}")]
    Capacity {
        what: &'static str,
        address: u64,
        limit: u64,
    },

    #[error("too many records: {0}")]
    TooManyRecords(u64),

    #[error("address {address:#X} is not aligned to the {word_size}-byte word size")]
    UnalignedWord { address: u64, word_size: usize },

    #[error("start address {start:#X} is above the image minimum {minimum:#X}")]
    StartAboveMinimum { start: u64, minimum: u64 },

    #[error("no serializer for the {0} format")]
    UnsupportedFormat(crate::io::Format),
}
