use crate::MemoryImage;
use crate::io::{
    AddressWidth, ParseError, SerializeError, WriteOptions, parse_hex_bytes, push_hex_byte,
};

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;
const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
const RECORD_START_SEGMENT: u8 = 0x03;
const RECORD_EXTENDED_LINEAR: u8 = 0x04;
const RECORD_START_LINEAR: u8 = 0x05;

/// One decoded Intel HEX record, consumed immediately by the parse loop.
enum IhexRecord {
    Data { address: u16, data: Vec<u8> },
    EndOfFile,
    ExtendedSegment(u16),
    StartSegment(u32),
    ExtendedLinear(u16),
    StartLinear(u32),
}

fn unpack_record(line: &str, line_no: usize) -> Result<IhexRecord, ParseError> {
    if !line.starts_with(':') {
        return Err(ParseError::InvalidRecord {
            line: line_no,
            message: "line does not start with ':'".to_string(),
        });
    }

    let hex = &line[1..];
    if hex.len() < 10 {
        return Err(ParseError::InvalidRecord {
            line: line_no,
            message: "record too short".to_string(),
        });
    }

    let bytes = parse_hex_bytes(hex, line_no)?;
    validate_checksum(&bytes, line_no)?;

    let byte_count = bytes[0] as usize;
    if bytes.len() != 5 + byte_count {
        return Err(ParseError::InvalidRecord {
            line: line_no,
            message: format!(
                "byte count mismatch: header says {}, got {}",
                byte_count,
                bytes.len().saturating_sub(5),
            ),
        });
    }

    let address = u16::from_be_bytes([bytes[1], bytes[2]]);
    let record_type = bytes[3];
    let data = &bytes[4..4 + byte_count];

    let expect_len = |len: usize| {
        if byte_count == len {
            Ok(())
        } else {
            Err(ParseError::InvalidRecord {
                line: line_no,
                message: format!("record type {record_type:02X} must have {len} data bytes"),
            })
        }
    };

    Ok(match record_type {
        RECORD_DATA => IhexRecord::Data {
            address,
            data: data.to_vec(),
        },
        RECORD_EOF => IhexRecord::EndOfFile,
        RECORD_EXTENDED_SEGMENT => {
            expect_len(2)?;
            IhexRecord::ExtendedSegment(u16::from_be_bytes([data[0], data[1]]))
        }
        RECORD_START_SEGMENT => {
            expect_len(4)?;
            IhexRecord::StartSegment(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
        }
        RECORD_EXTENDED_LINEAR => {
            expect_len(2)?;
            IhexRecord::ExtendedLinear(u16::from_be_bytes([data[0], data[1]]))
        }
        RECORD_START_LINEAR => {
            expect_len(4)?;
            IhexRecord::StartLinear(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
        }
        _ => {
            return Err(ParseError::UnsupportedRecordType {
                line: line_no,
                record_type: format!("{record_type:02X}"),
            });
        }
    })
}

/// Parse Intel HEX records, merging data into `image`. The most recent
/// extended segment or extended linear record sets the single base added
/// to subsequent 16-bit record addresses; start segment/linear records set
/// the execution start address. The stream must end with a type-01 record.
pub fn parse_ihex(image: &mut MemoryImage, text: &str) -> Result<(), ParseError> {
    let mut base: u64 = 0;
    let mut eof_seen = false;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if eof_seen {
            return Err(ParseError::InvalidRecord {
                line: line_no,
                message: "data after end-of-file record".to_string(),
            });
        }

        match unpack_record(line, line_no)? {
            IhexRecord::Data { address, data } => {
                if !data.is_empty() {
                    let full_address = base + address as u64;
                    image.add(full_address, &data).map_err(|_| {
                        ParseError::AddressOverflow(format!(
                            "{full_address:#X} + {} at line {line_no}",
                            data.len()
                        ))
                    })?;
                }
            }
            IhexRecord::EndOfFile => eof_seen = true,
            IhexRecord::ExtendedSegment(value) => base = (value as u64) << 4,
            IhexRecord::ExtendedLinear(value) => base = (value as u64) << 16,
            IhexRecord::StartSegment(address) | IhexRecord::StartLinear(address) => {
                image.execution_start_address = Some(address as u64);
            }
        }
    }

    if !eof_seen {
        return Err(ParseError::UnexpectedEof);
    }

    Ok(())
}

// Exclusive end-address limits of the three Intel HEX flavors. I16HEX tops
// out at segment base 0xFFFF plus offset 0xFFFF.
const LIMIT_I8HEX: u64 = 0x1_0000;
const LIMIT_I16HEX: u64 = 0xFFFF0 + 0x1_0000;
const LIMIT_I32HEX: u64 = 0x1_0000_0000;

/// Serialize `image` as Intel HEX. Width 32 (the default) emits extended
/// linear records, width 24 extended segment records, width 16 plain
/// I8HEX. A start linear/segment record is appended when the image has an
/// execution start address, followed by the type-01 terminator.
pub fn write_ihex(image: &MemoryImage, options: &WriteOptions) -> Result<String, SerializeError> {
    let record_length = options.record_length_for(image).min(255);
    let eol = options.line_terminator.as_str();

    let (what, limit) = match options.address_width {
        AddressWidth::Width16 => ("I8HEX", LIMIT_I8HEX),
        AddressWidth::Width24 => ("I16HEX", LIMIT_I16HEX),
        AddressWidth::Auto | AddressWidth::Width32 => ("I32HEX", LIMIT_I32HEX),
    };
    let max = image.maximum_address().unwrap_or(0);
    if max > limit {
        return Err(SerializeError::Capacity {
            what,
            address: max - 1,
            limit: limit - 1,
        });
    }

    let mut out = String::new();
    let mut base: u16 = 0;

    for (address, chunk) in image.chunks(record_length) {
        match options.address_width {
            AddressWidth::Width16 => {}
            AddressWidth::Width24 => {
                // Segment base value in 16-byte paragraphs; the last 64 KiB
                // window is reachable only through the maximal base 0xFFFF.
                let upper = address >> 16;
                let value = if upper >= 0x10 {
                    0xFFFF
                } else {
                    (upper << 12) as u16
                };
                if value != base {
                    base = value;
                    push_record(&mut out, RECORD_EXTENDED_SEGMENT, 0, &value.to_be_bytes(), eol);
                }
            }
            AddressWidth::Auto | AddressWidth::Width32 => {
                let upper = (address >> 16) as u16;
                if upper != base {
                    base = upper;
                    push_record(&mut out, RECORD_EXTENDED_LINEAR, 0, &upper.to_be_bytes(), eol);
                }
            }
        }

        let offset = match options.address_width {
            AddressWidth::Width24 => (address - ((base as u64) << 4)) as u16,
            _ => (address & 0xFFFF) as u16,
        };
        push_record(&mut out, RECORD_DATA, offset, chunk, eol);
    }

    if let Some(execution_start_address) = image.execution_start_address {
        // I8HEX has no start record type.
        if options.address_width != AddressWidth::Width16 {
            if execution_start_address > u32::MAX as u64 {
                return Err(SerializeError::Capacity {
                    what: "Intel HEX start address record",
                    address: execution_start_address,
                    limit: u32::MAX as u64,
                });
            }
            let record_type = match options.address_width {
                AddressWidth::Width24 => RECORD_START_SEGMENT,
                _ => RECORD_START_LINEAR,
            };
            let data = (execution_start_address as u32).to_be_bytes();
            push_record(&mut out, record_type, 0, &data, eol);
        }
    }

    push_record(&mut out, RECORD_EOF, 0, &[], eol);

    Ok(out)
}

fn push_record(out: &mut String, record_type: u8, address: u16, data: &[u8], eol: &str) {
    let addr_bytes = address.to_be_bytes();

    let mut checksum = (data.len() as u8)
        .wrapping_add(addr_bytes[0])
        .wrapping_add(addr_bytes[1])
        .wrapping_add(record_type);
    for &b in data {
        checksum = checksum.wrapping_add(b);
    }
    checksum = (!checksum).wrapping_add(1);

    out.push(':');
    push_hex_byte(out, data.len() as u8);
    push_hex_byte(out, addr_bytes[0]);
    push_hex_byte(out, addr_bytes[1]);
    push_hex_byte(out, record_type);
    for &b in data {
        push_hex_byte(out, b);
    }
    push_hex_byte(out, checksum);
    out.push_str(eol);
}

fn validate_checksum(bytes: &[u8], line_no: usize) -> Result<(), ParseError> {
    let sum: u8 = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        let expected = (!bytes[..bytes.len() - 1]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b)))
        .wrapping_add(1);
        return Err(ParseError::ChecksumMismatch {
            line: line_no,
            expected,
            actual: *bytes.last().unwrap(),
        });
    }
    Ok(())
}
