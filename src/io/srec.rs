use crate::MemoryImage;
use crate::io::{
    AddressWidth, ParseError, SerializeError, WriteOptions, parse_hex_bytes, push_hex_byte,
};

/// One decoded S-Record, consumed immediately by the parse loop.
enum SrecRecord {
    Header(Vec<u8>),
    Data { address: u64, data: Vec<u8> },
    Count(u64),
    Termination { address: u64 },
}

fn address_length(record_type: char) -> Option<usize> {
    match record_type {
        '0' | '1' | '5' | '9' => Some(2),
        '2' | '6' | '8' => Some(3),
        '3' | '7' => Some(4),
        _ => None,
    }
}

fn unpack_record(line: &str, line_no: usize) -> Result<SrecRecord, ParseError> {
    let bytes = line.as_bytes();
    if bytes.len() < 2 || (bytes[0] != b'S' && bytes[0] != b's') {
        return Err(ParseError::InvalidRecord {
            line: line_no,
            message: "missing S-record prefix".to_string(),
        });
    }
    if bytes.len() < 4 {
        return Err(ParseError::InvalidRecord {
            line: line_no,
            message: "record too short".to_string(),
        });
    }

    let record_type = bytes[1] as char;
    let addr_len = address_length(record_type).ok_or_else(|| ParseError::UnsupportedRecordType {
        line: line_no,
        record_type: format!("S{record_type}"),
    })?;

    let record_bytes = parse_hex_bytes(&line[2..], line_no)?;
    let count = record_bytes[0] as usize;
    if record_bytes.len() != count + 1 {
        return Err(ParseError::InvalidRecord {
            line: line_no,
            message: format!(
                "byte count mismatch: expected {}, got {}",
                count + 1,
                record_bytes.len()
            ),
        });
    }

    if !checksum_valid(&record_bytes) {
        return Err(ParseError::ChecksumMismatch {
            line: line_no,
            expected: expected_checksum(&record_bytes[..record_bytes.len() - 1]),
            actual: *record_bytes.last().unwrap_or(&0),
        });
    }

    let data_len = count
        .checked_sub(addr_len + 1)
        .ok_or(ParseError::InvalidRecord {
            line: line_no,
            message: "record length too short".to_string(),
        })?;

    let address = record_bytes[1..1 + addr_len]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64);
    let data = record_bytes[1 + addr_len..1 + addr_len + data_len].to_vec();

    Ok(match record_type {
        '0' => SrecRecord::Header(data),
        '1' | '2' | '3' => SrecRecord::Data { address, data },
        '5' | '6' => SrecRecord::Count(address),
        _ => SrecRecord::Termination { address },
    })
}

/// Parse Motorola S-Records, merging data into `image`. The S0 header and
/// the S7/S8/S9 address land in the image metadata; S5/S6 count records are
/// validated for framing and otherwise ignored.
pub fn parse_srec(image: &mut MemoryImage, text: &str) -> Result<(), ParseError> {
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        match unpack_record(line, line_no)? {
            SrecRecord::Header(header) => image.header = Some(header),
            SrecRecord::Data { address, data } => {
                if !data.is_empty() {
                    image.add(address, &data).map_err(|_| {
                        ParseError::AddressOverflow(format!(
                            "{address:#X} + {} at line {line_no}",
                            data.len()
                        ))
                    })?;
                }
            }
            SrecRecord::Count(_) => {}
            SrecRecord::Termination { address } => {
                image.execution_start_address = Some(address);
            }
        }
    }

    Ok(())
}

/// Serialize `image` as Motorola S-Records: S0 when a header is set, data
/// records of the width-selected type, an S5/S6 count record, and a
/// matching termination record iff an execution start address is set.
pub fn write_srec(image: &MemoryImage, options: &WriteOptions) -> Result<String, SerializeError> {
    let top = image.maximum_address().unwrap_or(1) - 1;

    let (digit, addr_len) = match options.address_width {
        AddressWidth::Auto => {
            if top <= 0xFFFF {
                ('1', 2)
            } else if top <= 0xFF_FFFF {
                ('2', 3)
            } else {
                ('3', 4)
            }
        }
        AddressWidth::Width16 => ('1', 2),
        AddressWidth::Width24 => ('2', 3),
        AddressWidth::Width32 => ('3', 4),
    };

    let limit = (1u64 << (8 * addr_len)) - 1;
    if top > limit {
        return Err(SerializeError::Capacity {
            what: "S-record data records",
            address: top,
            limit,
        });
    }

    // The record length byte must also cover the address and checksum.
    let record_length = options.record_length_for(image).min(254 - addr_len);
    let eol = options.line_terminator.as_str();

    let mut out = String::new();

    if let Some(header) = &image.header {
        push_record(&mut out, '0', 2, 0, header, eol);
    }

    let mut record_count: u64 = 0;
    for (address, chunk) in image.chunks(record_length) {
        push_record(&mut out, digit, addr_len, address, chunk, eol);
        record_count += 1;
    }

    if record_count <= 0xFFFF {
        push_record(&mut out, '5', 2, record_count, &[], eol);
    } else if record_count <= 0xFF_FFFF {
        push_record(&mut out, '6', 3, record_count, &[], eol);
    } else {
        return Err(SerializeError::TooManyRecords(record_count));
    }

    if let Some(execution_start_address) = image.execution_start_address {
        if execution_start_address > limit {
            return Err(SerializeError::Capacity {
                what: "S-record termination record",
                address: execution_start_address,
                limit,
            });
        }
        let term = match digit {
            '1' => '9',
            '2' => '8',
            _ => '7',
        };
        push_record(&mut out, term, addr_len, execution_start_address, &[], eol);
    }

    Ok(out)
}

fn push_record(
    out: &mut String,
    digit: char,
    addr_len: usize,
    address: u64,
    data: &[u8],
    eol: &str,
) {
    let addr_bytes = address.to_be_bytes();
    let mut record = Vec::with_capacity(1 + addr_len + data.len());
    record.push((addr_len + data.len() + 1) as u8);
    record.extend_from_slice(&addr_bytes[8 - addr_len..]);
    record.extend_from_slice(data);

    out.push('S');
    out.push(digit);
    for &byte in &record {
        push_hex_byte(out, byte);
    }
    push_hex_byte(out, expected_checksum(&record));
    out.push_str(eol);
}

fn checksum_valid(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0xFF
}

/// One's complement of the low byte of the sum over length, address and
/// data bytes.
fn expected_checksum(bytes: &[u8]) -> u8 {
    0xFFu8.wrapping_sub(bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)))
}
