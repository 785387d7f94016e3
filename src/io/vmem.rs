use crate::MemoryImage;
use crate::io::{ParseError, SerializeError, WriteOptions, hex_digit, push_hex_byte};

/// Parse a Verilog VMEM (`$readmemh`) stream into `image`. `@HEX` tokens
/// set the current word address; every other token is one word of exactly
/// `2 * word_size` hex digits stored at consecutive word addresses,
/// starting at zero when no section address has been seen.
pub fn parse_vmem(image: &mut MemoryImage, text: &str) -> Result<(), ParseError> {
    let word_size = image.word_size();
    let mut word_address: u64 = 0;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        for token in line.split_whitespace() {
            if let Some(addr_str) = token.strip_prefix('@') {
                word_address = u64::from_str_radix(addr_str, 16).map_err(|_| {
                    ParseError::InvalidRecord {
                        line: line_no,
                        message: "bad section address".to_string(),
                    }
                })?;
                continue;
            }

            let digits = token.as_bytes();
            if digits.len() != 2 * word_size {
                return Err(ParseError::InvalidRecord {
                    line: line_no,
                    message: format!(
                        "bad word '{token}': expected {} hex digits",
                        2 * word_size
                    ),
                });
            }

            let mut word = Vec::with_capacity(word_size);
            for pair in digits.chunks_exact(2) {
                let high = hex_digit(pair[0], line_no)?;
                let low = hex_digit(pair[1], line_no)?;
                word.push((high << 4) | low);
            }

            let address = word_address
                .checked_mul(word_size as u64)
                .ok_or_else(|| ParseError::AddressOverflow(format!("@{word_address:X} words")))?;
            image.add(address, &word).map_err(|_| {
                ParseError::AddressOverflow(format!("{address:#X} + {word_size} at line {line_no}"))
            })?;
            word_address += 1;
        }
    }

    Ok(())
}

/// Serialize `image` as Verilog VMEM: one `@` word-address line per
/// segment, then uppercase words of `word_size` bytes, 16 bytes worth per
/// line. Segments must start and end on word boundaries.
pub fn write_vmem(image: &MemoryImage, options: &WriteOptions) -> Result<String, SerializeError> {
    let word_size = image.word_size();
    let words_per_line = (16 / word_size).max(1);
    let eol = options.line_terminator.as_str();
    let mut out = String::new();

    for segment in image.segments() {
        if !(segment.start_address as usize).is_multiple_of(word_size)
            || !segment.len().is_multiple_of(word_size)
        {
            return Err(SerializeError::UnalignedWord {
                address: segment.start_address,
                word_size,
            });
        }

        out.push_str(&format!(
            "@{:08X}{eol}",
            segment.start_address / word_size as u64
        ));

        for line in segment.data.chunks(words_per_line * word_size) {
            for (i, word) in line.chunks(word_size).enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                for &byte in word {
                    push_hex_byte(&mut out, byte);
                }
            }
            out.push_str(eol);
        }
    }

    Ok(out)
}
