use crate::MemoryImage;
use crate::io::{ParseError, SerializeError, WriteOptions, hex_digit, push_hex_byte};

// TI-TXT is byte-oriented with a fixed 16-byte data line.
const BYTES_PER_LINE: usize = 16;

fn bad(line: usize, message: &str) -> ParseError {
    ParseError::InvalidRecord {
        line,
        message: message.to_string(),
    }
}

/// Parse TI-TXT sections (`@AAAA` followed by hex byte lines) into
/// `image`. The stream must end with a line containing only `q`.
pub fn parse_ti_txt(image: &mut MemoryImage, text: &str) -> Result<(), ParseError> {
    let mut address: Option<u64> = None;
    let mut terminated = false;
    let mut line_no = 0;

    for (idx, raw_line) in text.lines().enumerate() {
        line_no = idx + 1;
        let line = raw_line.trim_end_matches('\r');

        if terminated {
            return Err(bad(line_no, "bad file terminator"));
        }

        if let Some(addr_str) = line.strip_prefix('@') {
            let addr_str = addr_str.trim();
            let section = u64::from_str_radix(addr_str, 16)
                .map_err(|_| bad(line_no, "bad section address"))?;
            address = Some(section);
            continue;
        }

        if line.trim() == "q" {
            terminated = true;
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > BYTES_PER_LINE {
            return Err(bad(line_no, "bad line length"));
        }

        let current = address.ok_or_else(|| bad(line_no, "missing section address"))?;

        let mut bytes = Vec::with_capacity(tokens.len());
        for token in tokens {
            let digits = token.as_bytes();
            if digits.len() != 2 {
                return Err(bad(line_no, "bad data"));
            }
            let high = hex_digit(digits[0], line_no).map_err(|_| bad(line_no, "bad data"))?;
            let low = hex_digit(digits[1], line_no).map_err(|_| bad(line_no, "bad data"))?;
            bytes.push((high << 4) | low);
        }

        image.add(current, &bytes).map_err(|_| {
            ParseError::AddressOverflow(format!("{current:#X} + {} at line {line_no}", bytes.len()))
        })?;
        address = Some(current + bytes.len() as u64);
    }

    if !terminated {
        return Err(bad(line_no, "missing file terminator"));
    }

    Ok(())
}

/// Serialize `image` as TI-TXT: one `@AAAA` line per segment, 16 uppercase
/// hex bytes per data line, and a final `q` line.
pub fn write_ti_txt(image: &MemoryImage, options: &WriteOptions) -> Result<String, SerializeError> {
    let eol = options.line_terminator.as_str();
    let mut out = String::new();

    for segment in image.segments() {
        out.push_str(&format!("@{:04X}{eol}", segment.start_address));
        for line in segment.data.chunks(BYTES_PER_LINE) {
            for (i, &byte) in line.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                push_hex_byte(&mut out, byte);
            }
            out.push_str(eol);
        }
    }

    out.push('q');
    out.push_str(eol);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let mut image = MemoryImage::new();
        parse_ti_txt(&mut image, "@F000\n01 02 03\n@F100\nAA BB\nq\n").unwrap();
        assert_eq!(image.slice(0xF000, 0xF003, None).unwrap(), b"\x01\x02\x03");
        assert_eq!(image.slice(0xF100, 0xF102, None).unwrap(), b"\xAA\xBB");
    }

    #[test]
    fn test_parse_continuation_lines() {
        let mut image = MemoryImage::new();
        parse_ti_txt(&mut image, "@0010\n01 02\n03 04\nq\n").unwrap();
        assert_eq!(
            image.slice(0x10, 0x14, None).unwrap(),
            b"\x01\x02\x03\x04"
        );
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("@XYZ\nq\n", "bad section address"),
            ("01 02\nq\n", "missing section address"),
            ("@0000\n0G\nq\n", "bad data"),
            ("@0000\n012\nq\n", "bad data"),
            ("@0000\n\nq\n", "bad line length"),
            ("@0000\n01\nq\nextra\n", "bad file terminator"),
        ];
        for (input, message) in cases {
            let mut image = MemoryImage::new();
            let err = parse_ti_txt(&mut image, input).unwrap_err();
            match err {
                ParseError::InvalidRecord { message: m, .. } => assert_eq!(m, message),
                other => panic!("unexpected error {other:?} for {input:?}"),
            }
        }
    }

    #[test]
    fn test_parse_line_too_long() {
        let mut image = MemoryImage::new();
        let line = vec!["00"; 17].join(" ");
        let err = parse_ti_txt(&mut image, &format!("@0000\n{line}\nq\n")).unwrap_err();
        assert!(matches!(err, ParseError::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn test_parse_missing_terminator() {
        let mut image = MemoryImage::new();
        let err = parse_ti_txt(&mut image, "@0000\n01 02\n").unwrap_err();
        match err {
            ParseError::InvalidRecord { message, .. } => {
                assert_eq!(message, "missing file terminator");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_write_and_round_trip() {
        let mut image = MemoryImage::new();
        image.add(0xF000, &(0..20).collect::<Vec<u8>>()).unwrap();
        image.add(0xFF00, b"\x01").unwrap();
        let out = write_ti_txt(&image, &WriteOptions::default()).unwrap();
        assert!(out.starts_with("@F000\n"));
        assert!(out.ends_with("q\n"));
        // 16 bytes on the first line, 4 on the second.
        assert_eq!(out.lines().nth(1).unwrap().split(' ').count(), 16);
        assert_eq!(out.lines().nth(2).unwrap().split(' ').count(), 4);

        let mut parsed = MemoryImage::new();
        parse_ti_txt(&mut parsed, &out).unwrap();
        assert_eq!(image, parsed);
    }

    #[test]
    fn test_write_empty() {
        let image = MemoryImage::new();
        assert_eq!(write_ti_txt(&image, &WriteOptions::default()).unwrap(), "q\n");
    }
}
