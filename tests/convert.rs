//! End-to-end conversion between formats through the library API.

use hexcat::{
    AddressWidth, BinaryWriteOptions, FillOptions, Format, MemoryImage, ParseError, WriteOptions,
    parse_ihex, parse_srec, write_binary, write_srec,
};

const IHEX_INPUT: &str = "\
:20010000214601360121470136007EFE09D219012146017E17C20001FF5F16002148011979\n\
:20012000194E79234623965778239EDA3F01B2CA3F0156702B5E712B722B7321460134219F\n\
:00000001FF\n";

const SREC_OUTPUT: &str = "\
S32500000100214601360121470136007EFE09D219012146017E17C20001FF5F16002148011973\n\
S32500000120194E79234623965778239EDA3F01B2CA3F0156702B5E712B722B73214601342199\n\
S5030002FA\n";

#[test]
fn test_ihex_to_srec() {
    let mut image = MemoryImage::new();
    parse_ihex(&mut image, IHEX_INPUT).unwrap();

    assert_eq!(image.minimum_address(), Some(0x100));
    assert_eq!(image.maximum_address(), Some(0x140));
    assert_eq!(image.len(), 64);

    let srec = write_srec(&image, &WriteOptions::default()).unwrap();
    assert_eq!(srec, SREC_OUTPUT);
}

#[test]
fn test_srec_to_binary() {
    let mut image = MemoryImage::new();
    parse_srec(&mut image, SREC_OUTPUT).unwrap();

    let binary = write_binary(
        &image,
        &BinaryWriteOptions {
            start: Some(0x100),
            padding: 0xFF,
        },
    )
    .unwrap();
    assert_eq!(binary.len(), 64);
    assert_eq!(&binary[..4], b"\x21\x46\x01\x36");
}

#[test]
fn test_round_trip_all_text_formats() {
    let mut image = MemoryImage::new();
    image.add(0x100, &(0..40).collect::<Vec<u8>>()).unwrap();
    image.add(0x1000, b"\xDE\xAD\xBE\xEF").unwrap();

    for format in [Format::Srec, Format::IntelHex, Format::TiTxt, Format::Vmem] {
        let bytes = format.serialize(&image, &WriteOptions::default()).unwrap();
        let mut parsed = MemoryImage::new();
        format.parse(&mut parsed, &bytes).unwrap();

        let original: Vec<_> = image.segments().collect();
        let reconstructed: Vec<_> = parsed.segments().collect();
        assert_eq!(original, reconstructed, "round trip through {format}");
    }
}

#[test]
fn test_round_trip_preserves_execution_start() {
    let mut image = MemoryImage::new();
    image.add(0x100, b"\x01\x02").unwrap();
    image.execution_start_address = Some(0x100);

    for format in [Format::Srec, Format::IntelHex] {
        let bytes = format.serialize(&image, &WriteOptions::default()).unwrap();
        let mut parsed = MemoryImage::new();
        format.parse(&mut parsed, &bytes).unwrap();
        assert_eq!(
            parsed.execution_start_address,
            Some(0x100),
            "through {format}"
        );
    }
}

#[test]
fn test_fill_is_idempotent() {
    let mut image = MemoryImage::new();
    image.add(0, b"\x01").unwrap();
    image.add(0x10, b"\x02").unwrap();
    image.add(0x30, b"\x03").unwrap();

    image.fill(&FillOptions::default());
    let once = image.clone();
    image.fill(&FillOptions::default());
    assert_eq!(image, once);
    assert_eq!(image.segment_count(), 1);
}

#[test]
fn test_checksum_flip_rejected() {
    // Flip one data nibble in each line without fixing the checksum.
    for line in IHEX_INPUT.lines().take(2) {
        let corrupted = format!("{}F{}\n:00000001FF\n", &line[..20], &line[21..]);
        if corrupted.starts_with(line) {
            continue;
        }
        let mut image = MemoryImage::new();
        let err = parse_ihex(&mut image, &corrupted).unwrap_err();
        assert!(matches!(err, ParseError::ChecksumMismatch { line: 1, .. }));
    }

    let mut srec = SREC_OUTPUT.replace("21460136", "21460137");
    srec.truncate(srec.find('\n').unwrap() + 1);
    let mut image = MemoryImage::new();
    let err = parse_srec(&mut image, &srec).unwrap_err();
    assert!(matches!(err, ParseError::ChecksumMismatch { line: 1, .. }));
}

#[test]
fn test_file_helpers_round_trip() {
    let dir = std::env::temp_dir().join(format!("hexcat_files_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("fw.s19");

    let mut image = MemoryImage::new();
    image.add(0x40, b"\x01\x02\x03").unwrap();
    hexcat::save_file(&path, &image, None, &WriteOptions::default()).unwrap();

    let (loaded, format) = hexcat::load_file(&path, None).unwrap();
    assert_eq!(format, Format::Srec);
    assert_eq!(loaded.slice(0x40, 0x43, None).unwrap(), b"\x01\x02\x03");

    let missing = hexcat::load_file(dir.join("nope.s19"), None);
    assert!(matches!(missing, Err(hexcat::Error::Io(_))));
}

#[test]
fn test_explicit_width_capacity_errors() {
    let mut image = MemoryImage::new();
    image.add(0x1_0000_0000, b"\x00").unwrap();

    for width in [AddressWidth::Width16, AddressWidth::Width24, AddressWidth::Width32] {
        let options = WriteOptions {
            address_width: width,
            ..Default::default()
        };
        assert!(write_srec(&image, &options).is_err(), "{width:?}");
    }
}
