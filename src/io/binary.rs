use crate::MemoryImage;
use crate::io::{ParseError, SerializeError};

/// Options for [`write_binary`].
#[derive(Debug, Clone, Copy)]
pub struct BinaryWriteOptions {
    /// Address the output starts at. `None` starts at the image minimum.
    pub start: Option<u64>,
    /// Byte written into gaps between segments.
    pub padding: u8,
}

impl Default for BinaryWriteOptions {
    fn default() -> Self {
        BinaryWriteOptions {
            start: None,
            padding: 0xFF,
        }
    }
}

/// Load a raw byte stream into `image` at `base`.
pub fn parse_binary(image: &mut MemoryImage, data: &[u8], base: u64) -> Result<(), ParseError> {
    if data.is_empty() {
        return Ok(());
    }
    image.add(base, data).map_err(|_| {
        ParseError::AddressOverflow(format!("{base:#X} + {}", data.len()))
    })
}

/// Flatten `image` into one contiguous byte vector, padding the gaps. The
/// output covers `options.start` (or the image minimum) up to the image
/// maximum.
pub fn write_binary(
    image: &MemoryImage,
    options: &BinaryWriteOptions,
) -> Result<Vec<u8>, SerializeError> {
    let Some(minimum) = image.minimum_address() else {
        return Ok(Vec::new());
    };

    let start = match options.start {
        Some(start) if start > minimum => {
            return Err(SerializeError::StartAboveMinimum { start, minimum });
        }
        Some(start) => start,
        None => minimum,
    };

    let maximum = image.maximum_address().unwrap_or(start);
    let mut out = Vec::with_capacity((maximum - start) as usize);
    let mut position = start;

    for segment in image.segments() {
        out.resize(out.len() + (segment.start_address - position) as usize, options.padding);
        out.extend_from_slice(&segment.data);
        position = segment.end_address();
    }

    Ok(out)
}
