use elf::ElfBytes;
use elf::abi::PT_LOAD;
use elf::endian::AnyEndian;

use crate::MemoryImage;
use crate::io::ParseError;

/// Load the `PT_LOAD` segments of an ELF executable into `image`, placed at
/// their physical addresses. Bytes past the file image (`p_memsz` beyond
/// `p_filesz`, typically `.bss`) are loaded as zeroes, and the entry point
/// becomes the image's execution start address.
pub fn parse_elf(image: &mut MemoryImage, input: &[u8]) -> Result<(), ParseError> {
    let file = ElfBytes::<AnyEndian>::minimal_parse(input)
        .map_err(|e| ParseError::InvalidElf(e.to_string()))?;

    let segments = file
        .segments()
        .ok_or_else(|| ParseError::InvalidElf("no program headers".to_string()))?;

    for phdr in segments.iter() {
        if phdr.p_type != PT_LOAD || phdr.p_memsz == 0 {
            continue;
        }

        let file_data = file
            .segment_data(&phdr)
            .map_err(|e| ParseError::InvalidElf(e.to_string()))?;

        let mut data = file_data.to_vec();
        data.resize(phdr.p_memsz as usize, 0);

        image.add(phdr.p_paddr, &data).map_err(|_| {
            ParseError::AddressOverflow(format!("{:#X} + {}", phdr.p_paddr, data.len()))
        })?;
    }

    image.execution_start_address = Some(file.ehdr.e_entry);

    Ok(())
}
