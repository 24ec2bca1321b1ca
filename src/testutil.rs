//! Shared test fixtures.

/// Build a minimal ELF64 executable image.
///
/// Each entry of `loads` becomes one PT_LOAD program header:
/// `(p_paddr, file bytes, p_memsz)`. File bytes are packed back to back
/// after the program header table.
pub fn minimal_elf(entry: u64, loads: &[(u64, Vec<u8>, u64)]) -> Vec<u8> {
    const EHSIZE: usize = 64;
    const PHENTSIZE: usize = 56;

    let phoff = EHSIZE;
    let data_start = phoff + loads.len() * PHENTSIZE;

    let mut image = Vec::new();

    // ELF header
    image.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
    image.push(2); // ELFCLASS64
    image.push(1); // ELFDATA2LSB
    image.push(1); // EV_CURRENT
    image.extend_from_slice(&[0u8; 9]); // OS ABI + padding
    image.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    image.extend_from_slice(&0x3eu16.to_le_bytes()); // EM_X86_64
    image.extend_from_slice(&1u32.to_le_bytes()); // e_version
    image.extend_from_slice(&entry.to_le_bytes());
    image.extend_from_slice(&(phoff as u64).to_le_bytes());
    image.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
    image.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    image.extend_from_slice(&(EHSIZE as u16).to_le_bytes());
    image.extend_from_slice(&(PHENTSIZE as u16).to_le_bytes());
    image.extend_from_slice(&(loads.len() as u16).to_le_bytes());
    image.extend_from_slice(&0u16.to_le_bytes()); // e_shentsize
    image.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
    image.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
    assert_eq!(image.len(), EHSIZE);

    // Program headers
    let mut offset = data_start as u64;
    for (paddr, data, memsz) in loads {
        image.extend_from_slice(&1u32.to_le_bytes()); // PT_LOAD
        image.extend_from_slice(&5u32.to_le_bytes()); // R+X
        image.extend_from_slice(&offset.to_le_bytes());
        image.extend_from_slice(&paddr.to_le_bytes()); // p_vaddr
        image.extend_from_slice(&paddr.to_le_bytes()); // p_paddr
        image.extend_from_slice(&(data.len() as u64).to_le_bytes());
        image.extend_from_slice(&memsz.to_le_bytes());
        image.extend_from_slice(&0x1000u64.to_le_bytes()); // p_align
        offset += data.len() as u64;
    }

    // Segment file contents
    for (_, data, _) in loads {
        image.extend_from_slice(data);
    }
    image
}
