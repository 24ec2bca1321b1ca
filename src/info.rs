//! Multiboot v1 information structures.
//!
//! The info block is what the loaded kernel reads on entry: a packed
//! little-endian prefix of word-sized fields followed by the
//! zero-terminated command line and bootloader name. Pointer fields hold
//! absolute physical addresses, including pointers into the block itself,
//! so marshalling takes the block's own base address.

use crate::memory::RangeType;

/// Info flag bits.
#[allow(dead_code)]
pub mod info_flags {
    pub const MEMORY: u32 = 1 << 0;
    pub const BOOT_DEVICE: u32 = 1 << 1;
    pub const CMDLINE: u32 = 1 << 2;
    pub const MODS: u32 = 1 << 3;
    pub const AOUT_SYMS: u32 = 1 << 4;
    pub const ELF_SHDR: u32 = 1 << 5;
    pub const MEM_MAP: u32 = 1 << 6;
    pub const DRIVE_INFO: u32 = 1 << 7;
    pub const CONFIG_TABLE: u32 = 1 << 8;
    pub const BOOT_LOADER_NAME: u32 = 1 << 9;
    pub const APM_TABLE: u32 = 1 << 10;
    pub const VIDEO_INFO: u32 = 1 << 11;
    pub const FRAMEBUFFER: u32 = 1 << 12;
}

/// The fixed-size prefix of the Multiboot v1 information block.
///
/// Fields this loader never fills stay zero.
#[derive(Debug, Default, Clone)]
pub struct Info {
    pub flags: u32,
    pub mem_lower: u32,
    pub mem_upper: u32,

    pub boot_device: u32,

    pub cmdline: u32,

    pub mods_count: u32,
    pub mods_addr: u32,

    pub syms: [u32; 4],

    pub mmap_length: u32,
    pub mmap_addr: u32,

    pub drives_length: u32,
    pub drives_addr: u32,

    pub config_table: u32,

    pub boot_loader_name: u32,

    pub apm_table: u32,

    pub vbe_control_info: u32,
    pub vbe_mode_info: u32,
    pub vbe_mode: u16,
    pub vbe_interface_seg: u16,
    pub vbe_interface_off: u16,
    pub vbe_interface_len: u16,

    pub framebuffer_addr: u16,
    pub framebuffer_pitch: u16,
    pub framebuffer_width: u32,
    pub framebuffer_height: u32,
    pub framebuffer_bpp: u8,
    pub framebuffer_type: u8,
    pub color_info: [u8; 6],
}

impl Info {
    /// Byte size of the packed prefix.
    pub const SIZE: usize = 108;

    /// Pack the prefix little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut d = Vec::with_capacity(Self::SIZE);
        d.extend_from_slice(&self.flags.to_le_bytes());
        d.extend_from_slice(&self.mem_lower.to_le_bytes());
        d.extend_from_slice(&self.mem_upper.to_le_bytes());
        d.extend_from_slice(&self.boot_device.to_le_bytes());
        d.extend_from_slice(&self.cmdline.to_le_bytes());
        d.extend_from_slice(&self.mods_count.to_le_bytes());
        d.extend_from_slice(&self.mods_addr.to_le_bytes());
        for s in self.syms {
            d.extend_from_slice(&s.to_le_bytes());
        }
        d.extend_from_slice(&self.mmap_length.to_le_bytes());
        d.extend_from_slice(&self.mmap_addr.to_le_bytes());
        d.extend_from_slice(&self.drives_length.to_le_bytes());
        d.extend_from_slice(&self.drives_addr.to_le_bytes());
        d.extend_from_slice(&self.config_table.to_le_bytes());
        d.extend_from_slice(&self.boot_loader_name.to_le_bytes());
        d.extend_from_slice(&self.apm_table.to_le_bytes());
        d.extend_from_slice(&self.vbe_control_info.to_le_bytes());
        d.extend_from_slice(&self.vbe_mode_info.to_le_bytes());
        d.extend_from_slice(&self.vbe_mode.to_le_bytes());
        d.extend_from_slice(&self.vbe_interface_seg.to_le_bytes());
        d.extend_from_slice(&self.vbe_interface_off.to_le_bytes());
        d.extend_from_slice(&self.vbe_interface_len.to_le_bytes());
        d.extend_from_slice(&self.framebuffer_addr.to_le_bytes());
        d.extend_from_slice(&self.framebuffer_pitch.to_le_bytes());
        d.extend_from_slice(&self.framebuffer_width.to_le_bytes());
        d.extend_from_slice(&self.framebuffer_height.to_le_bytes());
        d.push(self.framebuffer_bpp);
        d.push(self.framebuffer_type);
        d.extend_from_slice(&self.color_info);
        debug_assert_eq!(d.len(), Self::SIZE);
        d
    }
}

/// Info prefix together with its trailing strings.
#[derive(Debug, Clone)]
pub struct InfoWrapper {
    pub info: Info,
    pub cmdline: String,
    pub boot_loader_name: String,
}

impl InfoWrapper {
    /// Marshal the block as it will appear at physical address `base`,
    /// resolving the string pointers against that base.
    pub fn marshal(&self, base: u64) -> Vec<u8> {
        let mut info = self.info.clone();
        let mut offset = base as u32 + Info::SIZE as u32;
        info.cmdline = offset;
        offset += self.cmdline.len() as u32 + 1;
        info.boot_loader_name = offset;

        let mut d = info.to_bytes();
        for s in [&self.cmdline, &self.boot_loader_name] {
            d.extend_from_slice(s.as_bytes());
            d.push(0);
        }
        // The installed block is padded to a 4-byte multiple.
        d.resize((d.len() + 3) & !3, 0);
        d
    }

    /// Marshalled size of the block in bytes.
    pub fn size(&self) -> u64 {
        self.marshal(0).len() as u64
    }
}

/// One entry of the memory map handed to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapEntry {
    /// Size of the rest of the entry; a skip field for the consumer, not
    /// the total entry size.
    pub size: u32,
    /// First address of the region.
    pub base_addr: u64,
    /// Region length in bytes.
    pub length: u64,
    /// Multiboot region type.
    pub typ: u32,
}

impl MemoryMapEntry {
    /// Packed entry size, including the leading `size` field.
    pub const SIZE: usize = 24;

    /// Pack the entry little-endian.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut d = [0u8; Self::SIZE];
        d[0..4].copy_from_slice(&self.size.to_le_bytes());
        d[4..12].copy_from_slice(&self.base_addr.to_le_bytes());
        d[12..20].copy_from_slice(&self.length.to_le_bytes());
        d[20..24].copy_from_slice(&self.typ.to_le_bytes());
        d
    }
}

/// Marshal a whole memory map array.
pub fn marshal_memory_map(entries: &[MemoryMapEntry]) -> Vec<u8> {
    let mut d = Vec::with_capacity(entries.len() * MemoryMapEntry::SIZE);
    for entry in entries {
        d.extend_from_slice(&entry.to_bytes());
    }
    d
}

/// Multiboot memory type for a host range type.
pub fn memory_map_type(typ: RangeType) -> u32 {
    match typ {
        RangeType::Ram => 1,
        RangeType::Acpi | RangeType::NvAcpi => 3,
        RangeType::Nvs => 4,
        RangeType::Default => 2,
    }
}
