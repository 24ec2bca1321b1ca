//! Boot image assembly pipeline.
//!
//! [`Multiboot::load`] turns a kernel ELF, an optional set of modules and a
//! trampoline blob into the list of physical memory segments a kexec-style
//! handoff must install, plus the address execution resumes at. The
//! trampoline puts the machine into the register state Multiboot v1
//! mandates, so the returned entry point lands in the trampoline rather
//! than the kernel itself.

use std::fs;
use std::path::{Path, PathBuf};

use crate::builder::MultibootBuilder;
use crate::error::Result;
use crate::header::{header_flags, parse_header, Header};
use crate::info::{
    info_flags, marshal_memory_map, memory_map_type, Info, InfoWrapper, MemoryMapEntry,
};
use crate::memory::{self, parse_memory_map, Memory, PhysicalMemory, RangeType, Segment};
use crate::module;
use crate::trampoline::setup_trampoline;

/// Name reported to the kernel through the info block.
pub(crate) const BOOTLOADER_NAME: &str = "kexec-multiboot";

const KIB_640: u64 = 640 * 1024;
const MIB_1: u64 = 1 << 20;

/// A configured Multiboot v1 load. Built via [`Multiboot::builder`].
#[derive(Debug)]
pub struct Multiboot {
    pub(crate) kernel: PathBuf,
    pub(crate) trampoline: PathBuf,
    pub(crate) cmdline: String,
    pub(crate) modules: Vec<String>,
    pub(crate) bootloader_name: String,
    pub(crate) memory_map_root: PathBuf,
}

/// The assembled boot image.
///
/// Everything here is frozen; the caller hands the segments and entry
/// point to the reloading facility.
#[derive(Debug, Clone)]
pub struct BootImage {
    /// Segments to place in physical memory, in the order they were added.
    pub segments: Vec<Segment>,
    /// Address execution must resume at, inside the trampoline segment.
    pub entry_point: u64,
    /// Physical address of the Multiboot info block.
    pub info_addr: u64,
    /// Entry point recorded in the kernel ELF header.
    pub kernel_entry: u64,
}

impl Multiboot {
    /// Start configuring a load of `kernel` handed off via `trampoline`.
    pub fn builder(
        kernel: impl Into<PathBuf>,
        trampoline: impl Into<PathBuf>,
    ) -> MultibootBuilder {
        MultibootBuilder::new(kernel, trampoline)
    }

    /// Assemble the boot image.
    ///
    /// Parses the kernel, lays out every segment and patches the
    /// trampoline. Nothing is retried; the first failing phase aborts the
    /// whole load.
    pub fn load(self) -> Result<BootImage> {
        log::info!("parsing kernel {}", self.kernel.display());
        let kernel = fs::read(&self.kernel)?;

        let kernel_entry = memory::elf_entry(&kernel)?;
        log::info!("kernel entry point {kernel_entry:#x}");

        log::info!("parsing multiboot header");
        let header = parse_header(&kernel)?;

        log::info!("loading ELF segments");
        let mut mem = Memory::default();
        mem.load_elf_segments(&kernel)?;

        log::info!("parsing host memory map");
        mem.phys = parse_memory_map(&self.memory_map_root)?;

        log::info!("preparing multiboot info");
        let info_addr = self.add_info(&mut mem, &header)?;

        log::info!("adding trampoline");
        let patched = setup_trampoline(&self.trampoline, info_addr, kernel_entry)?;
        let entry_point = mem.add_kexec_segment(patched)?;
        log::info!("boot image ready, entry point {entry_point:#x}");

        Ok(BootImage {
            segments: mem.segments,
            entry_point,
            info_addr,
            kernel_entry,
        })
    }

    /// Build and install the info block, returning its address.
    ///
    /// The block points into itself, so it is sized at base zero, space is
    /// reserved for that size, and the final bytes are marshalled against
    /// the reserved address.
    fn add_info(&self, mem: &mut Memory, header: &Header) -> Result<u64> {
        let wrapper = self.build_info(mem, header)?;
        let size = wrapper.size();
        let addr = mem.find_space(size)?;
        let data = wrapper.marshal(addr);
        mem.add_kexec_segment(data)
    }

    fn build_info(&self, mem: &mut Memory, header: &Header) -> Result<InfoWrapper> {
        let (mmap_addr, mmap_length) = add_memory_map(mem)?;

        let mut info = Info::default();
        if header.flags & header_flags::MEMORY_INFO != 0 {
            let (lower, upper) = memory_boundaries(&mem.phys);
            info.flags |= info_flags::MEM_MAP | info_flags::MEMORY;
            info.mem_lower = kib(lower);
            info.mem_upper = kib(upper);
            info.mmap_length = mmap_length as u32;
            info.mmap_addr = mmap_addr as u32;
        }

        let modules = module::load_modules(mem, &self.modules)?;
        if !modules.is_empty() {
            let mods_addr = module::add_modules_block(mem, &modules)?;
            info.flags |= info_flags::MODS;
            info.mods_addr = mods_addr as u32;
            info.mods_count = modules.len() as u32;
        }

        info.flags |= info_flags::CMDLINE | info_flags::BOOT_LOADER_NAME;

        Ok(InfoWrapper {
            info,
            cmdline: self.cmdline.clone(),
            boot_loader_name: self.bootloader_name.clone(),
        })
    }
}

/// Check whether `path` holds a valid, supported Multiboot v1 kernel.
pub fn probe(path: impl AsRef<Path>) -> Result<()> {
    let image = fs::read(path)?;
    parse_header(&image).map(|_| ())
}

/// Marshal the host memory map and install it as a segment, returning its
/// address and byte length.
fn add_memory_map(mem: &mut Memory) -> Result<(u64, u64)> {
    let entries: Vec<MemoryMapEntry> = mem
        .phys
        .iter()
        .map(|r| MemoryMapEntry {
            // Size skips to the next entry and excludes itself.
            size: (MemoryMapEntry::SIZE - 4) as u32,
            base_addr: r.range.start,
            length: r.range.size,
            typ: memory_map_type(r.typ),
        })
        .collect();
    let data = marshal_memory_map(&entries);
    let length = data.len() as u64;
    let addr = mem.add_kexec_segment(data)?;
    Ok((addr, length))
}

/// Compute the classic lower/upper memory bounds in bytes.
///
/// Lower memory starts at address zero and tops out at 640 KiB; upper
/// memory starts at 1 MiB and is reported relative to it.
fn memory_boundaries(phys: &[PhysicalMemory]) -> (u64, u64) {
    let mut lower = 0u64;
    let mut upper = 0u64;
    for r in phys {
        if r.typ != RangeType::Ram {
            continue;
        }
        let end = r.range.end();
        if r.range.start <= KIB_640 && end > lower {
            lower = end;
        }
        if r.range.start <= MIB_1 && end > upper + MIB_1 {
            upper = end - MIB_1;
        }
    }
    (lower, upper)
}

/// Convert bytes to KiB, saturating at the 32-bit limit.
fn kib(bytes: u64) -> u32 {
    (bytes >> 10).min(u32::MAX as u64) as u32
}
