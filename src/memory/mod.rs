//! Physical memory bookkeeping for the boot image.
//!
//! [`Memory`] tracks the host memory map and the segments claimed so far,
//! hands out page-aligned allocations from free RAM gaps, and places the
//! kernel's PT_LOAD segments at their fixed physical addresses.

mod map;
mod range;

pub use map::{parse_memory_map, DEFAULT_MEMORY_MAP_ROOT};
pub use range::{subtract, PhysicalMemory, Range, RangeType};

use goblin::elf::{program_header, Elf};

use crate::error::{Error, Result};

/// Allocation granularity for segments placed by the allocator.
pub const PAGE_SIZE: u64 = 4096;

/// A claim on physical memory: an address range plus the bytes to place
/// there. A payload shorter than its range leaves the tail zero-filled,
/// which is how BSS is expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Claimed physical range.
    pub phys: Range,
    /// Payload bytes, at most `phys.size` long.
    pub buf: Vec<u8>,
}

impl Segment {
    /// Create a segment placing `buf` at the start of `phys`.
    pub fn new(buf: Vec<u8>, phys: Range) -> Self {
        Self { phys, buf }
    }
}

/// Host memory map plus the segments claimed for the new kernel.
#[derive(Debug, Default, Clone)]
pub struct Memory {
    /// Host physical memory regions, in map order.
    pub phys: Vec<PhysicalMemory>,
    /// Claimed segments, in insertion order.
    pub segments: Vec<Segment>,
}

impl Memory {
    /// Find a page-aligned address for `size` bytes inside free RAM.
    ///
    /// First fit in ascending physical order. The scan does not mutate any
    /// state, so a subsequent [`Memory::add_kexec_segment`] of the same
    /// size lands at the returned address.
    pub fn find_space(&self, size: u64) -> Result<u64> {
        if size == 0 {
            return Err(Error::EmptySegment);
        }
        // Allocate whole pages.
        let size = align_up(size, PAGE_SIZE);
        for gap in self.available_ram() {
            if gap.range.size >= size {
                return Ok(gap.range.start);
            }
        }
        Err(Error::OutOfPhysicalSpace(size))
    }

    /// Allocate space for `buf` inside free RAM, claim it and return the
    /// chosen physical start address.
    pub fn add_kexec_segment(&mut self, buf: Vec<u8>) -> Result<u64> {
        let size = buf.len() as u64;
        let start = self.find_space(size)?;
        self.segments.push(Segment::new(buf, Range::new(start, size)));
        Ok(start)
    }

    /// Claim `phys` at a caller-fixed address, rejecting overlap with any
    /// existing segment.
    pub fn add_segment(&mut self, buf: Vec<u8>, phys: Range) -> Result<()> {
        if phys.size == 0 {
            return Err(Error::EmptySegment);
        }
        for existing in &self.segments {
            if existing.phys.overlaps(&phys) {
                return Err(Error::ElfSegmentOverlap(phys.start, phys.end()));
            }
        }
        self.segments.push(Segment::new(buf, phys));
        Ok(())
    }

    /// Place every PT_LOAD segment of the ELF `image` at its physical
    /// address. The range spans `p_memsz` bytes while the payload carries
    /// only `p_filesz` of them.
    pub fn load_elf_segments(&mut self, image: &[u8]) -> Result<()> {
        let elf = Elf::parse(image).map_err(|e| Error::ElfMalformed(e.to_string()))?;
        for ph in &elf.program_headers {
            if ph.p_type != program_header::PT_LOAD || ph.p_memsz == 0 {
                continue;
            }
            if ph.p_filesz > ph.p_memsz {
                return Err(Error::ElfMalformed(format!(
                    "segment at {:#x} has p_filesz {:#x} > p_memsz {:#x}",
                    ph.p_paddr, ph.p_filesz, ph.p_memsz
                )));
            }
            let offset = ph.p_offset as usize;
            let filesz = ph.p_filesz as usize;
            let end = offset.checked_add(filesz).filter(|&e| e <= image.len());
            let end = match end {
                Some(e) => e,
                None => {
                    return Err(Error::ElfMalformed(format!(
                        "segment file range {:#x}..{:#x} is outside the image",
                        offset,
                        offset.saturating_add(filesz)
                    )))
                }
            };
            let buf = image[offset..end].to_vec();
            self.add_segment(buf, Range::new(ph.p_paddr, ph.p_memsz))?;
        }
        Ok(())
    }

    /// Free RAM: the RAM regions of the host map minus every claimed
    /// segment, with gap starts rounded up to a page boundary.
    fn available_ram(&self) -> Vec<PhysicalMemory> {
        let ram: Vec<PhysicalMemory> = self
            .phys
            .iter()
            .filter(|r| r.typ == RangeType::Ram)
            .copied()
            .collect();
        let holes: Vec<Range> = self.segments.iter().map(|s| s.phys).collect();

        let mut gaps = Vec::new();
        for gap in subtract(&ram, &holes) {
            let start = align_up(gap.range.start, PAGE_SIZE);
            let shift = start - gap.range.start;
            if shift < gap.range.size {
                gaps.push(PhysicalMemory::new(
                    Range::new(start, gap.range.size - shift),
                    gap.typ,
                ));
            }
        }
        gaps
    }
}

/// Entry point recorded in the ELF header of `image`.
pub fn elf_entry(image: &[u8]) -> Result<u64> {
    let elf = Elf::parse(image).map_err(|e| Error::ElfMalformed(e.to_string()))?;
    Ok(elf.header.e_entry)
}

/// Align value up to the given power-of-two alignment.
fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}
