//! Modules loaded alongside the kernel.
//!
//! A module spec string is whitespace-separated: the first token names the
//! file, the rest form the module's command line. Files may be gzip
//! compressed; they are decompressed transparently.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::{Error, Result};
use crate::memory::Memory;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Packed size of one module descriptor.
pub const MODULE_SIZE: usize = 16;

/// A module placed in memory, as described to the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// First byte of the module.
    pub start: u32,
    /// Last byte of the module (inclusive).
    pub end: u32,
    /// Module command line.
    pub cmdline: String,
}

/// Load every module named in `specs`, returning descriptors in order.
///
/// Each module's bytes become their own segment. Modules that turn out
/// empty after decompression are skipped.
pub fn load_modules(mem: &mut Memory, specs: &[String]) -> Result<Vec<Module>> {
    let mut modules = Vec::new();
    for spec in specs {
        let mut fields = spec.split_whitespace();
        let path = match fields.next() {
            Some(p) => p,
            None => continue,
        };
        let data = read_module(Path::new(path))?;
        if data.is_empty() {
            log::debug!("skipping empty module {path}");
            continue;
        }
        let len = data.len() as u32;
        let start = mem.add_kexec_segment(data)? as u32;
        modules.push(Module {
            start,
            end: start + len - 1,
            cmdline: fields.collect::<Vec<_>>().join(" "),
        });
    }
    Ok(modules)
}

/// Marshal the module block and install it, returning its address.
///
/// The block points into itself, so it is marshalled twice: once at base
/// zero to learn its size, then against the address the allocator hands
/// out for that size.
pub fn add_modules_block(mem: &mut Memory, modules: &[Module]) -> Result<u64> {
    let size = marshal_modules(modules, 0).len() as u64;
    let addr = mem.find_space(size)?;
    let data = marshal_modules(modules, addr);
    mem.add_kexec_segment(data)
}

/// Marshal the module block as it will appear at physical address `base`:
/// the NUL-terminated command lines first, then the descriptor array.
pub fn marshal_modules(modules: &[Module], base: u64) -> Vec<u8> {
    let mut cmdlines = Vec::new();
    let mut descriptors = Vec::with_capacity(modules.len() * MODULE_SIZE);
    for module in modules {
        let cmdline_ptr = base as u32 + cmdlines.len() as u32;
        descriptors.extend_from_slice(&module.start.to_le_bytes());
        descriptors.extend_from_slice(&module.end.to_le_bytes());
        descriptors.extend_from_slice(&cmdline_ptr.to_le_bytes());
        descriptors.extend_from_slice(&0u32.to_le_bytes());

        cmdlines.extend_from_slice(module.cmdline.as_bytes());
        cmdlines.push(0);
    }
    cmdlines.append(&mut descriptors);
    cmdlines
}

/// Read a module file, transparently decompressing gzip.
pub fn read_module(path: &Path) -> Result<Vec<u8>> {
    let read_failed = |source| Error::ModuleReadFailed {
        path: PathBuf::from(path),
        source,
    };
    let raw = fs::read(path).map_err(read_failed)?;
    if raw.starts_with(&GZIP_MAGIC) {
        let mut data = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut data)
            .map_err(read_failed)?;
        return Ok(data);
    }
    Ok(raw)
}
