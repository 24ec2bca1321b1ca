//! Error types for kexec-multiboot.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using this crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assembling a boot image.
#[derive(Error, Debug)]
pub enum Error {
    // Kernel image errors
    #[error("kernel not found: {0}")]
    KernelNotFound(PathBuf),

    #[error("multiboot header not found in the first 8192 bytes of the image")]
    HeaderNotFound,

    #[error("multiboot header flags {0:#010x} not supported")]
    HeaderFlagsUnsupported(u32),

    #[error("malformed ELF image: {0}")]
    ElfMalformed(String),

    #[error("ELF segment at {0:#x}..{1:#x} overlaps an already placed segment")]
    ElfSegmentOverlap(u64, u64),

    // Memory map and allocation errors
    #[error("malformed memory map entry {path}: {reason}")]
    MemoryMapMalformed { path: PathBuf, reason: String },

    #[error("out of physical memory: no free RAM gap of {0:#x} bytes")]
    OutOfPhysicalSpace(u64),

    #[error("segment payload must not be empty")]
    EmptySegment,

    // Module errors
    #[error("cannot read module {path}: {source}")]
    ModuleReadFailed { path: PathBuf, source: io::Error },

    // Trampoline errors
    #[error("trampoline not found: {0}")]
    TrampolineNotFound(PathBuf),

    #[error("trampoline label {0:?} not found")]
    TrampolineLabelMissing(&'static str),

    #[error("trampoline too short to patch the field after label {0:?}")]
    TrampolineTruncated(&'static str),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
