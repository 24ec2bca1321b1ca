//! Builder for configuring a Multiboot load.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::loader::{Multiboot, BOOTLOADER_NAME};
use crate::memory::DEFAULT_MEMORY_MAP_ROOT;

/// Builder for a [`Multiboot`] load.
///
/// # Example
///
/// ```rust,no_run
/// use kexec_multiboot::Multiboot;
///
/// let image = Multiboot::builder("/boot/kernel.elf", "/lib/kexec/trampoline.bin")
///     .cmdline("root=/dev/sda1 console=ttyS0")
///     .module("/boot/initrd.gz quiet")
///     .build()?
///     .load()?;
/// # Ok::<(), kexec_multiboot::Error>(())
/// ```
pub struct MultibootBuilder {
    kernel: PathBuf,
    trampoline: PathBuf,
    cmdline: String,
    modules: Vec<String>,
    bootloader_name: String,
    memory_map_root: PathBuf,
}

impl MultibootBuilder {
    /// Create a builder for loading `kernel` via `trampoline`.
    pub fn new(kernel: impl Into<PathBuf>, trampoline: impl Into<PathBuf>) -> Self {
        Self {
            kernel: kernel.into(),
            trampoline: trampoline.into(),
            cmdline: String::new(),
            modules: Vec::new(),
            bootloader_name: BOOTLOADER_NAME.to_string(),
            memory_map_root: PathBuf::from(DEFAULT_MEMORY_MAP_ROOT),
        }
    }

    /// Set the kernel command line.
    pub fn cmdline(mut self, cmdline: impl Into<String>) -> Self {
        self.cmdline = cmdline.into();
        self
    }

    /// Add a module spec: a file path optionally followed by the module's
    /// command line, whitespace-separated.
    pub fn module(mut self, spec: impl Into<String>) -> Self {
        self.modules.push(spec.into());
        self
    }

    /// Override the bootloader name reported to the kernel.
    pub fn bootloader_name(mut self, name: impl Into<String>) -> Self {
        self.bootloader_name = name.into();
        self
    }

    /// Override where the host memory map is read from.
    ///
    /// Default: `/sys/firmware/memmap`.
    pub fn memory_map_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.memory_map_root = root.into();
        self
    }

    /// Validate the configuration and produce a [`Multiboot`] ready to
    /// load.
    pub fn build(self) -> Result<Multiboot> {
        if !self.kernel.exists() {
            return Err(Error::KernelNotFound(self.kernel));
        }
        if !self.trampoline.exists() {
            return Err(Error::TrampolineNotFound(self.trampoline));
        }

        Ok(Multiboot {
            kernel: self.kernel,
            trampoline: self.trampoline,
            cmdline: self.cmdline,
            modules: self.modules,
            bootloader_name: self.bootloader_name,
            memory_map_root: self.memory_map_root,
        })
    }
}
