//! # kexec-multiboot
//!
//! Assembles a Multiboot v1 boot image for a kexec-style handoff: a list
//! of physical memory segments plus the entry point at which execution
//! must resume, ready to hand to an in-kernel re-execution facility.
//!
//! The pipeline parses the kernel's Multiboot header and ELF program
//! headers, enumerates host physical memory, allocates space for the
//! Multiboot info block, memory map, and modules inside free RAM, and
//! patches a pre-assembled trampoline blob with the live info address and
//! kernel entry point. The trampoline performs the actual register setup
//! and jump; this crate only prepares bytes and addresses.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kexec_multiboot::{Multiboot, Result};
//!
//! fn main() -> Result<()> {
//!     let image = Multiboot::builder("/boot/kernel.elf", "/lib/kexec/trampoline.bin")
//!         .cmdline("root=/dev/sda1")
//!         .module("/boot/initrd.gz quiet")
//!         .build()?
//!         .load()?;
//!
//!     for segment in &image.segments {
//!         println!("{:#x}: {} bytes", segment.phys.start, segment.buf.len());
//!     }
//!     println!("entry point {:#x}", image.entry_point);
//!     Ok(())
//! }
//! ```

mod builder;
mod error;
mod loader;

pub mod header;
pub mod info;
pub mod memory;
pub mod module;
pub mod trampoline;

#[cfg(test)]
mod testutil;

// Re-exports
pub use builder::MultibootBuilder;
pub use error::{Error, Result};
pub use loader::{probe, BootImage, Multiboot};
