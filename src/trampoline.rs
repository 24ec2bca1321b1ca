//! Trampoline patching.
//!
//! The trampoline is a pre-assembled position-independent blob that puts
//! the machine into the register state a Multiboot kernel expects and then
//! jumps to its entry point. Two byte-literal labels mark the patch sites:
//! the 4 bytes after [`LABEL_EBX`] receive the info-block address (loaded
//! into %ebx) and the 8 bytes after [`LABEL_ENTRY`] receive the kernel
//! entry point. Both fields are little-endian.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Label preceding the 4-byte info-block address field.
pub const LABEL_EBX: &str = "u-root-ebx-long";
/// Label preceding the 8-byte kernel entry point field.
pub const LABEL_ENTRY: &str = "u-root-ep-quad";

/// Read the trampoline at `path` and patch in the info-block address and
/// the kernel entry point.
pub fn setup_trampoline(path: &Path, info_addr: u64, kernel_entry: u64) -> Result<Vec<u8>> {
    let mut blob = fs::read(path)?;
    patch(&mut blob, LABEL_EBX, &(info_addr as u32).to_le_bytes())?;
    patch(&mut blob, LABEL_ENTRY, &kernel_entry.to_le_bytes())?;
    Ok(blob)
}

fn patch(blob: &mut [u8], label: &'static str, value: &[u8]) -> Result<()> {
    let pos = find(blob, label.as_bytes()).ok_or(Error::TrampolineLabelMissing(label))?;
    let at = pos + label.len();
    if blob.len() < at + value.len() {
        return Err(Error::TrampolineTruncated(label));
    }
    blob[at..at + value.len()].copy_from_slice(value);
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> Vec<u8> {
        let mut d = b"\x90\x90".to_vec();
        d.extend_from_slice(LABEL_EBX.as_bytes());
        d.extend_from_slice(&[0u8; 4]);
        d.extend_from_slice(b"PAD");
        d.extend_from_slice(LABEL_ENTRY.as_bytes());
        d.extend_from_slice(&[0u8; 8]);
        d.extend_from_slice(b"\xf4");
        d
    }

    fn write_blob(data: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trampoline.bin");
        fs::write(&path, data).unwrap();
        (dir, path)
    }

    #[test]
    fn test_setup_trampoline() {
        let (_dir, path) = write_blob(&blob());
        let patched = setup_trampoline(&path, 0xDEADBEEF, 0x1122334455667788).unwrap();

        let ebx_at = 2 + LABEL_EBX.len();
        assert_eq!(&patched[ebx_at..ebx_at + 4], &[0xEF, 0xBE, 0xAD, 0xDE]);

        let ep_at = ebx_at + 4 + 3 + LABEL_ENTRY.len();
        assert_eq!(
            &patched[ep_at..ep_at + 8],
            &[0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]
        );
        // Everything else is untouched.
        assert_eq!(&patched[..2], b"\x90\x90");
        assert_eq!(patched.last(), Some(&0xf4));
    }

    #[test]
    fn test_setup_trampoline_label_missing() {
        let mut d = blob();
        let pos = find(&d, LABEL_ENTRY.as_bytes()).unwrap();
        d[pos] = b'X';
        let (_dir, path) = write_blob(&d);

        let err = setup_trampoline(&path, 0, 0).unwrap_err();
        assert!(matches!(err, Error::TrampolineLabelMissing(l) if l == LABEL_ENTRY));
    }

    #[test]
    fn test_setup_trampoline_truncated() {
        let mut d = b"..".to_vec();
        d.extend_from_slice(LABEL_EBX.as_bytes());
        d.extend_from_slice(&[0u8; 2]);
        let (_dir, path) = write_blob(&d);

        let err = setup_trampoline(&path, 0, 0).unwrap_err();
        assert!(matches!(err, Error::TrampolineTruncated(l) if l == LABEL_EBX));
    }

    #[test]
    fn test_setup_trampoline_patches_first_occurrence() {
        let mut d = blob();
        d.extend_from_slice(LABEL_EBX.as_bytes());
        d.extend_from_slice(&[0xffu8; 4]);
        let (_dir, path) = write_blob(&d);

        let patched = setup_trampoline(&path, 0x12345678, 0).unwrap();
        let second = patched.len() - 4;
        assert_eq!(&patched[second..], &[0xff; 4]);
    }
}
