//! Host physical memory map parsing.
//!
//! Linux exports the firmware memory map as a directory tree in which each
//! child directory holds three ASCII files: `start`, `end` and `type`.
//! `start` and `end` are hexadecimal with a `0x` prefix; `end` is exclusive
//! despite the name.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::memory::range::{PhysicalMemory, Range, RangeType};

/// Default location of the firmware memory map on Linux.
pub const DEFAULT_MEMORY_MAP_ROOT: &str = "/sys/firmware/memmap";

/// Parse the firmware memory map below `root`.
///
/// Children are visited in lexicographic name order so the resulting list
/// is deterministic.
pub fn parse_memory_map(root: &Path) -> Result<Vec<PhysicalMemory>> {
    let mut children: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            children.push(entry.path());
        }
    }
    children.sort();

    let mut ranges = Vec::with_capacity(children.len());
    for dir in children {
        let start = read_hex(&dir.join("start"))?;
        let end = read_hex(&dir.join("end"))?;
        if end < start {
            return Err(malformed(
                &dir,
                format!("end {end:#x} precedes start {start:#x}"),
            ));
        }
        let typ = RangeType::from_sysfs(read_text(&dir.join("type"))?.trim());
        ranges.push(PhysicalMemory::new(Range::new(start, end - start), typ));
    }
    Ok(ranges)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| malformed(path, e.to_string()))
}

fn read_hex(path: &Path) -> Result<u64> {
    let text = read_text(path)?;
    let digits = text
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| malformed(path, "missing 0x prefix".to_string()))?;
    u64::from_str_radix(digits, 16).map_err(|e| malformed(path, e.to_string()))
}

fn malformed(path: &Path, reason: String) -> Error {
    Error::MemoryMapMalformed {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_entry(root: &Path, name: &str, start: u64, end: u64, typ: &str) {
        let dir = root.join(name);
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("start"), format!("{start:#x}\n")).unwrap();
        fs::write(dir.join("end"), format!("{end:#x}\n")).unwrap();
        fs::write(dir.join("type"), format!("{typ}\n")).unwrap();
    }

    #[test]
    fn test_parse_memory_map() {
        let root = tempfile::tempdir().unwrap();
        let types = [
            ("System RAM", RangeType::Ram),
            ("ACPI Non-volatile Storage", RangeType::NvAcpi),
            ("ACPI Tables", RangeType::Acpi),
            ("Reserved", RangeType::Nvs),
        ];
        for (i, (name, _)) in types.iter().enumerate() {
            let start = i as u64 * 100;
            write_entry(root.path(), &i.to_string(), start, start + 50, name);
        }

        let got = parse_memory_map(root.path()).unwrap();
        let want: Vec<PhysicalMemory> = types
            .iter()
            .enumerate()
            .map(|(i, (_, typ))| {
                PhysicalMemory::new(Range::new(i as u64 * 100, 50), *typ)
            })
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_parse_memory_map_ordered_by_name() {
        let root = tempfile::tempdir().unwrap();
        write_entry(root.path(), "b", 200, 300, "System RAM");
        write_entry(root.path(), "a", 0, 100, "System RAM");

        let got = parse_memory_map(root.path()).unwrap();
        assert_eq!(got[0].range.start, 0);
        assert_eq!(got[1].range.start, 200);
    }

    #[test]
    fn test_parse_memory_map_missing_prefix() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("0");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("start"), "100\n").unwrap();
        fs::write(dir.join("end"), "0x200\n").unwrap();
        fs::write(dir.join("type"), "System RAM\n").unwrap();

        let err = parse_memory_map(root.path()).unwrap_err();
        assert!(matches!(err, Error::MemoryMapMalformed { .. }));
    }

    #[test]
    fn test_parse_memory_map_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("0");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("start"), "0x0\n").unwrap();
        fs::write(dir.join("end"), "0x100\n").unwrap();

        let err = parse_memory_map(root.path()).unwrap_err();
        assert!(matches!(err, Error::MemoryMapMalformed { .. }));
    }

    #[test]
    fn test_parse_memory_map_end_before_start() {
        let root = tempfile::tempdir().unwrap();
        write_entry(root.path(), "0", 0x200, 0x100, "System RAM");

        let err = parse_memory_map(root.path()).unwrap_err();
        assert!(matches!(err, Error::MemoryMapMalformed { .. }));
    }
}
