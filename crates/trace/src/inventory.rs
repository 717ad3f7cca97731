//! Inventory loading: listings and extracted root filesystems

use crate::error::{Result, TraceError};
use crate::open_input;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};
use trim_core::{ImagePath, Inventory};
use walkdir::WalkDir;

/// Counters for an inventory load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryStats {
    /// Non-blank lines or walked entries
    pub entries: u64,
    /// Lines that were not absolute paths
    pub rejected: u64,
    /// Entries the walker could not read
    pub walk_errors: u64,
}

/// Parse a newline-delimited listing of absolute paths
///
/// Blank lines are ignored; relative lines are counted and skipped.
pub fn parse_inventory<R: BufRead>(
    reader: R,
    source: &Path,
) -> Result<(Inventory, InventoryStats)> {
    let mut inventory = Inventory::new();
    let mut stats = InventoryStats::default();

    for line in reader.split(b'\n') {
        let bytes = line.map_err(|e| TraceError::io(source, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        stats.entries += 1;
        match ImagePath::parse(text) {
            Some(path) => {
                inventory.insert(path);
            }
            None => stats.rejected += 1,
        }
    }

    if stats.rejected > 0 {
        warn!(
            source = %source.display(),
            rejected = stats.rejected,
            "skipped non-absolute inventory lines"
        );
    }
    Ok((inventory, stats))
}

/// Read a listing such as the output of `find / -xdev`
pub fn read_inventory(path: &Path) -> Result<(Inventory, InventoryStats)> {
    let file = open_input(path)?;
    let loaded = parse_inventory(BufReader::new(file), path)?;
    info!(source = %path.display(), paths = loaded.0.len(), "loaded inventory");
    Ok(loaded)
}

/// Walk an extracted image root and list every entry as an image path
///
/// `root` itself becomes `/` and is not listed. Symlinks are recorded but
/// not followed. Unreadable subdirectories are counted and skipped.
pub fn scan_rootfs(root: &Path, dirs_only: bool) -> Result<(Inventory, InventoryStats)> {
    if !root.exists() {
        return Err(TraceError::NotFound(root.to_path_buf()));
    }

    let mut inventory = Inventory::new();
    let mut stats = InventoryStats::default();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(TraceError::Walk {
                    root: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                stats.walk_errors += 1;
                continue;
            }
        };

        if dirs_only && !entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        stats.entries += 1;
        inventory.insert(ImagePath::root().join(&relative.to_string_lossy()));
    }

    info!(
        root = %root.display(),
        paths = inventory.len(),
        errors = stats.walk_errors,
        "scanned root filesystem"
    );
    Ok((inventory, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn strings(inventory: &Inventory) -> Vec<String> {
        inventory.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_parse_listing() {
        let listing = "/\n/usr\n\n/usr/lib//\nrelative\n/usr/lib\n";
        let (inventory, stats) =
            parse_inventory(Cursor::new(listing), Path::new("listing")).unwrap();
        assert_eq!(strings(&inventory), vec!["/", "/usr", "/usr/lib"]);
        assert_eq!(stats.entries, 5);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_read_missing_listing() {
        let err = read_inventory(Path::new("/nonexistent/imgtrim/existing_files")).unwrap_err();
        assert!(matches!(err, TraceError::NotFound(_)));
    }

    #[test]
    fn test_scan_rootfs() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("usr/lib"))?;
        fs::create_dir_all(dir.path().join("etc"))?;
        fs::write(dir.path().join("etc/hosts"), b"127.0.0.1 localhost\n")?;

        let (all, _) = scan_rootfs(dir.path(), false)?;
        assert_eq!(strings(&all), vec!["/etc", "/etc/hosts", "/usr", "/usr/lib"]);

        let (dirs, _) = scan_rootfs(dir.path(), true)?;
        assert_eq!(strings(&dirs), vec!["/etc", "/usr", "/usr/lib"]);
        Ok(())
    }

    #[test]
    fn test_scan_missing_root() {
        let err = scan_rootfs(Path::new("/nonexistent/imgtrim/rootfs"), false).unwrap_err();
        assert!(matches!(err, TraceError::NotFound(_)));
    }
}
