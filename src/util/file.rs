use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use memmap2::{Mmap, MmapOptions};
use walkdir::WalkDir;

/// Opens a memory mapped file.
pub fn map_file<P: AsRef<Path>>(path: P) -> Result<Mmap> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open file '{}'", path.as_ref().display()))?;
    let map = unsafe { MmapOptions::new().map(&file) }
        .with_context(|| format!("Failed to mmap file: '{}'", path.as_ref().display()))?;
    Ok(map)
}

/// Expands the given inputs into a sorted list of files with the extension `ext`.
///
/// Plain files are passed through regardless of extension. Directories are
/// scanned one level deep, or fully when `recursive` is set.
pub fn collect_files<P: AsRef<Path>>(inputs: &[P], ext: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if !input.is_dir() {
            out.push(input.to_path_buf());
            continue;
        }
        let walker = WalkDir::new(input).min_depth(1).max_depth(if recursive { usize::MAX } else { 1 });
        let mut found = Vec::new();
        for entry in walker {
            let entry = entry
                .with_context(|| format!("Failed to scan directory '{}'", input.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case(ext));
            if matches {
                found.push(entry.into_path());
            }
        }
        found.sort();
        out.extend(found);
    }
    Ok(out)
}
