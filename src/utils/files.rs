//! Whole-file I/O helpers: `read_file`, `write_file`, `list_dir`, `make_dirs`.
//! Path and encoding utilities beyond this thin contract live elsewhere.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads a whole file into memory.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Writes a whole file, creating parent directories as needed.
pub fn write_file<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    make_dirs_for(path)?;
    fs::write(path, data).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Ensures the parent directory of `path` exists.
pub fn make_dirs_for<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Creates a directory (and any parents) if it does not already exist.
pub fn make_dirs<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Enumerates regular files under `path`, optionally recursing into
/// subdirectories.
pub fn list_dir<P: AsRef<Path>>(path: P, recursive: bool) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let mut out = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("Failed to read directory: {}", path.display()))?
    {
        let entry = entry?;
        let p = entry.path();
        if p.is_file() {
            out.push(p);
        } else if recursive && p.is_dir() {
            out.extend(list_dir(&p, recursive)?);
        }
    }
    Ok(out)
}
