//! Batch operations over many entries/files at once.
//!
//! Each item in a batch (extract-all, repack) is attempted independently: a
//! single failure is logged and tallied but does not stop the remaining
//! items from being tried, and the caller gets back both a success count
//! and the per-item failures. Failures are reported with `eprintln!` as
//! they happen and tallied on the global [`crate::get_counter`].
use crate::pak::Pak;
use crate::types::ExtraConfig;
use crate::utils::files;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Outcome of a batch operation: how many items succeeded, and the
/// `(name, error)` pairs for the ones that didn't.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub ok_count: usize,
    pub failures: Vec<(Vec<u8>, String)>,
}

impl BatchReport {
    fn record_ok(&mut self) {
        self.ok_count += 1;
        crate::get_counter().inc_ok();
    }

    fn record_error(&mut self, name: &[u8], err: &anyhow::Error) {
        eprintln!(
            "Error extracting {:?}: {err}",
            String::from_utf8_lossy(name)
        );
        self.failures.push((name.to_vec(), err.to_string()));
        crate::get_counter().inc_error();
    }
}

/// Extracts every entry in `pak` to `out_dir/<name>`, continuing past
/// per-entry failures rather than aborting the whole batch.
pub fn extract_all(pak: &Pak, out_dir: impl AsRef<Path>) -> Result<BatchReport> {
    let out_dir = out_dir.as_ref();
    files::make_dirs(out_dir)?;
    let mut report = BatchReport::default();
    for entry in pak.entries() {
        match pak.extract(&entry.name) {
            Ok(bytes) => {
                let name_str = String::from_utf8_lossy(&entry.name).into_owned();
                let dest = out_dir.join(name_str);
                match files::write_file(&dest, &bytes) {
                    Ok(()) => report.record_ok(),
                    Err(e) => report.record_error(&entry.name, &e),
                }
            }
            Err(e) => report.record_error(&entry.name, &e),
        }
    }
    Ok(report)
}

/// Builds a new PAK/IDX pair from `(name, source_path)` pairs, reading each
/// source file independently: a source that can't be read is logged and
/// skipped rather than aborting the whole repack. The archive is created
/// from whichever entries were read successfully.
pub fn pack_all(
    pak_path: impl AsRef<Path>,
    entries: &[(Vec<u8>, PathBuf)],
    config: &ExtraConfig,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let mut bodies = Vec::with_capacity(entries.len());
    for (name, path) in entries {
        match files::read_file(path) {
            Ok(bytes) => {
                bodies.push((name.clone(), bytes));
                report.record_ok();
            }
            Err(e) => report.record_error(name, &e),
        }
    }
    Pak::create(pak_path, &bodies, config)?;
    Ok(report)
}
