//! A simple counter for tracking batch-operation results.
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;

/// Tracks how many items in a batch operation (extract-all, repack,
/// replace-text) succeeded, failed, or produced a non-fatal warning.
///
/// Per-item failures are reported to the caller with `eprintln!` as they
/// happen and tallied here; the batch itself keeps going and returns the
/// success count rather than aborting on the first error.
#[derive(Debug, Default)]
pub struct Counter {
    ok: AtomicUsize,
    error: AtomicUsize,
    warning: AtomicUsize,
}

impl Counter {
    /// Creates a new, zeroed counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful item.
    pub fn inc_ok(&self) {
        self.ok.fetch_add(1, SeqCst);
    }

    /// Records a non-fatal warning (e.g. a skipped over-long replacement).
    pub fn inc_warning(&self) {
        self.warning.fetch_add(1, SeqCst);
    }

    /// Records a failed item.
    pub fn inc_error(&self) {
        self.error.fetch_add(1, SeqCst);
    }

    /// Number of items that succeeded.
    pub fn ok_count(&self) -> usize {
        self.ok.load(SeqCst)
    }

    /// Number of items that failed.
    pub fn error_count(&self) -> usize {
        self.error.load(SeqCst)
    }

    /// Number of non-fatal warnings raised.
    pub fn warning_count(&self) -> usize {
        self.warning.load(SeqCst)
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OK: {}, Error: {}, Warning: {}",
            self.ok_count(),
            self.error_count(),
            self.warning_count(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_independently() {
        let c = Counter::new();
        c.inc_ok();
        c.inc_ok();
        c.inc_error();
        c.inc_warning();
        assert_eq!(c.ok_count(), 2);
        assert_eq!(c.error_count(), 1);
        assert_eq!(c.warning_count(), 1);
        assert_eq!(c.to_string(), "OK: 2, Error: 1, Warning: 1");
    }
}
