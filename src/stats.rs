use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the batch stage and the print workers
#[derive(Default)]
pub struct PipelineStats {
    pub collections_attempted: AtomicU64,
    pub collections_failed: AtomicU64,
    pub contracts_without_account: AtomicU64,
    pub print_requests: AtomicU64,
    pub prints_succeeded: AtomicU64,
    pub prints_failed: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the attempt count including this one.
    pub fn inc_attempted(&self) -> u64 {
        self.collections_attempted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_collection_failures(&self) {
        self.collections_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_without_account(&self) {
        self.contracts_without_account
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_print_requests(&self) {
        self.print_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_printed(&self) {
        self.prints_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_print_failures(&self) {
        self.prints_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempted(&self) -> u64 {
        self.collections_attempted.load(Ordering::Relaxed)
    }

    pub fn collection_failures(&self) -> u64 {
        self.collections_failed.load(Ordering::Relaxed)
    }

    pub fn without_account(&self) -> u64 {
        self.contracts_without_account.load(Ordering::Relaxed)
    }

    pub fn enqueued(&self) -> u64 {
        self.print_requests.load(Ordering::Relaxed)
    }

    pub fn printed(&self) -> u64 {
        self.prints_succeeded.load(Ordering::Relaxed)
    }

    pub fn print_failures(&self) -> u64 {
        self.prints_failed.load(Ordering::Relaxed)
    }
}
