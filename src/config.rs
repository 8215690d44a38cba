use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

/// Log a progress line every N collection attempts
pub const PROGRESS_INTERVAL: u64 = 1000;

/// How long an idle print worker blocks on the queue before re-checking the stop flag
pub const QUEUE_WAIT_MS: u64 = 250;

/// Default latency of the simulated collection system
pub const COLLECT_LATENCY_MS: u64 = 0;

/// Default latency of the simulated print system
pub const PRINT_LATENCY_MS: u64 = 0;

/// Number of parallel execution units on this host, never less than one.
pub fn default_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Order in which the work queue hands out pending items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueOrder {
    /// Oldest item first
    #[default]
    Fifo,
    /// Newest item first
    Lifo,
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pool_size: usize,
    pub batch_threads: usize,
    pub queue_wait: Duration,
    pub queue_order: QueueOrder,
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let parallelism = default_parallelism();
        Self {
            pool_size: parallelism,
            batch_threads: parallelism,
            queue_wait: Duration::from_millis(QUEUE_WAIT_MS),
            queue_order: QueueOrder::Fifo,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl PipelineConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn with_batch_threads(mut self, batch_threads: usize) -> Self {
        self.batch_threads = batch_threads.max(1);
        self
    }

    pub fn with_queue_wait(mut self, queue_wait: Duration) -> Self {
        self.queue_wait = queue_wait;
        self
    }

    pub fn with_queue_order(mut self, queue_order: QueueOrder) -> Self {
        self.queue_order = queue_order;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: u64) -> Self {
        self.progress_interval = progress_interval.max(1);
        self
    }
}
