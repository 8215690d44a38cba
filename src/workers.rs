use crate::error::Result;
use crate::models::PrintJob;
use crate::queue::WorkQueue;
use crate::stats::PipelineStats;
use crate::systems::PrintSystem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// State shared by all workers of one pool.
struct Shared<P> {
    queue: Arc<WorkQueue<PrintJob>>,
    printer: Arc<P>,
    stats: Arc<PipelineStats>,
    stop: AtomicBool,
    active: AtomicUsize,
    wait: Duration,
}

/// Fixed-size pool of print workers draining a shared queue.
///
/// Workers only exit once stop was requested *and* the queue is empty, so
/// every job pushed before [`WorkerPool::stop`] returns gets printed.
pub struct WorkerPool<P> {
    shared: Arc<Shared<P>>,
    handles: Vec<JoinHandle<()>>,
}

impl<P: PrintSystem + 'static> WorkerPool<P> {
    pub fn start(
        pool_size: usize,
        queue: Arc<WorkQueue<PrintJob>>,
        printer: Arc<P>,
        stats: Arc<PipelineStats>,
        wait: Duration,
    ) -> Result<Self> {
        let pool_size = pool_size.max(1);
        let shared = Arc::new(Shared {
            queue,
            printer,
            stats,
            stop: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            wait,
        });

        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(pool_size),
        };

        for worker_id in 0..pool_size {
            let shared = Arc::clone(&pool.shared);
            shared.active.fetch_add(1, Ordering::AcqRel);
            let spawned = thread::Builder::new()
                .name(format!("print-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &shared));

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    pool.shared.active.fetch_sub(1, Ordering::AcqRel);
                    // Drain with the workers that did start before reporting.
                    pool.stop();
                    return Err(e.into());
                }
            }
        }

        info!(workers = pool_size, "Print worker pool started");
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Workers that have not yet exited.
    pub fn active_workers(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }
}

impl<P> WorkerPool<P> {
    /// Requests shutdown and blocks until every worker has drained the queue
    /// and exited.
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.shared.stop.store(true, Ordering::Release);
        self.shared.queue.wake_all();

        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("print-worker").to_string();
            if handle.join().is_err() {
                error!(worker = %name, "Print worker terminated by panic");
            }
        }

        debug!(
            printed = self.shared.stats.printed(),
            failed = self.shared.stats.print_failures(),
            "Print worker pool stopped"
        );
    }
}

impl<P> Drop for WorkerPool<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decrements the live-worker count however the worker leaves its loop.
struct ExitGuard<'a> {
    worker_id: usize,
    active: &'a AtomicUsize,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        debug!(worker = self.worker_id, "Print worker exited");
    }
}

fn worker_loop<P: PrintSystem>(worker_id: usize, shared: &Shared<P>) {
    let _guard = ExitGuard {
        worker_id,
        active: &shared.active,
    };

    loop {
        if let Some(job) = shared.queue.pop_wait(shared.wait) {
            print_job(worker_id, shared, &job);
            continue;
        }

        if shared.stop.load(Ordering::Acquire) {
            // One more poll so a push racing with the stop signal is not lost.
            match shared.queue.pop() {
                Some(job) => print_job(worker_id, shared, &job),
                None => break,
            }
        }
    }
}

fn print_job<P: PrintSystem>(worker_id: usize, shared: &Shared<P>, job: &PrintJob) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        shared
            .printer
            .print_confirmation(&job.bank_name, &job.account, &job.holder_name)
    }));

    match outcome {
        Ok(true) => shared.stats.inc_printed(),
        Ok(false) => {
            warn!(
                bank = %job.bank_name,
                account = %job.account.number,
                holder = %job.holder_name,
                "Could not print confirmation"
            );
            shared.stats.inc_print_failures();
        }
        Err(_) => {
            error!(
                worker = worker_id,
                account = %job.account.number,
                "Print system panicked, job counted as failed"
            );
            shared.stats.inc_print_failures();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BankAccount;
    use parking_lot::Mutex;
    use std::time::Instant;

    fn job(id: u32) -> PrintJob {
        PrintJob {
            bank_name: format!("Bank {}", id % 3),
            account: BankAccount {
                id,
                bank_id: id % 3,
                number: format!("ACC-{id}"),
            },
            holder_name: format!("Holder {id}"),
        }
    }

    type Recorder = Arc<Mutex<Vec<u32>>>;

    fn recording_printer() -> (impl PrintSystem + 'static, Recorder) {
        let seen: Recorder = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let printer = move |_: &str, account: &BankAccount, _: &str| {
            sink.lock().push(account.id);
            true
        };
        (printer, seen)
    }

    #[test]
    fn drains_pending_jobs_on_stop() {
        let queue = Arc::new(WorkQueue::new());
        for id in 0..250 {
            queue.push(job(id));
        }
        let stats = Arc::new(PipelineStats::new());
        let (printer, seen) = recording_printer();

        let mut pool = WorkerPool::start(
            4,
            Arc::clone(&queue),
            Arc::new(printer),
            Arc::clone(&stats),
            Duration::from_millis(20),
        )
        .unwrap();
        pool.stop();

        let mut ids = seen.lock().clone();
        ids.sort_unstable();
        assert_eq!(ids, (0..250).collect::<Vec<_>>());
        assert_eq!(stats.printed(), 250);
        assert!(queue.is_empty());
        assert_eq!(pool.active_workers(), 0);
    }

    #[test]
    fn print_failures_are_counted_not_retried() {
        let queue = Arc::new(WorkQueue::new());
        for id in 0..10 {
            queue.push(job(id));
        }
        let stats = Arc::new(PipelineStats::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let printer = move |_: &str, account: &BankAccount, _: &str| {
            counter.fetch_add(1, Ordering::Relaxed);
            account.id % 2 == 0
        };

        let mut pool = WorkerPool::start(
            2,
            Arc::clone(&queue),
            Arc::new(printer),
            Arc::clone(&stats),
            Duration::from_millis(20),
        )
        .unwrap();
        pool.stop();

        assert_eq!(calls.load(Ordering::Relaxed), 10);
        assert_eq!(stats.printed(), 5);
        assert_eq!(stats.print_failures(), 5);
    }

    #[test]
    fn panicking_printer_does_not_kill_pool() {
        let queue = Arc::new(WorkQueue::new());
        for id in 0..20 {
            queue.push(job(id));
        }
        let stats = Arc::new(PipelineStats::new());
        let printer = |_: &str, account: &BankAccount, _: &str| {
            if account.id == 7 {
                panic!("printer jammed");
            }
            true
        };

        let mut pool = WorkerPool::start(
            3,
            Arc::clone(&queue),
            Arc::new(printer),
            Arc::clone(&stats),
            Duration::from_millis(20),
        )
        .unwrap();
        pool.stop();

        assert_eq!(stats.printed(), 19);
        assert_eq!(stats.print_failures(), 1);
        assert_eq!(pool.active_workers(), 0);
    }

    #[test]
    fn dropping_pool_drains_pending_jobs() {
        let queue = Arc::new(WorkQueue::new());
        for id in 0..120 {
            queue.push(job(id));
        }
        let stats = Arc::new(PipelineStats::new());
        let (printer, seen) = recording_printer();

        let pool = WorkerPool::start(
            3,
            Arc::clone(&queue),
            Arc::new(printer),
            Arc::clone(&stats),
            Duration::from_millis(20),
        )
        .unwrap();
        drop(pool);

        assert_eq!(seen.lock().len(), 120);
        assert_eq!(stats.printed(), 120);
        assert!(queue.is_empty());
    }

    #[test]
    fn stop_twice_is_a_no_op() {
        let queue: Arc<WorkQueue<PrintJob>> = Arc::new(WorkQueue::new());
        let (printer, _) = recording_printer();
        let mut pool = WorkerPool::start(
            2,
            queue,
            Arc::new(printer),
            Arc::new(PipelineStats::new()),
            Duration::from_millis(20),
        )
        .unwrap();

        pool.stop();
        pool.stop();
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.active_workers(), 0);
    }

    #[test]
    fn idle_pool_stops_promptly() {
        let queue: Arc<WorkQueue<PrintJob>> = Arc::new(WorkQueue::new());
        let stats = Arc::new(PipelineStats::new());
        let (printer, _) = recording_printer();

        let mut pool = WorkerPool::start(
            4,
            queue,
            Arc::new(printer),
            stats,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(pool.size(), 4);

        let start = Instant::now();
        pool.stop();
        // Bounded by one wait interval even if a worker missed the wake-up.
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(pool.active_workers(), 0);
    }

    #[test]
    fn consumes_jobs_pushed_while_running() {
        let queue = Arc::new(WorkQueue::new());
        let stats = Arc::new(PipelineStats::new());
        let (printer, seen) = recording_printer();

        let mut pool = WorkerPool::start(
            3,
            Arc::clone(&queue),
            Arc::new(printer),
            Arc::clone(&stats),
            Duration::from_millis(10),
        )
        .unwrap();

        for id in 0..100 {
            queue.push(job(id));
            if id % 10 == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
        pool.stop();

        assert_eq!(seen.lock().len(), 100);
        assert_eq!(stats.printed(), 100);
    }
}
