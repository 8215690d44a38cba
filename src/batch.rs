use crate::config::PROGRESS_INTERVAL;
use crate::error::{PipelineError, Result};
use crate::index::LookupIndex;
use crate::models::{Contract, PrintJob};
use crate::queue::WorkQueue;
use crate::stats::PipelineStats;
use crate::systems::CollectionSystem;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Counts produced by one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub attempted: u64,
    pub enqueued: u64,
}

/// Runs the collection for every contract with a linked account and queues a
/// print job for each successful one.
pub struct BatchProcessor<C> {
    collection: Arc<C>,
    queue: Arc<WorkQueue<PrintJob>>,
    stats: Arc<PipelineStats>,
    threads: usize,
    progress_interval: u64,
    progress: ProgressBar,
}

impl<C: CollectionSystem> BatchProcessor<C> {
    pub fn new(
        collection: Arc<C>,
        queue: Arc<WorkQueue<PrintJob>>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            collection,
            queue,
            stats,
            threads: crate::config::default_parallelism(),
            progress_interval: PROGRESS_INTERVAL,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Advanced once per collection attempt.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Processes all contracts on a dedicated rayon pool.
    ///
    /// A collected account whose bank is missing aborts the whole batch: no
    /// further contracts are started and the error is returned. Jobs queued
    /// before the abort stay in the queue.
    pub fn run(&self, contracts: &[Contract], index: &LookupIndex) -> Result<BatchOutcome> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("inkasso-batch-{i}"))
            .build()?;

        let attempted_before = self.stats.attempted();
        let enqueued_before = self.stats.enqueued();
        let aborted = AtomicBool::new(false);

        info!(
            contracts = contracts.len(),
            threads = self.threads,
            "Starting inkasso batch"
        );

        let result = pool.install(|| {
            contracts
                .par_iter()
                .try_for_each(|contract| self.process_contract(contract, index, &aborted))
        });

        self.progress.finish_and_clear();

        let outcome = BatchOutcome {
            attempted: self.stats.attempted() - attempted_before,
            enqueued: self.stats.enqueued() - enqueued_before,
        };

        match result {
            Ok(()) => {
                info!(
                    attempted = outcome.attempted,
                    enqueued = outcome.enqueued,
                    "Inkasso batch complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(
                    error = %e,
                    attempted = outcome.attempted,
                    enqueued = outcome.enqueued,
                    "Inkasso batch aborted, reference data is inconsistent"
                );
                Err(e)
            }
        }
    }

    fn process_contract(
        &self,
        contract: &Contract,
        index: &LookupIndex,
        aborted: &AtomicBool,
    ) -> Result<()> {
        if aborted.load(Ordering::Acquire) {
            return Ok(());
        }

        let Some(account) = index.account_for(contract) else {
            debug!(contract = contract.id, "No bank account for contract");
            self.stats.inc_without_account();
            return Ok(());
        };

        let attempt = self.stats.inc_attempted();
        let collected = self.collection.collect(account);
        self.progress.inc(1);
        if attempt % self.progress_interval == 0 {
            info!(completed = attempt, "Current state of inkasso tasks");
        }

        if !collected {
            debug!(account = %account.number, "Inkasso failed");
            self.stats.inc_collection_failures();
            return Ok(());
        }

        let Some(bank) = index.bank_by_id(account.bank_id) else {
            aborted.store(true, Ordering::Release);
            return Err(PipelineError::MissingBank {
                account_number: account.number.clone(),
                bank_id: account.bank_id,
            });
        };

        self.stats.inc_print_requests();
        self.queue.push(PrintJob::new(bank, account, contract));
        Ok(())
    }
}
