use crate::batch::BatchProcessor;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::index::{LookupIndex, Snapshot};
use crate::models::{Bank, BankAccount, Contract, PrintJob};
use crate::queue::WorkQueue;
use crate::stats::PipelineStats;
use crate::systems::{CollectionSystem, PrintSystem};
use crate::workers::WorkerPool;
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Final counts of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub attempted: u64,
    pub enqueued: u64,
    pub printed: u64,
    pub print_failures: u64,
    pub collection_failures: u64,
    pub without_account: u64,
    /// Contracts whose linked account exists, i.e. the expected attempt count.
    pub expected: u64,
    pub elapsed_ms: u64,
    /// Set when the batch stopped on inconsistent reference data.
    pub aborted: Option<String>,
}

impl RunSummary {
    /// Human-readable description of every broken invariant. Empty on a clean run.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(reason) = &self.aborted {
            warnings.push(format!("Inkasso batch aborted: {reason}"));
        }
        if self.enqueued != self.printed {
            warnings.push(format!(
                "Print requests ({}) and printed confirmations ({}) differ",
                self.enqueued, self.printed
            ));
        }
        if self.attempted != self.expected {
            warnings.push(format!(
                "Inkasso count ({}) does not match expected ({})",
                self.attempted, self.expected
            ));
        }
        warnings
    }

    pub fn is_consistent(&self) -> bool {
        self.warnings().is_empty()
    }
}

/// Wires the batch stage to the print pool and owns their start/stop order.
pub struct PipelineController<C, P> {
    config: PipelineConfig,
    collection: Arc<C>,
    printer: Arc<P>,
    progress: ProgressBar,
}

impl<C, P> PipelineController<C, P>
where
    C: CollectionSystem,
    P: PrintSystem + 'static,
{
    pub fn new(config: PipelineConfig, collection: Arc<C>, printer: Arc<P>) -> Self {
        Self {
            config,
            collection,
            printer,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Snapshots the source once, then runs as [`PipelineController::run`].
    pub fn run_source<S>(&self, source: &S) -> Result<RunSummary>
    where
        S: Snapshot<Contract> + Snapshot<BankAccount> + Snapshot<Bank>,
    {
        let contracts: Vec<Contract> = source.snapshot_all();
        let accounts: Vec<BankAccount> = source.snapshot_all();
        let banks: Vec<Bank> = source.snapshot_all();
        self.run(&contracts, &accounts, &banks)
    }

    /// Runs the whole pipeline to completion.
    ///
    /// An aborted batch is reported through [`RunSummary::aborted`]; the print
    /// pool is still drained first. Only failing to start the pools is an
    /// error.
    pub fn run(
        &self,
        contracts: &[Contract],
        accounts: &[BankAccount],
        banks: &[Bank],
    ) -> Result<RunSummary> {
        let start = Instant::now();

        let index = LookupIndex::build(contracts, accounts, banks);
        let expected = index.contracts_with_accounts(contracts);
        info!(expected, "Expecting inkasso & print requests");
        self.progress.set_length(expected);

        let queue: Arc<WorkQueue<PrintJob>> =
            Arc::new(WorkQueue::with_order(self.config.queue_order));
        let stats = Arc::new(PipelineStats::new());

        let mut pool = WorkerPool::start(
            self.config.pool_size,
            Arc::clone(&queue),
            Arc::clone(&self.printer),
            Arc::clone(&stats),
            self.config.queue_wait,
        )?;

        let batch = BatchProcessor::new(
            Arc::clone(&self.collection),
            Arc::clone(&queue),
            Arc::clone(&stats),
        )
        .with_threads(self.config.batch_threads)
        .with_progress_interval(self.config.progress_interval)
        .with_progress(self.progress.clone());

        let batch_result = batch.run(contracts, &index);

        info!(pending = queue.len(), "Batch finished, draining print queue");
        pool.stop();

        let aborted = match batch_result {
            Ok(_) => None,
            Err(e @ PipelineError::MissingBank { .. }) => Some(e.to_string()),
            Err(e) => return Err(e),
        };

        let summary = RunSummary {
            attempted: stats.attempted(),
            enqueued: stats.enqueued(),
            printed: stats.printed(),
            print_failures: stats.print_failures(),
            collection_failures: stats.collection_failures(),
            without_account: stats.without_account(),
            expected,
            elapsed_ms: start.elapsed().as_millis() as u64,
            aborted,
        };

        for warning in summary.warnings() {
            warn!("{}", warning);
        }

        info!(
            attempted = summary.attempted,
            enqueued = summary.enqueued,
            printed = summary.printed,
            elapsed_ms = summary.elapsed_ms,
            "Pipeline complete"
        );

        Ok(summary)
    }
}
