//! Inkasso: concurrent collection batch with an asynchronous print stage
//!
//! This crate runs a batch of inkasso (collection) requests and forwards every
//! successful one to a pool of print workers that produce confirmations:
//!
//! 1. **Indexing** -- Build id-keyed lookups over contracts, bank accounts and
//!    banks once, before any parallel work starts
//! 2. **Batch Pass** -- Process contracts in parallel, run the collection for each
//!    contract with a linked account, and queue a self-contained print job on success
//! 3. **Print Pass** -- A fixed pool of worker threads drains the queue concurrently
//!    and calls the print system once per job
//! 4. **Shutdown** -- After the batch finishes the pool is stopped; workers drain
//!    everything still queued before exiting, then the final counts are checked
//!
//! # Architecture
//!
//! - **Explicit queue** -- One `WorkQueue` per run, shared by `Arc`, no global registry
//! - **Blocking waits** -- Idle workers park on a condition variable instead of polling
//! - **Parallel batch** -- rayon processes contracts on a dedicated thread pool
//! - **Atomic operations** -- Lock-free counters shared by all stages
//! - **Fail fast on bad data** -- A collected account without a bank aborts the batch
//! - **Isolated failures** -- Print failures and panics never take down sibling workers
//!
//! # Key Modules
//!
//! - [`queue`] -- Thread-safe FIFO/LIFO work queue with timed blocking pop
//! - [`index`] -- O(1) lookups over the reference data
//! - [`batch`] -- Parallel collection stage
//! - [`workers`] -- Print worker pool with drain-before-exit shutdown
//! - [`pipeline`] -- Start/stop ordering and the final `RunSummary`
//! - [`systems`] -- Collection and print system seams plus simulated implementations
//! - [`dataset`] -- Deterministic synthetic reference data
//! - [`models`] -- Core data types (Contract, BankAccount, Bank, PrintJob)
//! - [`stats`] -- Thread-safe atomic counters
//! - [`config`] -- Constants and `PipelineConfig`
//! - [`error`] -- Library error type
//!
//! # Example Usage
//!
//! ```bash
//! # Run the medium data set with 8 print workers
//! inkasso run --size medium --workers 8
//!
//! # Simulate slow systems and print the summary as JSON
//! inkasso run --collect-latency-ms 1 --print-latency-ms 5 --json
//! ```

pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod stats;
pub mod systems;
pub mod workers;

pub use error::PipelineError;
pub use pipeline::{PipelineController, RunSummary};
