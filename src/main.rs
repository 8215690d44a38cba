use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use inkasso::config::{
    PipelineConfig, QueueOrder, COLLECT_LATENCY_MS, PRINT_LATENCY_MS, QUEUE_WAIT_MS,
};
use inkasso::dataset::{DataSet, DataSetConfig};
use inkasso::index::LookupIndex;
use inkasso::systems::{SimulatedCollection, SimulatedPrinter};
use inkasso::PipelineController;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "inkasso")]
#[command(about = "Run an inkasso batch and print confirmations through a worker pool")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv); RUST_LOG takes precedence when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a data set and run the full pipeline over it
    Run(RunArgs),
    /// Generate a data set and report its shape without running anything
    Inspect(InspectArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Size {
    Mini,
    Medium,
    Challenge,
}

#[derive(Args)]
struct DataSetArgs {
    /// Predefined data set size
    #[arg(long, value_enum, default_value_t = Size::Mini)]
    size: Size,

    /// JSON file with a custom data set config (overrides --size)
    #[arg(long)]
    dataset_config: Option<PathBuf>,
}

impl DataSetArgs {
    fn resolve(&self) -> Result<DataSetConfig> {
        if let Some(path) = &self.dataset_config {
            return DataSetConfig::from_json_file(path);
        }
        Ok(match self.size {
            Size::Mini => DataSetConfig::MINI,
            Size::Medium => DataSetConfig::MEDIUM,
            Size::Challenge => DataSetConfig::CHALLENGE,
        })
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    dataset: DataSetArgs,

    /// Number of print workers (defaults to available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Number of batch threads (defaults to available parallelism)
    #[arg(long)]
    batch_threads: Option<usize>,

    /// How long an idle print worker blocks on the queue, in milliseconds
    #[arg(long, default_value_t = QUEUE_WAIT_MS)]
    queue_wait_ms: u64,

    /// Simulated latency of each collection, in milliseconds
    #[arg(long, default_value_t = COLLECT_LATENCY_MS)]
    collect_latency_ms: u64,

    /// Simulated latency of each print, in milliseconds
    #[arg(long, default_value_t = PRINT_LATENCY_MS)]
    print_latency_ms: u64,

    /// Fail the collection for every account id divisible by N
    #[arg(long)]
    collect_fail_every: Option<u32>,

    /// Fail the print for every account id divisible by N
    #[arg(long)]
    print_fail_every: Option<u32>,

    /// Hand out the newest queued job first instead of the oldest
    #[arg(long)]
    lifo: bool,

    /// Show a progress bar for the batch pass
    #[arg(long)]
    progress: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    dataset: DataSetArgs,

    /// Include the first N contracts in the output
    #[arg(long, default_value_t = 0)]
    sample: usize,
}

#[derive(Serialize)]
struct DataSetReport<'a> {
    config: DataSetConfig,
    contracts: usize,
    accounts: usize,
    banks: usize,
    expected_inkasso: u64,
    sample: &'a [inkasso::models::Contract],
}

fn run_pipeline(args: RunArgs) -> Result<bool> {
    let dataset_config = args.dataset.resolve()?;

    let start_generate = Instant::now();
    let data = DataSet::generate(&dataset_config);
    info!(
        duration_secs = start_generate.elapsed().as_secs_f64(),
        "Data set ready"
    );

    let mut config = PipelineConfig::default()
        .with_queue_wait(Duration::from_millis(args.queue_wait_ms))
        .with_queue_order(if args.lifo {
            QueueOrder::Lifo
        } else {
            QueueOrder::Fifo
        });
    if let Some(workers) = args.workers {
        config = config.with_pool_size(workers);
    }
    if let Some(threads) = args.batch_threads {
        config = config.with_batch_threads(threads);
    }

    let collection = Arc::new(
        SimulatedCollection::new(Duration::from_millis(args.collect_latency_ms))
            .with_fail_every(args.collect_fail_every),
    );
    let printer = Arc::new(
        SimulatedPrinter::new(Duration::from_millis(args.print_latency_ms))
            .with_fail_every(args.print_fail_every),
    );

    let progress = if args.progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} inkasso",
            )
            .context("Invalid progress bar template")?,
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let controller =
        PipelineController::new(config, collection, Arc::clone(&printer)).with_progress(progress);

    println!(
        "Expecting {} inkasso & print requests",
        data.contracts_with_accounts_count()
    );
    let summary = controller
        .run_source(&data)
        .context("Failed to run inkasso pipeline")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("=== Summary ===");
        println!("Inkasso count:        {}", summary.attempted);
        println!("Print requests count: {}", summary.enqueued);
        println!("Print count:          {}", printer.print_count());
        println!("Collection failures:  {}", summary.collection_failures);
        println!("Print failures:       {}", summary.print_failures);
        println!("Task completed in {} ms", summary.elapsed_ms);
    }

    for warning in summary.warnings() {
        eprintln!("Warning: {warning}");
    }

    Ok(summary.aborted.is_none())
}

fn inspect(args: InspectArgs) -> Result<bool> {
    let config = args.dataset.resolve()?;
    let data = DataSet::generate(&config);
    let index = LookupIndex::build(data.contracts(), data.accounts(), data.banks());
    let (contracts, accounts, banks) = index.stats();

    let report = DataSetReport {
        config,
        contracts,
        accounts,
        banks,
        expected_inkasso: index.contracts_with_accounts(data.contracts()),
        sample: &data.contracts()[..args.sample.min(data.contracts().len())],
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(true)
}

/// Default log directive for `-v` repetitions when RUST_LOG is unset.
fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_directive(cli.verbose)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Run(args) => run_pipeline(args),
        Commands::Inspect(args) => inspect(args),
    };

    match result {
        Ok(true) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
