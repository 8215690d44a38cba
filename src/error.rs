use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A collected account points at a bank that is not in the reference data.
    #[error("no bank {bank_id} found for account {account_number}")]
    MissingBank { account_number: String, bank_id: u32 },

    #[error("failed to spawn print worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to build batch thread pool: {0}")]
    BatchPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
