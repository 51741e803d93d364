//! Error types for the specter-scan crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No usable network interface found")]
    NoInterface,

    #[error("Datalink channel error: {0}")]
    Channel(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Store error: {0}")]
    Store(#[from] specter_store::StoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
