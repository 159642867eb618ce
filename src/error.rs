//! Error types for timer commands and persistence

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by timer commands. None of them leave partial mutations behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timer {0} not found")]
    NotFound(Uuid),

    #[error("Unknown timer command '{0}'")]
    UnknownCommand(String),

    #[error("Failed to lock {0}")]
    StatePoisoned(&'static str),
}

/// Errors raised by the persistence collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read/write store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to access data directory: {0}")]
    DataDir(String),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Persistence writer is not running")]
    WriterClosed,
}
