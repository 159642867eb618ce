//! Collaborator services module
//!
//! This module contains the persistence and notification collaborators the
//! timer engine writes to.

pub mod notifier;
pub mod storage;

// Re-export main types
pub use notifier::{LogNotifier, Notifier};
pub use storage::{JsonFileStore, MemoryStore, TimerStore};
