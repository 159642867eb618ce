//! Background tasks module
//!
//! This module contains the countdown ticker and the persistence writer that
//! run alongside the HTTP server.

pub mod persistence_writer;
pub mod ticker;

// Re-export main types
pub use persistence_writer::{PersistenceWriter, StoreCommand};
pub use ticker::{spawn_ticker, TickerHandle};
