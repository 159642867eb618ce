//! Timer Deck - A state-managed countdown timer server
//!
//! This library provides a per-second countdown engine for categorized timers,
//! with halfway alerts, a persisted completion log and an HTTP control surface.

pub mod config;
pub mod error;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{StoreError, TimerError};
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
