//! State management module
//!
//! This module contains the timer records, the countdown engine and the shared
//! application state that drives it.

pub mod app_state;
pub mod engine;
pub mod events;
pub mod timer;

// Re-export main types
pub use app_state::AppState;
pub use engine::{HalfwayAlert, TickReport, TimerEngine};
pub use events::EngineEvent;
pub use timer::{
    Category, DurationInput, HistoryRecord, Timer, TimerCommand, TimerDraft, TimerId, TimerStatus,
};
