//! Events broadcast to observers of the timer engine

use serde::{Deserialize, Serialize};

use super::{engine::HalfwayAlert, timer::HistoryRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    HalfwayAlert(HalfwayAlert),
    TimerCompleted(HistoryRecord),
    /// A store operation failed; in-memory state is unaffected
    PersistenceFailed { operation: String, message: String },
}
