//! Timer, history and category records

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TimerError;

pub type TimerId = Uuid;

/// Category used when a timer is added without one
pub const DEFAULT_CATEGORY: &str = "General";

/// Lifecycle of a single countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A countdown timer. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: TimerId,
    pub name: String,
    pub category: String,
    pub duration: u64,
    pub remaining_time: u64,
    pub status: TimerStatus,
    #[serde(default)]
    pub halfway_alert: bool,
}

impl Timer {
    /// Seconds remaining at which the halfway alert fires
    pub fn halfway_mark(&self) -> u64 {
        self.duration / 2
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Apply a command to this timer's state machine, returning whether anything changed
    pub fn apply(&mut self, command: TimerCommand) -> bool {
        let before = (self.status, self.remaining_time);
        match command {
            TimerCommand::Start => {
                if matches!(self.status, TimerStatus::Idle | TimerStatus::Paused) {
                    self.status = TimerStatus::Running;
                }
            }
            TimerCommand::Pause => {
                if self.status == TimerStatus::Running {
                    self.status = TimerStatus::Paused;
                }
            }
            TimerCommand::Reset => {
                self.status = TimerStatus::Idle;
                self.remaining_time = self.duration;
            }
        }
        before != (self.status, self.remaining_time)
    }
}

/// Commands accepted per timer and per category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerCommand {
    Start,
    Pause,
    Reset,
}

impl FromStr for TimerCommand {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TimerCommand::Start),
            "pause" => Ok(TimerCommand::Pause),
            "reset" => Ok(TimerCommand::Reset),
            other => Err(TimerError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerCommand::Start => "start",
            TimerCommand::Pause => "pause",
            TimerCommand::Reset => "reset",
        };
        f.write_str(s)
    }
}

/// Immutable receipt written once per completed countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Id of the timer that completed
    pub id: TimerId,
    pub timer_name: String,
    pub category: String,
    pub completed_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn for_timer(timer: &Timer, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: timer.id,
            timer_name: timer.name.clone(),
            category: timer.category.clone(),
            completed_at,
        }
    }
}

/// Grouping view derived from the timers' categories; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub expanded: bool,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expanded: true,
        }
    }
}

/// Duration as typed into the add form: minutes, either numeric or text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Minutes(i64),
    Text(String),
    /// Anything else the form could send (fractions, booleans, objects)
    Other(serde_json::Value),
}

impl DurationInput {
    /// Convert to whole seconds, rejecting non-numeric and non-positive values
    pub fn to_seconds(&self) -> Result<u64, TimerError> {
        let minutes = match self {
            DurationInput::Minutes(m) => *m,
            DurationInput::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                TimerError::InvalidInput(format!("duration '{}' is not a whole number", text))
            })?,
            DurationInput::Other(value) => {
                return Err(TimerError::InvalidInput(format!(
                    "duration {} is not a whole number",
                    value
                )));
            }
        };

        if minutes <= 0 {
            return Err(TimerError::InvalidInput(format!(
                "duration must be positive, got {}",
                minutes
            )));
        }

        u64::try_from(minutes)
            .ok()
            .and_then(|m| m.checked_mul(60))
            .ok_or_else(|| TimerError::InvalidInput(format!("duration {} is too large", minutes)))
    }
}

/// Request to create a timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration: Option<DurationInput>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub halfway_alert: bool,
}

impl TimerDraft {
    /// Validate the draft and build an idle timer with a fresh id
    pub fn into_timer(self) -> Result<Timer, TimerError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TimerError::InvalidInput("timer name is required".to_string()));
        }
        let duration = self
            .duration
            .as_ref()
            .ok_or_else(|| TimerError::InvalidInput("duration is required".to_string()))?
            .to_seconds()?;
        let category = match self.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            c => c.to_string(),
        };

        Ok(Timer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category,
            duration,
            remaining_time: duration,
            status: TimerStatus::Idle,
            halfway_alert: self.halfway_alert,
        })
    }
}
