//! Countdown engine: owns the timer collection and advances it one second per tick

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TimerError;
use super::timer::{Category, HistoryRecord, Timer, TimerCommand, TimerDraft, TimerId, TimerStatus};

/// Halfway notification produced by a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalfwayAlert {
    pub id: TimerId,
    pub name: String,
    pub remaining_time: u64,
}

impl HalfwayAlert {
    pub fn message(&self) -> String {
        format!("Halfway alert for {}", self.name)
    }
}

/// Side effects produced by one tick, applied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub alerts: Vec<HalfwayAlert>,
    pub completed: Vec<HistoryRecord>,
    /// Whether any timer's state moved
    pub changed: bool,
}

/// In-memory, authoritative timer collection
#[derive(Debug, Clone, Default)]
pub struct TimerEngine {
    timers: Vec<Timer>,
    categories: Vec<Category>,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored timers, repairing records that break the state invariants
    pub fn from_timers(stored: Vec<Timer>) -> Self {
        let mut engine = Self::new();
        for mut timer in stored {
            if timer.duration == 0 {
                warn!("Dropping stored timer {} ({}) with zero duration", timer.id, timer.name);
                continue;
            }
            if normalize(&mut timer) {
                warn!("Repaired stored timer {} ({}): now {} with {}s left",
                      timer.id, timer.name, timer.status, timer.remaining_time);
            }
            engine.track_category(&timer.category);
            engine.timers.push(timer);
        }
        engine
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }

    /// Validate a draft and append the resulting idle timer
    pub fn add(&mut self, draft: TimerDraft) -> Result<Timer, TimerError> {
        let timer = draft.into_timer()?;
        self.track_category(&timer.category);
        self.timers.push(timer.clone());
        Ok(timer)
    }

    /// Apply a command to a single timer
    pub fn apply(&mut self, id: TimerId, command: TimerCommand) -> Result<Timer, TimerError> {
        let timer = self
            .timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TimerError::NotFound(id))?;
        timer.apply(command);
        Ok(timer.clone())
    }

    /// Apply a command to every timer in `category`, returning how many changed
    pub fn bulk(&mut self, category: &str, command: TimerCommand) -> usize {
        self.timers
            .iter_mut()
            .filter(|t| t.category == category)
            .map(|t| t.apply(command))
            .filter(|changed| *changed)
            .count()
    }

    /// Flip the UI-only expanded flag; returns the new value if the category exists
    pub fn toggle_category(&mut self, name: &str) -> Option<bool> {
        let category = self.categories.iter_mut().find(|c| c.name == name)?;
        category.expanded = !category.expanded;
        Some(category.expanded)
    }

    /// Advance every running timer by one second
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for timer in self.timers.iter_mut() {
            if !timer.is_running() || timer.remaining_time == 0 {
                continue;
            }
            report.changed = true;

            let remaining = timer.remaining_time - 1;
            if timer.halfway_alert && remaining == timer.halfway_mark() {
                report.alerts.push(HalfwayAlert {
                    id: timer.id,
                    name: timer.name.clone(),
                    remaining_time: remaining,
                });
            }

            timer.remaining_time = remaining;
            if remaining == 0 {
                timer.status = TimerStatus::Completed;
                report.completed.push(HistoryRecord::for_timer(timer, now));
            }
        }

        if report.changed {
            debug!("Tick: {} alert(s), {} completion(s)", report.alerts.len(), report.completed.len());
        }
        report
    }

    fn track_category(&mut self, name: &str) {
        if !self.categories.iter().any(|c| c.name == name) {
            self.categories.push(Category::new(name));
        }
    }
}

/// Force `remaining_time` and `status` back into agreement; returns whether anything changed
fn normalize(timer: &mut Timer) -> bool {
    let before = (timer.status, timer.remaining_time);
    timer.remaining_time = timer.remaining_time.min(timer.duration);
    let status = timer.status;
    match status {
        TimerStatus::Idle => timer.remaining_time = timer.duration,
        TimerStatus::Completed => timer.remaining_time = 0,
        TimerStatus::Running | TimerStatus::Paused if timer.remaining_time == 0 => {
            timer.status = TimerStatus::Completed;
        }
        TimerStatus::Running | TimerStatus::Paused => {}
    }
    before != (timer.status, timer.remaining_time)
}
