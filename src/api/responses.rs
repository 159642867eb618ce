//! API response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{StoreError, TimerError},
    state::{Category, HistoryRecord, Timer, TimerCommand},
};

/// Timer collection response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimersResponse {
    pub timestamp: DateTime<Utc>,
    pub timers: Vec<Timer>,
}

impl TimersResponse {
    pub fn new(timers: Vec<Timer>) -> Self {
        Self { timestamp: Utc::now(), timers }
    }
}

/// Single timer response for add and per-timer commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub timestamp: DateTime<Utc>,
    pub timer: Timer,
}

impl TimerResponse {
    pub fn new(timer: Timer) -> Self {
        Self { timestamp: Utc::now(), timer }
    }
}

/// Result of a command fanned out across a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResponse {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub action: TimerCommand,
    pub changed: usize,
    pub timers: Vec<Timer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub timestamp: DateTime<Utc>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub timestamp: DateTime<Utc>,
    pub records: Vec<HistoryRecord>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
}

impl HealthResponse {
    pub fn ok(uptime: String) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime,
        }
    }
}

/// Error body returned with a non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl From<TimerError> for ApiError {
    fn from(e: TimerError) -> Self {
        let status = match e {
            TimerError::InvalidInput(_) | TimerError::UnknownCommand(_) => StatusCode::BAD_REQUEST,
            TimerError::NotFound(_) => StatusCode::NOT_FOUND,
            TimerError::StatePoisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match e {
            StoreError::WriterClosed | StoreError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}
