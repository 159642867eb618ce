//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::state::{AppState, TimerCommand, TimerDraft, TimerId};
use super::responses::{
    ApiError, BulkResponse, CategoriesResponse, HealthResponse, HistoryResponse, TimerResponse,
    TimersResponse,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Handle GET /timers - List all timers
pub async fn list_timers_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimersResponse> {
    Ok(Json(TimersResponse::new(state.timers()?)))
}

/// Handle POST /timers - Add a timer
pub async fn add_timer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TimerDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<TimerResponse>), ApiError> {
    let Json(draft) = payload.map_err(|rejection| {
        warn!("Rejected new timer body: {}", rejection.body_text());
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid input: {}", rejection.body_text()),
        )
    })?;

    match state.add_timer(draft) {
        Ok(timer) => Ok((StatusCode::CREATED, Json(TimerResponse::new(timer)))),
        Err(e) => {
            warn!("Rejected new timer: {}", e);
            Err(e.into())
        }
    }
}

/// Handle POST /timers/:id/:action - Start, pause or reset one timer
pub async fn timer_action_handler(
    State(state): State<Arc<AppState>>,
    Path((id, action)): Path<(TimerId, String)>,
) -> ApiResult<TimerResponse> {
    let command: TimerCommand = action.parse()?;
    let timer = state.apply_command(id, command)?;
    Ok(Json(TimerResponse::new(timer)))
}

/// Handle GET /categories - Derived category view
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<CategoriesResponse> {
    Ok(Json(CategoriesResponse {
        timestamp: Utc::now(),
        categories: state.categories()?,
    }))
}

/// Handle POST /categories/:name/toggle - Expand or collapse a category
pub async fn toggle_category_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<CategoriesResponse> {
    if state.toggle_category(&name)?.is_none() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Category '{}' not found", name),
        ));
    }
    list_categories_handler(State(state)).await
}

/// Handle POST /categories/:name/bulk/:action - Apply a command to a whole category
pub async fn bulk_action_handler(
    State(state): State<Arc<AppState>>,
    Path((category, action)): Path<(String, String)>,
) -> ApiResult<BulkResponse> {
    let command: TimerCommand = action.parse()?;
    let changed = state.bulk_action(&category, command)?;
    let timers = state
        .timers()?
        .into_iter()
        .filter(|t| t.category == category)
        .collect();

    Ok(Json(BulkResponse {
        timestamp: Utc::now(),
        category,
        action: command,
        changed,
        timers,
    }))
}

/// Handle GET /history - Load the completion log
pub async fn history_handler(State(state): State<Arc<AppState>>) -> ApiResult<HistoryResponse> {
    match state.load_history().await {
        Ok(records) => Ok(Json(HistoryResponse {
            timestamp: Utc::now(),
            records,
        })),
        Err(e) => {
            error!("Failed to load history: {}", e);
            Err(e.into())
        }
    }
}

/// Handle DELETE /history - Clear the completion log
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<HistoryResponse> {
    if let Err(e) = state.clear_history().await {
        error!("Failed to clear history: {}", e);
        return Err(e.into());
    }
    info!("History cleared via API");
    Ok(Json(HistoryResponse {
        timestamp: Utc::now(),
        records: Vec::new(),
    }))
}

/// Handle GET /events - Stream engine events as server-sent events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe_events();
    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().json_data(&event) {
                    Ok(sse) => return Some((Ok::<_, Infallible>(sse), rx)),
                    Err(e) => warn!("Failed to encode event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.get_uptime()))
}
