//! HTTP endpoint handlers
//!
//! Timer operations wait for their gateway call to settle so the response
//! shows the reconciled card, including any rollback.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use super::responses::{ApiError, ApiResponse, HealthResponse, TimerResponse};
use crate::{
    engine::{Dashboard, InFlight},
    state::{SortKey, StatusFilter},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct CreateTimerRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Draft changes while a card is being edited
#[derive(Debug, Default, Deserialize)]
pub struct EditRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRequest {
    pub filter: Option<StatusFilter>,
    pub sort_by: Option<SortKey>,
    pub search: Option<String>,
}

/// Wait for an issued operation; `false` when nothing was issued
async fn settle(op: Option<InFlight>) -> bool {
    match op {
        Some(op) => {
            op.settled().await;
            true
        }
        None => false,
    }
}

fn timer_response(dashboard: &Dashboard, id: &str, message: &str) -> ApiResult<TimerResponse> {
    Ok(Json(TimerResponse::ok(message, dashboard.card_view(id)?)))
}

fn dashboard_response(dashboard: &Dashboard, issued: bool, message: &str) -> Json<ApiResponse> {
    if issued {
        Json(ApiResponse::ok(message, dashboard.view()))
    } else {
        Json(ApiResponse::unchanged("Nothing to do", dashboard.view()))
    }
}

/// Handle GET /health - Health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /dashboard - Full dashboard view
pub async fn dashboard_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    Json(ApiResponse::ok("Dashboard", dashboard.view()))
}

/// Handle POST /dashboard/refresh - Reload every timer from the store
pub async fn refresh_dashboard_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    dashboard.refresh().await;
    Json(ApiResponse::ok("Timers reloaded", dashboard.view()))
}

/// Handle PUT /dashboard/view - Change filter, sort or search
pub async fn view_handler(
    State(dashboard): State<Dashboard>,
    Json(request): Json<ViewRequest>,
) -> Json<ApiResponse> {
    if let Some(filter) = request.filter {
        dashboard.set_filter(filter);
    }
    if let Some(sort_by) = request.sort_by {
        dashboard.set_sort(sort_by);
    }
    if let Some(search) = request.search {
        dashboard.set_search(search);
    }
    Json(ApiResponse::ok("View updated", dashboard.view()))
}

/// Handle DELETE /dashboard/error - Dismiss the error banner
pub async fn dismiss_error_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    dashboard.dismiss_error();
    Json(ApiResponse::ok("Error dismissed", dashboard.view()))
}

/// Handle POST /timers - Create a timer
pub async fn create_timer_handler(
    State(dashboard): State<Dashboard>,
    Json(request): Json<CreateTimerRequest>,
) -> Result<(StatusCode, Json<TimerResponse>), ApiError> {
    let timer = dashboard
        .create_timer(&request.name, &request.description)
        .await?;
    let view = dashboard.card_view(&timer.id)?;
    Ok((StatusCode::CREATED, Json(TimerResponse::ok("Timer created", view))))
}

/// Handle GET /timers/:id - One card
pub async fn get_timer_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    timer_response(&dashboard, &id, "Timer")
}

/// Handle POST /timers/:id/start
pub async fn start_timer_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    let issued = settle(dashboard.card(&id)?.start()).await;
    timer_response(&dashboard, &id, if issued { "Timer started" } else { "Timer already running" })
}

/// Handle POST /timers/:id/pause
pub async fn pause_timer_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    let issued = settle(dashboard.card(&id)?.pause()).await;
    timer_response(&dashboard, &id, if issued { "Timer paused" } else { "Timer already paused" })
}

/// Handle POST /timers/:id/reset
pub async fn reset_timer_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    settle(dashboard.card(&id)?.reset()).await;
    timer_response(&dashboard, &id, "Timer reset")
}

/// Handle POST /timers/:id/refresh - Re-read one timer from the store
pub async fn refresh_timer_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    settle(dashboard.card(&id)?.refresh()).await;
    timer_response(&dashboard, &id, "Timer refreshed")
}

/// Handle POST /timers/:id/edit - Open the edit form
pub async fn begin_edit_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    dashboard.card(&id)?.begin_edit();
    timer_response(&dashboard, &id, "Editing")
}

/// Handle PUT /timers/:id/edit - Change the drafts
pub async fn edit_draft_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
    Json(request): Json<EditRequest>,
) -> ApiResult<TimerResponse> {
    let card = dashboard.card(&id)?;
    if let Some(name) = request.name {
        card.edit_name(name)?;
    }
    if let Some(description) = request.description {
        card.edit_description(description)?;
    }
    timer_response(&dashboard, &id, "Draft updated")
}

/// Handle POST /timers/:id/edit/save
pub async fn save_edit_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    dashboard.card(&id)?.save()?.settled().await;
    timer_response(&dashboard, &id, "Edits saved")
}

/// Handle POST /timers/:id/edit/cancel
pub async fn cancel_edit_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    dashboard.card(&id)?.cancel_edit();
    timer_response(&dashboard, &id, "Edits discarded")
}

/// Handle POST /timers/:id/delete - Show the confirmation, or delete if it is showing
pub async fn delete_timer_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    match dashboard.confirm_delete(&id)? {
        Some(op) => {
            info!("Delete confirmed for timer {}", id);
            op.settled().await;
            Ok(Json(ApiResponse::ok("Delete issued", dashboard.view())))
        }
        None => Ok(Json(ApiResponse::ok("Confirm to delete", dashboard.view()))),
    }
}

/// Handle POST /timers/:id/delete/cancel
pub async fn cancel_delete_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    dashboard.card(&id)?.cancel_delete();
    timer_response(&dashboard, &id, "Delete cancelled")
}

/// Handle POST /timers/:id/select - Toggle selection
pub async fn toggle_select_handler(
    State(dashboard): State<Dashboard>,
    Path(id): Path<String>,
) -> ApiResult<TimerResponse> {
    dashboard.card(&id)?;
    dashboard.toggle_select(&id);
    timer_response(&dashboard, &id, "Selection toggled")
}

/// Handle POST /selection/all
pub async fn select_all_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    dashboard.select_all();
    Json(ApiResponse::ok("All timers selected", dashboard.view()))
}

/// Handle DELETE /selection
pub async fn clear_selection_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    dashboard.clear_selection();
    Json(ApiResponse::ok("Selection cleared", dashboard.view()))
}

/// Handle POST /bulk/start
pub async fn start_all_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    let issued = settle(dashboard.start_all()).await;
    dashboard_response(&dashboard, issued, "Timers started")
}

/// Handle POST /bulk/pause
pub async fn pause_all_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    let issued = settle(dashboard.pause_all()).await;
    dashboard_response(&dashboard, issued, "Timers paused")
}

/// Handle POST /bulk/reset - Ask to confirm resetting every timer
pub async fn reset_all_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    let requested = dashboard.request_reset_all().is_some();
    dashboard_response(&dashboard, requested, "Confirm to reset all timers")
}

/// Handle POST /bulk/delete - Ask to confirm deleting the selection
pub async fn delete_selected_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    let requested = dashboard.request_delete_selected().is_some();
    dashboard_response(&dashboard, requested, "Confirm to delete selected timers")
}

/// Handle POST /confirmation - Run the pending bulk operation
pub async fn confirm_handler(State(dashboard): State<Dashboard>) -> ApiResult<ApiResponse> {
    let issued = settle(dashboard.confirm_pending()?).await;
    Ok(dashboard_response(&dashboard, issued, "Confirmed"))
}

/// Handle DELETE /confirmation
pub async fn cancel_confirmation_handler(State(dashboard): State<Dashboard>) -> Json<ApiResponse> {
    dashboard.cancel_pending();
    Json(ApiResponse::ok("Confirmation cancelled", dashboard.view()))
}
