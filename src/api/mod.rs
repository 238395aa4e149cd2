//! HTTP API module
//!
//! This module exposes the dashboard over HTTP as JSON endpoints.

pub mod handlers;
pub mod responses;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::Dashboard;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(dashboard: Dashboard) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/dashboard/refresh", post(refresh_dashboard_handler))
        .route("/dashboard/view", put(view_handler))
        .route("/dashboard/error", delete(dismiss_error_handler))
        .route("/timers", post(create_timer_handler))
        .route("/timers/:id", get(get_timer_handler))
        .route("/timers/:id/start", post(start_timer_handler))
        .route("/timers/:id/pause", post(pause_timer_handler))
        .route("/timers/:id/reset", post(reset_timer_handler))
        .route("/timers/:id/refresh", post(refresh_timer_handler))
        .route("/timers/:id/edit", post(begin_edit_handler).put(edit_draft_handler))
        .route("/timers/:id/edit/save", post(save_edit_handler))
        .route("/timers/:id/edit/cancel", post(cancel_edit_handler))
        .route("/timers/:id/delete", post(delete_timer_handler))
        .route("/timers/:id/delete/cancel", post(cancel_delete_handler))
        .route("/timers/:id/select", post(toggle_select_handler))
        .route("/selection", delete(clear_selection_handler))
        .route("/selection/all", post(select_all_handler))
        .route("/bulk/start", post(start_all_handler))
        .route("/bulk/pause", post(pause_all_handler))
        .route("/bulk/reset", post(reset_all_handler))
        .route("/bulk/delete", post(delete_selected_handler))
        .route(
            "/confirmation",
            post(confirm_handler).delete(cancel_confirmation_handler),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(dashboard)
}
