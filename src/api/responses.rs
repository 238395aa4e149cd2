//! API response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    engine::{CardView, DashboardView},
    error::DashboardError,
};

/// API response structure for dashboard-level endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub dashboard: DashboardView,
}

impl ApiResponse {
    pub fn new(status: &str, message: impl Into<String>, dashboard: DashboardView) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            dashboard,
        }
    }

    /// The request was applied (or issued, for operations still in flight)
    pub fn ok(message: impl Into<String>, dashboard: DashboardView) -> Self {
        Self::new("ok", message, dashboard)
    }

    /// Nothing to do, e.g. starting timers that are all running already
    pub fn unchanged(message: impl Into<String>, dashboard: DashboardView) -> Self {
        Self::new("unchanged", message, dashboard)
    }
}

/// Response for single-timer endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: CardView,
}

impl TimerResponse {
    pub fn ok(message: impl Into<String>, timer: CardView) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            timer,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Dashboard error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            DashboardError::UnknownTimer(_) => StatusCode::NOT_FOUND,
            DashboardError::Validation(_) | DashboardError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            DashboardError::Unmounted => StatusCode::CONFLICT,
            DashboardError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!("Request failed with {}: {}", status, self.0);
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.0.to_string(),
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}
