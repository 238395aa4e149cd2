//! Error types for the timer dashboard

use thiserror::Error;

use crate::state::TimerId;

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Failure reported by a persistence gateway call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Timer not found: {0}")]
    NotFound(TimerId),

    #[error("Network failure: {0}")]
    Network(String),
}

/// Errors surfaced by the orchestration layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    /// Rejected before any gateway call was issued
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Unknown timer: {0}")]
    UnknownTimer(TimerId),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Dashboard is not mounted")]
    Unmounted,
}
