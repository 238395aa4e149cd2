//! Timer Dashboard - A timer-management engine with optimistic updates
//!
//! This library keeps a collection of named stopwatches in sync with an
//! asynchronous timer store: timers tick locally once per second, persist
//! periodically, and roll back when a store call fails.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use engine::{Dashboard, DashboardEvent, EngineSettings, TimerCard};
pub use error::{DashboardError, GatewayError};
pub use services::{InMemoryGateway, TimerGateway};
pub use state::{Timer, TimerPatch};
pub use utils::signals::shutdown_signal;
