//! Background tasks module
//!
//! Scheduled repeating work that runs alongside the dashboard.

pub mod ticker;

// Re-export main types
pub use ticker::Ticker;
