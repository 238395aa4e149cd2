//! Utility functions module
//!
//! Time formatting, lock helpers and process signal handling.

pub mod format;
pub mod signals;
pub mod sync;

// Re-export main functions
pub use format::format_time;
pub use signals::shutdown_signal;
pub use sync::lock;
