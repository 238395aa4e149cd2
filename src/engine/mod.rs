//! Ticking and reconciliation engine
//!
//! Cards own one timer each; the dashboard owns the collection and the cards.

pub mod card;
pub mod dashboard;
pub mod guard;

use std::time::Duration;

pub use card::{CardNotification, TimerCard};
pub use dashboard::{CardView, Confirmation, Dashboard, DashboardEvent, DashboardView};
pub use guard::{InFlight, Lifecycle, SequenceGuard, Ticket};

/// Timing knobs shared by every card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Time between two local ticks; one tick adds one second of elapsed time
    pub tick_period: Duration,
    /// Persist elapsed every this many ticks. Zero disables periodic flushes.
    pub flush_every: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            flush_every: 5,
        }
    }
}
