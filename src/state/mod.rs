//! State management module
//!
//! This module contains the timer entity and the pure reducers for the
//! timer collection and for individual timer cards.

pub mod timer;
pub mod card_state;
pub mod list_state;

// Re-export main types
pub use timer::{now_millis, validate_details, NewTimer, Timer, TimerId, TimerPatch};
pub use card_state::{DayProgress, ProgressLevel, TimerCardAction, TimerCardState};
pub use list_state::{SortKey, StatusFilter, TimerListAction, TimerListState, TimerStats};
