//! Per-card UI state and its reducer

use serde::{Deserialize, Serialize};

use super::{Timer, TimerPatch};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Local state of one timer card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCardState {
    /// Working copy, may be ahead of the gateway between flushes
    pub timer: Timer,
    pub is_editing: bool,
    pub is_deleting: bool,
    pub show_confirm: bool,
}

impl TimerCardState {
    pub fn new(timer: Timer) -> Self {
        Self {
            timer,
            is_editing: false,
            is_deleting: false,
            show_confirm: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCardAction {
    UpdateTimer(TimerPatch),
    StartEditing,
    CancelEditing,
    SaveEdits(TimerPatch),
    ShowDeleteConfirm,
    CancelDelete,
    ConfirmDelete,
    /// The gateway refused the delete; the card returns to its idle display
    DeleteFailed,
}

/// Apply `action` to a card state
pub fn reduce(mut state: TimerCardState, action: TimerCardAction) -> TimerCardState {
    match action {
        TimerCardAction::UpdateTimer(patch) => state.timer.apply(&patch),
        TimerCardAction::StartEditing => state.is_editing = true,
        TimerCardAction::CancelEditing => state.is_editing = false,
        TimerCardAction::SaveEdits(patch) => {
            state.timer.apply(&patch);
            state.is_editing = false;
        }
        TimerCardAction::ShowDeleteConfirm => state.show_confirm = true,
        TimerCardAction::CancelDelete => state.show_confirm = false,
        TimerCardAction::ConfirmDelete => state.is_deleting = true,
        TimerCardAction::DeleteFailed => {
            state.is_deleting = false;
            state.show_confirm = false;
        }
    }
    state
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressLevel {
    Low,
    Medium,
    High,
}

/// Share of a day that a timer has accumulated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayProgress {
    /// Capped at 100
    pub percent: f64,
    pub level: ProgressLevel,
}

impl DayProgress {
    pub fn of(elapsed: u64) -> Self {
        let percent = elapsed as f64 / SECONDS_PER_DAY * 100.0;
        let level = if percent > 50.0 {
            ProgressLevel::High
        } else if percent > 25.0 {
            ProgressLevel::Medium
        } else {
            ProgressLevel::Low
        };
        Self {
            percent: percent.min(100.0),
            level,
        }
    }
}
