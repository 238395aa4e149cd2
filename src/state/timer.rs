//! Timer entity and partial updates

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Opaque identifier assigned by the gateway
pub type TimerId = String;

/// Maximum characters allowed in a timer name
pub const MAX_NAME_LEN: usize = 100;
/// Maximum characters allowed in a timer description
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// A named timer tracked by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: TimerId,
    pub name: String,
    pub description: String,
    /// Seconds accumulated
    pub elapsed: u64,
    pub is_running: bool,
    /// Epoch milliseconds, set once at creation
    pub created_at: i64,
    /// Epoch milliseconds of the last transition to running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
}

impl Timer {
    /// Merge the fields present in `patch` into this timer
    pub fn apply(&mut self, patch: &TimerPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(elapsed) = patch.elapsed {
            self.elapsed = elapsed;
        }
        if let Some(is_running) = patch.is_running {
            self.is_running = is_running;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
    }

    /// Copy of this timer with `patch` merged in
    pub fn merged(&self, patch: &TimerPatch) -> Self {
        let mut timer = self.clone();
        timer.apply(patch);
        timer
    }
}

/// Partial timer fields. `id` and `created_at` are immutable and never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
}

impl TimerPatch {
    pub fn running(is_running: bool) -> Self {
        Self {
            is_running: Some(is_running),
            ..Self::default()
        }
    }

    pub fn elapsed(elapsed: u64) -> Self {
        Self {
            elapsed: Some(elapsed),
            ..Self::default()
        }
    }

    pub fn details(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn with_elapsed(mut self, elapsed: u64) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn with_running(mut self, is_running: bool) -> Self {
        self.is_running = Some(is_running);
        self
    }

    pub fn with_started_at(mut self, started_at: i64) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&Timer> for TimerPatch {
    /// Every mutable field of `timer`
    fn from(timer: &Timer) -> Self {
        Self {
            name: Some(timer.name.clone()),
            description: Some(timer.description.clone()),
            elapsed: Some(timer.elapsed),
            is_running: Some(timer.is_running),
            started_at: timer.started_at,
        }
    }
}

/// Fields of a timer that does not exist yet; the gateway assigns the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimer {
    pub name: String,
    pub description: String,
    pub elapsed: u64,
    pub is_running: bool,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
}

impl NewTimer {
    /// A paused, zeroed timer created now
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            elapsed: 0,
            is_running: false,
            created_at: now_millis(),
            started_at: None,
        }
    }

    pub fn into_timer(self, id: TimerId) -> Timer {
        Timer {
            id,
            name: self.name,
            description: self.description,
            elapsed: self.elapsed,
            is_running: self.is_running,
            created_at: self.created_at,
            started_at: self.started_at,
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Check user-supplied name and description before they reach the gateway
pub fn validate_details(name: &str, description: &str) -> Result<(), DashboardError> {
    if name.trim().is_empty() {
        return Err(DashboardError::Validation(
            "timer name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DashboardError::Validation(format!(
            "timer name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DashboardError::Validation(format!(
            "timer description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Timer {
        NewTimer::new("Focus", "deep work").into_timer("t1".to_string())
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut timer = sample();
        timer.apply(&TimerPatch::running(true).with_started_at(42));

        assert!(timer.is_running);
        assert_eq!(timer.started_at, Some(42));
        assert_eq!(timer.name, "Focus");
        assert_eq!(timer.elapsed, 0);
    }

    #[test]
    fn test_full_patch_reproduces_timer() {
        let mut source = sample();
        source.elapsed = 90;
        source.name = "Renamed".to_string();

        let target = sample().merged(&TimerPatch::from(&source));
        assert_eq!(target, source);
    }

    #[test]
    fn test_validation_rejects_blank_and_oversized_fields() {
        assert!(validate_details("ok", "").is_ok());
        assert!(matches!(
            validate_details("   ", ""),
            Err(DashboardError::Validation(_))
        ));
        assert!(validate_details(&"n".repeat(MAX_NAME_LEN), "").is_ok());
        assert!(validate_details(&"n".repeat(MAX_NAME_LEN + 1), "").is_err());
        assert!(validate_details("ok", &"d".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }

    #[test]
    fn test_patch_serializes_camel_case_without_absent_fields() {
        let json = serde_json::to_value(TimerPatch::running(false).with_elapsed(5)).unwrap();
        assert_eq!(json, serde_json::json!({ "isRunning": false, "elapsed": 5 }));
    }
}
