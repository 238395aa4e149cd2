//! Dashboard-wide timer collection state and its reducer

use std::{cmp::Ordering, collections::BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Timer, TimerId, TimerPatch};

/// Which running states the display list keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    #[default]
    All,
    Running,
    Paused,
}

impl StatusFilter {
    pub fn matches(self, timer: &Timer) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Running => timer.is_running,
            StatusFilter::Paused => !timer.is_running,
        }
    }
}

/// Display ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Newest first
    #[default]
    CreatedAt,
    /// Largest first
    Elapsed,
    /// Alphabetical, ignoring case
    Name,
}

impl SortKey {
    pub fn compare(self, a: &Timer, b: &Timer) -> Ordering {
        match self {
            SortKey::CreatedAt => b.created_at.cmp(&a.created_at),
            SortKey::Elapsed => b.elapsed.cmp(&a.elapsed),
            SortKey::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
        }
    }
}

/// Collection owned by the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerListState {
    /// Insertion order from the gateway, not display order
    pub timers: Vec<Timer>,
    pub filter: StatusFilter,
    pub sort_by: SortKey,
    pub search_query: String,
    /// Always a subset of the ids in `timers`
    pub selected_ids: BTreeSet<TimerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerListAction {
    SetTimers(Vec<Timer>),
    AddTimer(Timer),
    UpdateTimer { id: TimerId, patch: TimerPatch },
    DeleteTimer(TimerId),
    DeleteSelected,
    SetFilter(StatusFilter),
    SetSort(SortKey),
    SetSearch(String),
    ToggleSelect(TimerId),
    SelectAll,
    ClearSelection,
}

/// Apply `action` to the collection
pub fn reduce(mut state: TimerListState, action: TimerListAction) -> TimerListState {
    match action {
        TimerListAction::SetTimers(timers) => {
            state.timers = timers;
            prune_selection(&mut state);
        }
        TimerListAction::AddTimer(timer) => {
            match state.timers.iter_mut().find(|t| t.id == timer.id) {
                Some(existing) => *existing = timer,
                None => state.timers.push(timer),
            }
        }
        TimerListAction::UpdateTimer { id, patch } => {
            if let Some(timer) = state.timers.iter_mut().find(|t| t.id == id) {
                timer.apply(&patch);
            }
        }
        TimerListAction::DeleteTimer(id) => {
            state.timers.retain(|t| t.id != id);
            state.selected_ids.remove(&id);
        }
        TimerListAction::DeleteSelected => {
            let selected = std::mem::take(&mut state.selected_ids);
            state.timers.retain(|t| !selected.contains(&t.id));
        }
        TimerListAction::SetFilter(filter) => state.filter = filter,
        TimerListAction::SetSort(sort_by) => state.sort_by = sort_by,
        TimerListAction::SetSearch(query) => state.search_query = query,
        TimerListAction::ToggleSelect(id) => {
            if !state.selected_ids.remove(&id) && state.timers.iter().any(|t| t.id == id) {
                state.selected_ids.insert(id);
            }
        }
        TimerListAction::SelectAll => {
            state.selected_ids = state.timers.iter().map(|t| t.id.clone()).collect();
        }
        TimerListAction::ClearSelection => state.selected_ids.clear(),
    }
    state
}

fn prune_selection(state: &mut TimerListState) {
    let timers = &state.timers;
    state
        .selected_ids
        .retain(|id| timers.iter().any(|t| &t.id == id));
}

impl TimerListState {
    pub fn get(&self, id: &str) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }

    /// Filtered, searched and sorted view of `timers`
    pub fn display_list(&self) -> Vec<&Timer> {
        let query = self.search_query.to_lowercase();
        let mut list: Vec<&Timer> = self
            .timers
            .iter()
            .filter(|t| self.filter.matches(t))
            .filter(|t| {
                query.is_empty()
                    || t.name.to_lowercase().contains(&query)
                    || t.description.to_lowercase().contains(&query)
            })
            .collect();
        list.sort_by(|a, b| self.sort_by.compare(a, b));
        list
    }

    pub fn stats(&self) -> TimerStats {
        let running = self.timers.iter().filter(|t| t.is_running).count();
        TimerStats {
            total: self.timers.len(),
            running,
            paused: self.timers.len() - running,
            total_elapsed: self.timers.iter().map(|t| t.elapsed).sum(),
        }
    }
}

/// Aggregate counters for the stats panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    pub total: usize,
    pub running: usize,
    pub paused: usize,
    pub total_elapsed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(id: &str, name: &str, elapsed: u64, is_running: bool, created_at: i64) -> Timer {
        Timer {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{} description", name),
            elapsed,
            is_running,
            created_at,
            started_at: None,
        }
    }

    fn with_timers(timers: Vec<Timer>) -> TimerListState {
        reduce(TimerListState::default(), TimerListAction::SetTimers(timers))
    }

    fn ids(list: Vec<&Timer>) -> Vec<&str> {
        list.into_iter().map(|t| t.id.as_str()).collect()
    }

    fn assert_selection_subset(state: &TimerListState) {
        for id in &state.selected_ids {
            assert!(state.get(id).is_some(), "selected id {} not in timers", id);
        }
    }

    #[test]
    fn test_add_update_delete() {
        let state = with_timers(vec![timer("1", "A", 0, false, 1)]);
        let state = reduce(state, TimerListAction::AddTimer(timer("2", "B", 0, false, 2)));
        assert_eq!(state.timers.len(), 2);

        let state = reduce(
            state,
            TimerListAction::UpdateTimer {
                id: "2".to_string(),
                patch: TimerPatch::elapsed(30),
            },
        );
        assert_eq!(state.get("2").map(|t| t.elapsed), Some(30));

        let unchanged = reduce(
            state.clone(),
            TimerListAction::UpdateTimer {
                id: "missing".to_string(),
                patch: TimerPatch::elapsed(99),
            },
        );
        assert_eq!(unchanged, state);

        let state = reduce(state, TimerListAction::DeleteTimer("1".to_string()));
        assert_eq!(ids(state.timers.iter().collect()), vec!["2"]);
    }

    #[test]
    fn test_add_timer_replaces_duplicate_id() {
        let state = with_timers(vec![timer("1", "A", 0, false, 1)]);
        let state = reduce(state, TimerListAction::AddTimer(timer("1", "A2", 5, false, 1)));
        assert_eq!(state.timers.len(), 1);
        assert_eq!(state.timers[0].name, "A2");
    }

    #[test]
    fn test_delete_timer_prunes_selection() {
        let state = with_timers(vec![timer("1", "A", 0, false, 1), timer("2", "B", 0, false, 2)]);
        let state = reduce(state, TimerListAction::SelectAll);
        let state = reduce(state, TimerListAction::DeleteTimer("1".to_string()));

        assert_eq!(state.timers.len(), 1);
        assert!(!state.selected_ids.contains("1"));
        assert!(state.selected_ids.contains("2"));

        // Deleting an unselected id leaves the rest of the selection alone
        let state = reduce(state, TimerListAction::DeleteTimer("nope".to_string()));
        assert_eq!(state.selected_ids.len(), 1);
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let state = with_timers(vec![
            timer("1", "A", 0, false, 1),
            timer("2", "B", 0, false, 2),
            timer("3", "C", 0, false, 3),
        ]);
        let state = reduce(state, TimerListAction::ToggleSelect("1".to_string()));
        let state = reduce(state, TimerListAction::ToggleSelect("3".to_string()));
        let state = reduce(state, TimerListAction::DeleteSelected);

        assert_eq!(ids(state.timers.iter().collect()), vec!["2"]);
        assert!(state.selected_ids.is_empty());
    }

    #[test]
    fn test_toggle_select_is_its_own_inverse() {
        let state = with_timers(vec![timer("1", "A", 0, false, 1), timer("2", "B", 0, false, 2)]);
        let state = reduce(state, TimerListAction::ToggleSelect("2".to_string()));
        let before = state.selected_ids.clone();

        for id in ["1", "2", "unknown"] {
            let once = reduce(state.clone(), TimerListAction::ToggleSelect(id.to_string()));
            let twice = reduce(once, TimerListAction::ToggleSelect(id.to_string()));
            assert_eq!(twice.selected_ids, before, "toggling {} twice", id);
        }
    }

    #[test]
    fn test_selection_stays_subset_of_timers() {
        let actions = vec![
            TimerListAction::SetTimers(vec![
                timer("1", "A", 0, false, 1),
                timer("2", "B", 0, true, 2),
            ]),
            TimerListAction::SelectAll,
            TimerListAction::ToggleSelect("ghost".to_string()),
            TimerListAction::SetTimers(vec![timer("2", "B", 0, true, 2)]),
            TimerListAction::AddTimer(timer("3", "C", 0, false, 3)),
            TimerListAction::ToggleSelect("3".to_string()),
            TimerListAction::DeleteTimer("3".to_string()),
            TimerListAction::SelectAll,
            TimerListAction::DeleteSelected,
            TimerListAction::ToggleSelect("2".to_string()),
            TimerListAction::ClearSelection,
        ];

        let mut state = TimerListState::default();
        for action in actions {
            state = reduce(state, action);
            assert_selection_subset(&state);
        }
    }

    #[test]
    fn test_status_filter_scenario() {
        let state = with_timers(vec![timer("A", "A", 10, false, 1), timer("B", "B", 20, true, 2)]);

        let running = reduce(state.clone(), TimerListAction::SetFilter(StatusFilter::Running));
        assert_eq!(ids(running.display_list()), vec!["B"]);

        let paused = reduce(state.clone(), TimerListAction::SetFilter(StatusFilter::Paused));
        assert_eq!(ids(paused.display_list()), vec!["A"]);

        assert_eq!(state.display_list().len(), 2);
    }

    #[test]
    fn test_search_matches_name_or_description_case_insensitively() {
        let mut meeting = timer("1", "Meeting", 0, false, 1);
        meeting.description = "Team standup".to_string();
        let state = with_timers(vec![meeting, timer("2", "Learning", 0, false, 2)]);

        let by_name = reduce(state.clone(), TimerListAction::SetSearch("MEET".to_string()));
        assert_eq!(ids(by_name.display_list()), vec!["1"]);

        let by_description =
            reduce(state.clone(), TimerListAction::SetSearch("standup".to_string()));
        assert_eq!(ids(by_description.display_list()), vec!["1"]);

        let none = reduce(state, TimerListAction::SetSearch("zzz".to_string()));
        assert!(none.display_list().is_empty());
    }

    #[test]
    fn test_sort_orders() {
        let state = with_timers(vec![
            timer("1", "beta", 50, false, 200),
            timer("2", "Alpha", 10, false, 300),
            timer("3", "gamma", 90, false, 100),
        ]);

        let by_name = reduce(state.clone(), TimerListAction::SetSort(SortKey::Name));
        assert_eq!(ids(by_name.display_list()), vec!["2", "1", "3"]);

        let by_elapsed = reduce(state.clone(), TimerListAction::SetSort(SortKey::Elapsed));
        assert_eq!(ids(by_elapsed.display_list()), vec!["3", "1", "2"]);

        let by_created = reduce(state, TimerListAction::SetSort(SortKey::CreatedAt));
        assert_eq!(ids(by_created.display_list()), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_stats() {
        let state = with_timers(vec![
            timer("1", "A", 10, true, 1),
            timer("2", "B", 20, false, 2),
            timer("3", "C", 30, false, 3),
        ]);
        assert_eq!(
            state.stats(),
            TimerStats {
                total: 3,
                running: 1,
                paused: 2,
                total_elapsed: 60,
            }
        );
    }
}
