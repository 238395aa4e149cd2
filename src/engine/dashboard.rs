//! Dashboard orchestration: collection ownership, loading and bulk operations

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::{
    future::join_all,
    stream::{FuturesUnordered, StreamExt},
};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{
    card::{CardNotification, TimerCard},
    guard::{InFlight, Lifecycle, SequenceGuard, Ticket},
    EngineSettings,
};
use crate::{
    error::{DashboardError, GatewayError, Result},
    services::TimerGateway,
    state::{
        list_state, now_millis, validate_details, DayProgress, NewTimer, SortKey, StatusFilter,
        Timer, TimerCardState, TimerId, TimerListAction, TimerListState, TimerPatch, TimerStats,
    },
    utils::{format_time, lock},
};

/// Notification from the dashboard to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum DashboardEvent {
    TimerUpdated(Timer),
    TimerDeleted(TimerId),
    OperationFailed(String),
}

/// A destructive bulk operation waiting for the user to confirm it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Confirmation {
    ResetAll { count: usize },
    DeleteSelected { count: usize },
}

#[derive(Debug, Clone, Copy)]
enum BulkOperation {
    Start,
    Pause,
    Reset,
}

impl BulkOperation {
    fn verb(self) -> &'static str {
        match self {
            BulkOperation::Start => "start",
            BulkOperation::Pause => "pause",
            BulkOperation::Reset => "reset",
        }
    }

    /// Timers already in the target state are skipped
    fn applies_to(self, timer: &Timer) -> bool {
        match self {
            BulkOperation::Start => !timer.is_running,
            BulkOperation::Pause => timer.is_running,
            BulkOperation::Reset => timer.is_running || timer.elapsed > 0,
        }
    }

    fn patch(self, timer: &Timer) -> TimerPatch {
        match self {
            BulkOperation::Start => TimerPatch::running(true).with_started_at(now_millis()),
            BulkOperation::Pause => TimerPatch::running(false).with_elapsed(timer.elapsed),
            BulkOperation::Reset => TimerPatch::elapsed(0).with_running(false),
        }
    }
}

#[derive(Debug, Default)]
struct DashboardStatus {
    is_loading: bool,
    is_creating: bool,
    error: Option<String>,
    pending: Option<Confirmation>,
}

/// One displayed card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    #[serde(flatten)]
    pub state: TimerCardState,
    pub formatted_elapsed: String,
    pub progress: DayProgress,
    pub is_selected: bool,
}

impl CardView {
    fn new(state: TimerCardState, is_selected: bool) -> Self {
        Self {
            formatted_elapsed: format_time(state.timer.elapsed),
            progress: DayProgress::of(state.timer.elapsed),
            state,
            is_selected,
        }
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub is_loading: bool,
    pub is_creating: bool,
    pub error: Option<String>,
    pub pending_confirmation: Option<Confirmation>,
    pub filter: StatusFilter,
    pub sort_by: SortKey,
    pub search_query: String,
    pub selected_ids: Vec<TimerId>,
    pub stats: TimerStats,
    pub formatted_total_elapsed: String,
    pub timers: Vec<CardView>,
}

/// Owner of the timer collection and of one [`TimerCard`] per timer.
///
/// Cards report upward through a notification channel that the dashboard
/// drains after [`Dashboard::mount`]; the collection is only ever changed
/// through its reducer.
#[derive(Clone)]
pub struct Dashboard {
    gateway: Arc<dyn TimerGateway>,
    settings: EngineSettings,
    list: Arc<Mutex<TimerListState>>,
    cards: Arc<Mutex<HashMap<TimerId, TimerCard>>>,
    status: Arc<Mutex<DashboardStatus>>,
    lifecycle: Lifecycle,
    loads: SequenceGuard,
    events_tx: broadcast::Sender<DashboardEvent>,
    notify_tx: mpsc::UnboundedSender<CardNotification>,
    notify_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<CardNotification>>>>,
    pump: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Dashboard {
    pub fn new(gateway: Arc<dyn TimerGateway>, settings: EngineSettings) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        Self {
            gateway,
            settings,
            list: Arc::new(Mutex::new(TimerListState::default())),
            cards: Arc::new(Mutex::new(HashMap::new())),
            status: Arc::new(Mutex::new(DashboardStatus::default())),
            lifecycle: Lifecycle::mounted(),
            loads: SequenceGuard::new(),
            events_tx,
            notify_tx,
            notify_rx: Arc::new(Mutex::new(Some(notify_rx))),
            pump: Arc::new(Mutex::new(None)),
        }
    }

    /// Receive timer updates, deletions and failures as they happen
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(DashboardError::Unmounted)
        }
    }

    /// Start listening to cards and fetch the full timer list once
    pub async fn mount(&self) -> Result<()> {
        self.ensure_mounted()?;

        if let Some(rx) = lock(&self.notify_rx).take() {
            let dashboard = self.clone();
            *lock(&self.pump) = Some(tokio::spawn(dashboard.run_notifications(rx)));
            info!("Dashboard mounted");
        }

        self.load().await;
        Ok(())
    }

    /// Stop every ticker and ignore all responses that arrive afterwards
    pub fn unmount(&self) {
        if !self.lifecycle.unmount() {
            return;
        }
        for card in lock(&self.cards).values() {
            card.teardown();
        }
        if let Some(pump) = lock(&self.pump).take() {
            pump.abort();
        }
        info!("Dashboard unmounted");
    }

    /// Fetch the full list, replacing the collection. Safe to call again to retry.
    pub async fn load(&self) {
        if !self.is_mounted() {
            return;
        }
        let ticket = self.loads.issue();
        {
            let mut status = lock(&self.status);
            status.is_loading = true;
            status.error = None;
        }
        let observed: HashMap<TimerId, Ticket> = lock(&self.cards)
            .iter()
            .map(|(id, card)| (id.clone(), card.observe_status()))
            .collect();

        let result = self.gateway.list().await;
        if !self.is_mounted() || !ticket.is_current() {
            debug!("Discarding superseded load #{}", ticket.seq());
            return;
        }

        match result {
            Ok(timers) => {
                info!("Loaded {} timers", timers.len());
                self.replace_timers(timers, &observed);
            }
            Err(e) => {
                error!("Failed to load timers: {}", e);
                self.report_error("Failed to load timers");
            }
        }
        lock(&self.status).is_loading = false;
    }

    /// Reload the full list; cards for vanished timers are torn down
    pub async fn refresh(&self) {
        info!("Refreshing timers");
        self.load().await;
    }

    /// Create a timer after validating its name and description
    pub async fn create_timer(&self, name: &str, description: &str) -> Result<Timer> {
        self.ensure_mounted()?;
        validate_details(name, description)?;
        {
            let mut status = lock(&self.status);
            status.is_creating = true;
            status.error = None;
        }

        let result = self.gateway.create(NewTimer::new(name, description)).await;
        lock(&self.status).is_creating = false;
        self.ensure_mounted()?;

        match result {
            Ok(timer) => {
                info!("Created timer {} ({})", timer.id, timer.name);
                self.insert_timer(timer.clone());
                Ok(timer)
            }
            Err(e) => {
                error!("Failed to create timer: {}", e);
                self.report_error("Failed to create timer");
                Err(e.into())
            }
        }
    }

    pub fn card(&self, id: &str) -> Result<TimerCard> {
        lock(&self.cards)
            .get(id)
            .cloned()
            .ok_or_else(|| DashboardError::UnknownTimer(id.to_string()))
    }

    /// Confirm deletion of one timer through its card. Once the delete
    /// settles successfully the timer is already gone from the collection.
    pub fn confirm_delete(&self, id: &str) -> Result<Option<InFlight>> {
        self.ensure_mounted()?;
        let card = self.card(id)?;
        let Some(op) = card.confirm_delete() else {
            return Ok(None);
        };

        let dashboard = self.clone();
        Ok(Some(InFlight::spawn(async move {
            op.settled().await;
            if !card.is_mounted() && dashboard.is_mounted() {
                dashboard.remove_timer(card.id());
            }
        })))
    }

    pub fn list_state(&self) -> TimerListState {
        lock(&self.list).clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.status).is_loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.status).error.clone()
    }

    pub fn dismiss_error(&self) {
        lock(&self.status).error = None;
    }

    pub fn set_filter(&self, filter: StatusFilter) {
        self.dispatch(TimerListAction::SetFilter(filter));
    }

    pub fn set_sort(&self, sort_by: SortKey) {
        self.dispatch(TimerListAction::SetSort(sort_by));
    }

    pub fn set_search(&self, query: impl Into<String>) {
        self.dispatch(TimerListAction::SetSearch(query.into()));
    }

    pub fn toggle_select(&self, id: &str) {
        self.dispatch(TimerListAction::ToggleSelect(id.to_string()));
    }

    pub fn select_all(&self) {
        self.dispatch(TimerListAction::SelectAll);
    }

    pub fn clear_selection(&self) {
        self.dispatch(TimerListAction::ClearSelection);
    }

    pub fn start_all(&self) -> Option<InFlight> {
        self.fan_out(BulkOperation::Start)
    }

    pub fn pause_all(&self) -> Option<InFlight> {
        self.fan_out(BulkOperation::Pause)
    }

    /// Ask for confirmation before resetting every timer
    pub fn request_reset_all(&self) -> Option<Confirmation> {
        let count = lock(&self.list).timers.len();
        if count == 0 {
            return None;
        }
        self.set_pending(Confirmation::ResetAll { count })
    }

    /// Ask for confirmation before deleting the selected timers
    pub fn request_delete_selected(&self) -> Option<Confirmation> {
        let count = lock(&self.list).selected_ids.len();
        if count == 0 {
            return None;
        }
        self.set_pending(Confirmation::DeleteSelected { count })
    }

    fn set_pending(&self, confirmation: Confirmation) -> Option<Confirmation> {
        debug!("Awaiting confirmation: {:?}", confirmation);
        lock(&self.status).pending = Some(confirmation);
        Some(confirmation)
    }

    pub fn pending_confirmation(&self) -> Option<Confirmation> {
        lock(&self.status).pending
    }

    pub fn cancel_pending(&self) {
        lock(&self.status).pending = None;
    }

    /// Run the operation waiting for confirmation
    pub fn confirm_pending(&self) -> Result<Option<InFlight>> {
        self.ensure_mounted()?;
        let pending = lock(&self.status).pending.take();
        match pending {
            Some(Confirmation::ResetAll { .. }) => Ok(self.fan_out(BulkOperation::Reset)),
            Some(Confirmation::DeleteSelected { .. }) => Ok(self.delete_selected()),
            None => Err(DashboardError::InvalidState(
                "no confirmation is pending".to_string(),
            )),
        }
    }

    /// Snapshot of the collection, display list and per-card state
    pub fn view(&self) -> DashboardView {
        let list = self.list_state();
        let timers = {
            let cards = lock(&self.cards);
            list.display_list()
                .into_iter()
                .map(|timer| {
                    let state = cards
                        .get(&timer.id)
                        .map(TimerCard::state)
                        .unwrap_or_else(|| TimerCardState::new(timer.clone()));
                    CardView::new(state, list.selected_ids.contains(&timer.id))
                })
                .collect()
        };
        let stats = list.stats();
        let status = lock(&self.status);

        DashboardView {
            is_loading: status.is_loading,
            is_creating: status.is_creating,
            error: status.error.clone(),
            pending_confirmation: status.pending,
            filter: list.filter,
            sort_by: list.sort_by,
            search_query: list.search_query.clone(),
            selected_ids: list.selected_ids.iter().cloned().collect(),
            formatted_total_elapsed: format_time(stats.total_elapsed),
            stats,
            timers,
        }
    }

    pub fn card_view(&self, id: &str) -> Result<CardView> {
        let card = self.card(id)?;
        let is_selected = lock(&self.list).selected_ids.contains(id);
        Ok(CardView::new(card.state(), is_selected))
    }

    fn dispatch(&self, action: TimerListAction) {
        let mut list = lock(&self.list);
        let state = std::mem::take(&mut *list);
        *list = list_state::reduce(state, action);
    }

    fn emit(&self, event: DashboardEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("No subscribers for dashboard event");
        }
    }

    fn report_error(&self, message: impl Into<String>) {
        let message = message.into();
        lock(&self.status).error = Some(message.clone());
        self.emit(DashboardEvent::OperationFailed(message));
    }

    fn mount_card(&self, timer: Timer) -> TimerCard {
        TimerCard::mount(
            timer,
            Arc::clone(&self.gateway),
            self.settings,
            self.notify_tx.clone(),
        )
    }

    /// Reconcile cards with a freshly loaded list, then replace the collection.
    ///
    /// `observed` holds each card's status ticket from when the list was
    /// requested. A card that issued a status operation since then, or that
    /// did not exist yet, keeps its local copy.
    fn replace_timers(&self, listed: Vec<Timer>, observed: &HashMap<TimerId, Ticket>) {
        let mut timers = Vec::with_capacity(listed.len());
        {
            let mut cards = lock(&self.cards);
            cards.retain(|id, card| {
                let keep = !observed.contains_key(id) || listed.iter().any(|t| &t.id == id);
                if !keep {
                    card.teardown();
                }
                keep
            });
            for timer in listed {
                match cards.get(&timer.id) {
                    Some(card) => {
                        let adopted = observed
                            .get(&timer.id)
                            .is_some_and(|ticket| card.adopt_if_current(&timer, ticket));
                        if adopted {
                            timers.push(timer);
                        } else {
                            debug!("Keeping local copy of timer {} over the loaded one", timer.id);
                            timers.push(card.timer());
                        }
                    }
                    None => {
                        let card = self.mount_card(timer.clone());
                        cards.insert(timer.id.clone(), card);
                        timers.push(timer);
                    }
                }
            }
            for (id, card) in cards.iter() {
                if !timers.iter().any(|t| &t.id == id) {
                    timers.push(card.timer());
                }
            }
        }
        self.dispatch(TimerListAction::SetTimers(timers));
    }

    fn insert_timer(&self, timer: Timer) {
        {
            let mut cards = lock(&self.cards);
            if !cards.contains_key(&timer.id) {
                let card = self.mount_card(timer.clone());
                cards.insert(timer.id.clone(), card);
            }
        }
        self.dispatch(TimerListAction::AddTimer(timer.clone()));
        self.emit(DashboardEvent::TimerUpdated(timer));
    }

    fn apply_update(&self, timer: Timer) {
        self.dispatch(TimerListAction::UpdateTimer {
            id: timer.id.clone(),
            patch: TimerPatch::from(&timer),
        });
        self.emit(DashboardEvent::TimerUpdated(timer));
    }

    /// Drop a deleted timer and its card; repeated removals are no-ops
    fn remove_timer(&self, id: &str) {
        let Some(card) = lock(&self.cards).remove(id) else {
            return;
        };
        card.teardown();
        self.dispatch(TimerListAction::DeleteTimer(id.to_string()));
        self.emit(DashboardEvent::TimerDeleted(id.to_string()));
    }

    /// Cards in collection order
    fn cards_in_order(&self) -> Vec<TimerCard> {
        let ids: Vec<TimerId> = lock(&self.list).timers.iter().map(|t| t.id.clone()).collect();
        let cards = lock(&self.cards);
        ids.iter().filter_map(|id| cards.get(id).cloned()).collect()
    }

    /// One independent update per affected timer, each applied as it resolves.
    /// Failures are counted into a single banner message; successful peers stay.
    fn fan_out(&self, op: BulkOperation) -> Option<InFlight> {
        if !self.is_mounted() {
            return None;
        }

        let calls: FuturesUnordered<_> = self
            .cards_in_order()
            .into_iter()
            .filter_map(|card| {
                let state = card.state();
                if state.is_deleting || !op.applies_to(&state.timer) {
                    return None;
                }
                let ticket = card.issue_status();
                let patch = op.patch(&state.timer);
                let gateway = Arc::clone(&self.gateway);
                Some(async move {
                    let result = gateway.update(card.id(), patch).await;
                    (card, ticket, result)
                })
            })
            .collect();

        if calls.is_empty() {
            debug!("No timers to {}", op.verb());
            return None;
        }

        let total = calls.len();
        info!("Issuing {} for {} timers", op.verb(), total);
        let dashboard = self.clone();
        Some(InFlight::spawn(async move {
            let mut calls = calls;
            let mut failed = 0;
            while let Some((card, ticket, result)) = calls.next().await {
                match result {
                    Ok(timer) => dashboard.apply_bulk_result(&card, &ticket, timer),
                    Err(e) => {
                        warn!("Failed to {} timer {}: {}", op.verb(), card.id(), e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 && dashboard.is_mounted() {
                warn!("{} of {} {} calls failed", failed, total, op.verb());
                dashboard.report_error(format!("Failed to {} some timers", op.verb()));
            }
        }))
    }

    fn apply_bulk_result(&self, card: &TimerCard, ticket: &Ticket, timer: Timer) {
        if !self.is_mounted() {
            return;
        }
        if card.adopt_if_current(&timer, ticket) {
            self.apply_update(timer);
        }
    }

    /// Delete every selected timer concurrently. The collection only changes
    /// once all calls have settled, and only if none of them failed.
    fn delete_selected(&self) -> Option<InFlight> {
        let ids: Vec<TimerId> = lock(&self.list).selected_ids.iter().cloned().collect();
        if ids.is_empty() {
            return None;
        }

        info!("Deleting {} selected timers", ids.len());
        let dashboard = self.clone();
        Some(InFlight::spawn(async move {
            let results = join_all(ids.iter().map(|id| dashboard.gateway.delete(id))).await;
            if !dashboard.is_mounted() {
                return;
            }

            let failed = results
                .iter()
                .filter(|result| !matches!(result, Ok(()) | Err(GatewayError::NotFound(_))))
                .count();
            if failed > 0 {
                warn!("{} of {} deletes failed, keeping all selected timers", failed, ids.len());
                dashboard.report_error("Failed to delete selected timers");
                return;
            }

            for id in &ids {
                dashboard.remove_timer(id);
            }
        }))
    }

    async fn run_notifications(self, mut rx: mpsc::UnboundedReceiver<CardNotification>) {
        debug!("Listening for card notifications");
        while let Some(notification) = rx.recv().await {
            if !self.is_mounted() {
                break;
            }
            match notification {
                CardNotification::TimerUpdated(timer) => self.apply_update(timer),
                CardNotification::TimerDeleted(id) => {
                    info!("Timer {} deleted", id);
                    self.remove_timer(&id);
                }
            }
        }
    }
}
