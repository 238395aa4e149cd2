//! Per-timer orchestration: ticking, periodic flushes and optimistic updates

use std::{
    ops::ControlFlow,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    guard::{InFlight, Lifecycle, SequenceGuard, Ticket},
    EngineSettings,
};
use crate::{
    error::{DashboardError, GatewayError, Result},
    services::TimerGateway,
    state::{
        card_state, now_millis, validate_details, Timer, TimerCardAction, TimerCardState, TimerId,
        TimerPatch,
    },
    tasks::Ticker,
    utils::lock,
};

/// Upward notification from a card to the dashboard that owns the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardNotification {
    TimerUpdated(Timer),
    TimerDeleted(TimerId),
}

struct CardInner {
    state: TimerCardState,
    /// Name and description as they were when editing began
    committed: Option<TimerPatch>,
    ticker: Option<Ticker>,
    /// Bumped on every ticker spawn and stop; a tick from an older ticker is ignored
    ticker_generation: u64,
}

impl CardInner {
    fn dispatch(&mut self, action: TimerCardAction) {
        self.state = card_state::reduce(self.state.clone(), action);
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            self.ticker_generation += 1;
            ticker.cancel();
        }
    }

    fn discard_edits(&mut self) {
        if !self.state.is_editing {
            return;
        }
        if let Some(committed) = self.committed.take() {
            self.dispatch(TimerCardAction::UpdateTimer(committed));
        }
        self.dispatch(TimerCardAction::CancelEditing);
    }
}

/// Everything a card's background work needs except the card state itself
#[derive(Clone)]
struct CardContext {
    id: TimerId,
    gateway: Arc<dyn TimerGateway>,
    notifier: mpsc::UnboundedSender<CardNotification>,
    settings: EngineSettings,
    /// start, pause, reset, refresh, flushes and bulk results
    status: SequenceGuard,
    edits: SequenceGuard,
    removal: SequenceGuard,
    lifecycle: Lifecycle,
}

impl CardContext {
    fn notify(&self, notification: CardNotification) {
        if self.notifier.send(notification).is_err() {
            debug!("No listener for notifications from timer {}", self.id);
        }
    }

    fn accepts(&self, ticket: &Ticket, op: &str) -> bool {
        if !self.lifecycle.is_mounted() {
            debug!("Timer {} {} response arrived after teardown, ignoring", self.id, op);
            return false;
        }
        if !ticket.is_current() {
            debug!(
                "Discarding stale {} response #{} for timer {}",
                op,
                ticket.seq(),
                self.id
            );
            return false;
        }
        true
    }

    fn tick(&self, cell: &Weak<Mutex<CardInner>>, generation: u64) -> ControlFlow<()> {
        let Some(cell) = cell.upgrade() else {
            return ControlFlow::Break(());
        };

        let flush_at = {
            let mut inner = lock(&cell);
            if !self.lifecycle.is_mounted()
                || inner.ticker_generation != generation
                || !inner.state.timer.is_running
                || inner.state.is_deleting
            {
                return ControlFlow::Break(());
            }
            let elapsed = inner.state.timer.elapsed + 1;
            inner.dispatch(TimerCardAction::UpdateTimer(TimerPatch::elapsed(elapsed)));
            let every = self.settings.flush_every;
            (every > 0 && elapsed % every == 0).then_some(elapsed)
        };

        if let Some(elapsed) = flush_at {
            self.flush(elapsed);
        }
        ControlFlow::Continue(())
    }

    /// Persist the local elapsed count; superseded by any later status operation
    fn flush(&self, elapsed: u64) {
        let ticket = self.status.observe();
        let ctx = self.clone();
        debug!("Flushing elapsed {} for timer {}", elapsed, self.id);

        tokio::spawn(async move {
            match ctx.gateway.update(&ctx.id, TimerPatch::elapsed(elapsed)).await {
                Ok(timer) => {
                    if ctx.accepts(&ticket, "flush") {
                        ctx.notify(CardNotification::TimerUpdated(timer));
                    }
                }
                Err(e) => warn!("Failed to flush elapsed {} for timer {}: {}", elapsed, ctx.id, e),
            }
        });
    }
}

/// Owner of one timer's local state and its ticker.
///
/// Operations apply their local effect immediately and return an [`InFlight`]
/// handle for the gateway call. Gateway failures are never returned: the card
/// rolls back to the state it had when the operation was issued.
#[derive(Clone)]
pub struct TimerCard {
    ctx: CardContext,
    inner: Arc<Mutex<CardInner>>,
}

impl TimerCard {
    /// Create the card for `timer`; a running timer starts ticking immediately
    pub fn mount(
        timer: Timer,
        gateway: Arc<dyn TimerGateway>,
        settings: EngineSettings,
        notifier: mpsc::UnboundedSender<CardNotification>,
    ) -> Self {
        let card = Self {
            ctx: CardContext {
                id: timer.id.clone(),
                gateway,
                notifier,
                settings,
                status: SequenceGuard::new(),
                edits: SequenceGuard::new(),
                removal: SequenceGuard::new(),
                lifecycle: Lifecycle::mounted(),
            },
            inner: Arc::new(Mutex::new(CardInner {
                state: TimerCardState::new(timer),
                committed: None,
                ticker: None,
                ticker_generation: 0,
            })),
        };

        {
            let mut inner = card.lock();
            card.reconcile_ticker(&mut inner);
        }
        card
    }

    pub fn id(&self) -> &str {
        &self.ctx.id
    }

    pub fn state(&self) -> TimerCardState {
        self.lock().state.clone()
    }

    /// Local working copy of the timer
    pub fn timer(&self) -> Timer {
        self.lock().state.timer.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.ctx.lifecycle.is_mounted()
    }

    pub fn is_ticking(&self) -> bool {
        self.lock().ticker.as_ref().is_some_and(Ticker::is_active)
    }

    fn lock(&self) -> MutexGuard<'_, CardInner> {
        lock(&self.inner)
    }

    /// Make the ticker agree with `is_running`
    fn reconcile_ticker(&self, inner: &mut CardInner) {
        let should_tick = inner.state.timer.is_running
            && !inner.state.is_deleting
            && self.ctx.lifecycle.is_mounted();
        let ticking = inner.ticker.as_ref().is_some_and(Ticker::is_active);

        if should_tick && !ticking {
            inner.ticker_generation += 1;
            let generation = inner.ticker_generation;
            let cell = Arc::downgrade(&self.inner);
            let ctx = self.ctx.clone();
            inner.ticker = Some(Ticker::spawn(self.ctx.settings.tick_period, move || {
                ctx.tick(&cell, generation)
            }));
            debug!("Ticker #{} started for timer {}", generation, self.ctx.id);
        } else if !should_tick {
            inner.stop_ticker();
        }
    }

    /// Take the gateway's copy as the source of truth, keeping local ticks that
    /// are ahead of the last flush and any unsaved edit drafts
    fn adopt(&self, inner: &mut CardInner, server: &Timer) {
        let mut patch = TimerPatch::from(server);
        let local = &inner.state.timer;
        if local.is_running && server.is_running {
            patch.elapsed = Some(local.elapsed.max(server.elapsed));
        }
        if inner.state.is_editing {
            patch.name = None;
            patch.description = None;
        }
        inner.dispatch(TimerCardAction::UpdateTimer(patch));
        self.reconcile_ticker(inner);
    }

    fn settle<F>(
        &self,
        ticket: &Ticket,
        op: &str,
        result: std::result::Result<Timer, GatewayError>,
        rollback: F,
    ) where
        F: FnOnce(&mut CardInner),
    {
        let mut inner = self.lock();
        if !self.ctx.accepts(ticket, op) {
            return;
        }
        match result {
            Ok(server) => {
                self.adopt(&mut inner, &server);
                self.ctx.notify(CardNotification::TimerUpdated(server));
            }
            Err(e) => {
                warn!("Failed to {} timer {}: {}, rolling back", op, self.ctx.id, e);
                rollback(&mut *inner);
                self.reconcile_ticker(&mut inner);
            }
        }
    }

    fn issue_update<F>(
        &self,
        ticket: Ticket,
        op: &'static str,
        patch: TimerPatch,
        rollback: F,
    ) -> InFlight
    where
        F: FnOnce(&mut CardInner) + Send + 'static,
    {
        let card = self.clone();
        InFlight::spawn(async move {
            let result = card.ctx.gateway.update(&card.ctx.id, patch).await;
            card.settle(&ticket, op, result, rollback);
        })
    }

    /// Start ticking. A running timer is left alone and no call is issued.
    pub fn start(&self) -> Option<InFlight> {
        let (ticket, snapshot) = {
            let mut inner = self.lock();
            if !self.is_mounted() || inner.state.is_deleting {
                return None;
            }
            if inner.state.timer.is_running {
                debug!("Timer {} is already running", self.ctx.id);
                return None;
            }
            let snapshot = TimerPatch::running(inner.state.timer.is_running);
            inner.dispatch(TimerCardAction::UpdateTimer(TimerPatch::running(true)));
            self.reconcile_ticker(&mut inner);
            (self.ctx.status.issue(), snapshot)
        };

        info!("Starting timer {}", self.ctx.id);
        let patch = TimerPatch::running(true).with_started_at(now_millis());
        Some(self.issue_update(ticket, "start", patch, move |inner| {
            inner.dispatch(TimerCardAction::UpdateTimer(snapshot));
        }))
    }

    /// Stop ticking and persist the exact elapsed count
    pub fn pause(&self) -> Option<InFlight> {
        let (ticket, snapshot) = {
            let mut inner = self.lock();
            if !self.is_mounted() || inner.state.is_deleting || !inner.state.timer.is_running {
                return None;
            }
            let timer = &inner.state.timer;
            let snapshot = TimerPatch::running(timer.is_running).with_elapsed(timer.elapsed);
            inner.dispatch(TimerCardAction::UpdateTimer(TimerPatch::running(false)));
            self.reconcile_ticker(&mut inner);
            (self.ctx.status.issue(), snapshot)
        };

        let elapsed = snapshot.elapsed.unwrap_or_default();
        info!("Pausing timer {} at {}s", self.ctx.id, elapsed);
        let patch = TimerPatch::running(false).with_elapsed(elapsed);
        Some(self.issue_update(ticket, "pause", patch, move |inner| {
            inner.dispatch(TimerCardAction::UpdateTimer(snapshot));
        }))
    }

    /// Zero the elapsed count and stop ticking
    pub fn reset(&self) -> Option<InFlight> {
        let (ticket, snapshot) = {
            let mut inner = self.lock();
            if !self.is_mounted() || inner.state.is_deleting {
                return None;
            }
            let timer = &inner.state.timer;
            let snapshot = TimerPatch::running(timer.is_running).with_elapsed(timer.elapsed);
            inner.dispatch(TimerCardAction::UpdateTimer(
                TimerPatch::elapsed(0).with_running(false),
            ));
            self.reconcile_ticker(&mut inner);
            (self.ctx.status.issue(), snapshot)
        };

        info!("Resetting timer {}", self.ctx.id);
        let patch = TimerPatch::elapsed(0).with_running(false);
        Some(self.issue_update(ticket, "reset", patch, move |inner| {
            inner.dispatch(TimerCardAction::UpdateTimer(snapshot));
        }))
    }

    /// Re-read this timer from the gateway
    pub fn refresh(&self) -> Option<InFlight> {
        if !self.is_mounted() {
            return None;
        }
        let ticket = self.ctx.status.issue();
        let card = self.clone();
        Some(InFlight::spawn(async move {
            let result = card.ctx.gateway.get(&card.ctx.id).await;
            card.settle(&ticket, "refresh", result, |_| {});
        }))
    }

    /// Open the edit form, remembering the committed name and description
    pub fn begin_edit(&self) {
        let mut inner = self.lock();
        if inner.state.is_editing || inner.state.is_deleting {
            return;
        }
        if inner.state.show_confirm {
            inner.dispatch(TimerCardAction::CancelDelete);
        }
        let committed = TimerPatch::details(&inner.state.timer.name, &inner.state.timer.description);
        inner.committed = Some(committed);
        inner.dispatch(TimerCardAction::StartEditing);
    }

    pub fn edit_name(&self, name: impl Into<String>) -> Result<()> {
        self.edit_draft(TimerPatch {
            name: Some(name.into()),
            ..TimerPatch::default()
        })
    }

    pub fn edit_description(&self, description: impl Into<String>) -> Result<()> {
        self.edit_draft(TimerPatch {
            description: Some(description.into()),
            ..TimerPatch::default()
        })
    }

    fn edit_draft(&self, draft: TimerPatch) -> Result<()> {
        let mut inner = self.lock();
        if !inner.state.is_editing {
            return Err(DashboardError::InvalidState(
                "timer is not being edited".to_string(),
            ));
        }
        inner.dispatch(TimerCardAction::UpdateTimer(draft));
        Ok(())
    }

    /// Close the edit form and restore the committed name and description
    pub fn cancel_edit(&self) {
        self.lock().discard_edits();
    }

    /// Persist the draft name and description.
    ///
    /// Invalid drafts are rejected before any gateway call. A failed call
    /// closes the form without applying the change.
    pub fn save(&self) -> Result<InFlight> {
        let (ticket, patch) = {
            let inner = self.lock();
            if !inner.state.is_editing {
                return Err(DashboardError::InvalidState(
                    "timer is not being edited".to_string(),
                ));
            }
            let timer = &inner.state.timer;
            validate_details(&timer.name, &timer.description)?;
            (
                self.ctx.edits.issue(),
                TimerPatch::details(&timer.name, &timer.description),
            )
        };

        info!("Saving edits for timer {}", self.ctx.id);
        let card = self.clone();
        Ok(InFlight::spawn(async move {
            let result = card.ctx.gateway.update(&card.ctx.id, patch).await;
            let mut inner = card.lock();
            if !card.ctx.accepts(&ticket, "save") {
                return;
            }
            match result {
                Ok(server) => {
                    inner.committed = None;
                    inner.dispatch(TimerCardAction::SaveEdits(TimerPatch::details(
                        &server.name,
                        &server.description,
                    )));
                    card.ctx.notify(CardNotification::TimerUpdated(server));
                }
                Err(e) => {
                    warn!("Failed to save timer {}: {}, discarding edits", card.ctx.id, e);
                    inner.discard_edits();
                }
            }
        }))
    }

    /// Show the delete confirmation
    pub fn request_delete(&self) {
        let mut inner = self.lock();
        if inner.state.is_deleting {
            return;
        }
        inner.discard_edits();
        inner.dispatch(TimerCardAction::ShowDeleteConfirm);
    }

    pub fn cancel_delete(&self) {
        let mut inner = self.lock();
        if !inner.state.is_deleting {
            inner.dispatch(TimerCardAction::CancelDelete);
        }
    }

    /// Delete the timer if the confirmation is showing, otherwise show it.
    ///
    /// Ticking stops while the delete is in flight and resumes if it fails.
    pub fn confirm_delete(&self) -> Option<InFlight> {
        let ticket = {
            let mut inner = self.lock();
            if !self.is_mounted() || inner.state.is_deleting {
                return None;
            }
            if !inner.state.show_confirm {
                inner.discard_edits();
                inner.dispatch(TimerCardAction::ShowDeleteConfirm);
                return None;
            }
            inner.dispatch(TimerCardAction::ConfirmDelete);
            self.reconcile_ticker(&mut inner);
            self.ctx.removal.issue()
        };

        info!("Deleting timer {}", self.ctx.id);
        let card = self.clone();
        Some(InFlight::spawn(async move {
            let result = card.ctx.gateway.delete(&card.ctx.id).await;
            {
                let mut inner = card.lock();
                if !card.ctx.accepts(&ticket, "delete") {
                    return;
                }
                match result {
                    Ok(()) | Err(GatewayError::NotFound(_)) => {}
                    Err(e) => {
                        warn!("Failed to delete timer {}: {}, restoring", card.ctx.id, e);
                        inner.dispatch(TimerCardAction::DeleteFailed);
                        card.reconcile_ticker(&mut inner);
                        return;
                    }
                }
            }
            card.ctx.notify(CardNotification::TimerDeleted(card.ctx.id.clone()));
            card.teardown();
        }))
    }

    /// Stop ticking and ignore every response that arrives from now on
    pub fn teardown(&self) {
        if self.ctx.lifecycle.unmount() {
            self.lock().stop_ticker();
            debug!("Timer card {} torn down", self.ctx.id);
        }
    }

    /// Supersede in-flight status operations ahead of an external update
    pub(crate) fn issue_status(&self) -> Ticket {
        self.ctx.status.issue()
    }

    /// Ticket for an external read that must yield to any status operation issued after it
    pub(crate) fn observe_status(&self) -> Ticket {
        self.ctx.status.observe()
    }

    /// Adopt a gateway copy obtained outside the card, if `ticket` is still current
    pub(crate) fn adopt_if_current(&self, server: &Timer, ticket: &Ticket) -> bool {
        let mut inner = self.lock();
        if !self.ctx.accepts(ticket, "external update") {
            return false;
        }
        self.adopt(&mut inner, server);
        true
    }
}
