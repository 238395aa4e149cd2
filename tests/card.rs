use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time::sleep};

use timer_dashboard::{
    engine::{CardNotification, EngineSettings, TimerCard},
    error::DashboardError,
    services::{GatewayLatency, GatewayOp, InMemoryGateway},
    state::{Timer, TimerPatch},
};

fn timer(id: &str, elapsed: u64, is_running: bool) -> Timer {
    Timer {
        id: id.to_string(),
        name: format!("Timer {}", id),
        description: String::new(),
        elapsed,
        is_running,
        created_at: 1_700_000_000_000,
        started_at: None,
    }
}

fn mount(
    gateway: &Arc<InMemoryGateway>,
    id: &str,
) -> (TimerCard, mpsc::UnboundedReceiver<CardNotification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let timer = gateway.stored(id).unwrap();
    let card = TimerCard::mount(timer, gateway.clone(), EngineSettings::default(), tx);
    (card, rx)
}

fn gateway_with(timers: Vec<Timer>) -> Arc<InMemoryGateway> {
    Arc::new(InMemoryGateway::with_timers(GatewayLatency::none(), timers))
}

#[tokio::test(start_paused = true)]
async fn test_start_on_running_timer_issues_nothing() {
    let gateway = gateway_with(vec![timer("a", 10, true)]);
    let (card, _rx) = mount(&gateway, "a");

    assert!(card.is_ticking());
    assert!(card.start().is_none());
    assert!(gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_five_ticks_flush_once() {
    let gateway = gateway_with(vec![timer("a", 0, false)]);
    let (card, mut rx) = mount(&gateway, "a");

    card.start().unwrap().settled().await;
    assert!(matches!(rx.recv().await, Some(CardNotification::TimerUpdated(t)) if t.is_running));

    sleep(Duration::from_millis(5_500)).await;

    assert_eq!(card.timer().elapsed, 5);
    let updates = gateway.calls_for(GatewayOp::Update);
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].patch, Some(TimerPatch::elapsed(5)));

    match rx.recv().await {
        Some(CardNotification::TimerUpdated(t)) => assert_eq!(t.elapsed, 5),
        other => panic!("expected flushed timer, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_pause_rolls_back() {
    let gateway = gateway_with(vec![timer("a", 100, true)]);
    let (card, mut rx) = mount(&gateway, "a");
    gateway.fail(GatewayOp::Update, Some("a"));

    let op = card.pause().unwrap();
    assert!(!card.timer().is_running);
    op.settled().await;

    let timer = card.timer();
    assert!(timer.is_running);
    assert_eq!(timer.elapsed, 100);
    assert!(card.is_ticking());
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_failed_start_rolls_back() {
    let gateway = gateway_with(vec![timer("a", 8, false)]);
    let (card, mut rx) = mount(&gateway, "a");
    gateway.fail(GatewayOp::Update, Some("a"));

    let op = card.start().unwrap();
    assert!(card.timer().is_running);
    assert!(card.is_ticking());
    op.settled().await;

    let timer = card.timer();
    assert!(!timer.is_running);
    assert_eq!(timer.elapsed, 8);
    assert!(!card.is_ticking());
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_pause_on_paused_timer_is_noop() {
    let gateway = gateway_with(vec![timer("a", 7, false)]);
    let (card, _rx) = mount(&gateway, "a");

    assert!(card.pause().is_none());
    assert!(gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_start_response_is_ignored() {
    let gateway = Arc::new(InMemoryGateway::with_timers(
        GatewayLatency::uniform(Duration::from_millis(300)),
        vec![timer("a", 0, false)],
    ));
    let (card, _rx) = mount(&gateway, "a");

    let start = card.start().unwrap();
    gateway.set_latency(GatewayLatency::uniform(Duration::from_millis(50)));
    let pause = card.pause().unwrap();

    pause.settled().await;
    assert!(!card.timer().is_running);

    start.settled().await;
    assert!(!card.timer().is_running);
    assert!(!card.is_ticking());
}

#[tokio::test(start_paused = true)]
async fn test_failed_reset_restores_elapsed() {
    let gateway = gateway_with(vec![timer("a", 42, false)]);
    let (card, _rx) = mount(&gateway, "a");
    gateway.fail(GatewayOp::Update, None);

    let op = card.reset().unwrap();
    assert_eq!(card.timer().elapsed, 0);
    op.settled().await;

    assert_eq!(card.timer().elapsed, 42);
    assert!(!card.timer().is_running);
}

#[tokio::test(start_paused = true)]
async fn test_reset_stops_ticking() {
    let gateway = gateway_with(vec![timer("a", 42, true)]);
    let (card, _rx) = mount(&gateway, "a");

    card.reset().unwrap().settled().await;
    sleep(Duration::from_secs(3)).await;

    let timer = card.timer();
    assert_eq!(timer.elapsed, 0);
    assert!(!timer.is_running);
    assert_eq!(gateway.stored("a").unwrap().elapsed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_save_persists_drafts() {
    let gateway = gateway_with(vec![timer("a", 0, false)]);
    let (card, _rx) = mount(&gateway, "a");

    card.begin_edit();
    card.edit_name("Deep work").unwrap();
    card.edit_description("No meetings").unwrap();
    card.save().unwrap().settled().await;

    let state = card.state();
    assert!(!state.is_editing);
    assert_eq!(state.timer.name, "Deep work");
    assert_eq!(gateway.stored("a").unwrap().description, "No meetings");
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_discards_drafts() {
    let gateway = gateway_with(vec![timer("a", 0, false)]);
    let (card, _rx) = mount(&gateway, "a");
    gateway.fail(GatewayOp::Update, Some("a"));

    card.begin_edit();
    card.edit_name("Renamed").unwrap();
    card.save().unwrap().settled().await;

    let state = card.state();
    assert!(!state.is_editing);
    assert_eq!(state.timer.name, "Timer a");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_draft_is_rejected_before_gateway() {
    let gateway = gateway_with(vec![timer("a", 0, false)]);
    let (card, _rx) = mount(&gateway, "a");

    assert!(matches!(card.edit_name("x"), Err(DashboardError::InvalidState(_))));

    card.begin_edit();
    card.edit_name("   ").unwrap();
    assert!(matches!(card.save(), Err(DashboardError::Validation(_))));
    assert!(gateway.calls().is_empty());

    card.cancel_edit();
    assert_eq!(card.timer().name, "Timer a");
}

#[tokio::test(start_paused = true)]
async fn test_delete_needs_confirmation() {
    let gateway = gateway_with(vec![timer("a", 0, true)]);
    let (card, mut rx) = mount(&gateway, "a");

    assert!(card.confirm_delete().is_none());
    assert!(card.state().show_confirm);
    assert!(gateway.calls().is_empty());

    card.confirm_delete().unwrap().settled().await;

    assert_eq!(rx.recv().await, Some(CardNotification::TimerDeleted("a".to_string())));
    assert!(!card.is_mounted());
    assert!(!card.is_ticking());
    assert!(gateway.stored("a").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_restores_card() {
    let gateway = gateway_with(vec![timer("a", 3, true)]);
    let (card, mut rx) = mount(&gateway, "a");
    gateway.fail(GatewayOp::Delete, Some("a"));

    card.request_delete();
    let op = card.confirm_delete().unwrap();
    assert!(card.state().is_deleting);
    assert!(!card.is_ticking());
    op.settled().await;

    let state = card.state();
    assert!(!state.is_deleting);
    assert!(!state.show_confirm);
    assert!(card.is_mounted());
    assert!(card.is_ticking());
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_ignores_late_responses() {
    let gateway = Arc::new(InMemoryGateway::with_timers(
        GatewayLatency::uniform(Duration::from_millis(300)),
        vec![timer("a", 0, false)],
    ));
    let (card, mut rx) = mount(&gateway, "a");

    let op = card.start().unwrap();
    card.teardown();
    op.settled().await;
    sleep(Duration::from_secs(3)).await;

    assert!(!card.is_ticking());
    assert_eq!(card.timer().elapsed, 0);
    assert!(rx.try_recv().is_err());
    assert!(card.start().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_adopts_gateway_copy() {
    let mut stored = timer("a", 90, false);
    stored.name = "Renamed elsewhere".to_string();
    let gateway = gateway_with(vec![stored]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let card = TimerCard::mount(timer("a", 0, false), gateway.clone(), EngineSettings::default(), tx);

    card.refresh().unwrap().settled().await;

    let timer = card.timer();
    assert_eq!(timer.name, "Renamed elsewhere");
    assert_eq!(timer.elapsed, 90);
    assert!(matches!(rx.recv().await, Some(CardNotification::TimerUpdated(_))));
}
