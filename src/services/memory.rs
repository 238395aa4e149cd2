//! In-memory gateway with simulated latency

use std::{
    collections::HashSet,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use super::TimerGateway;
use crate::{
    error::GatewayError,
    state::{NewTimer, Timer, TimerId, TimerPatch},
    utils::lock,
};

/// Gateway operation kinds, used for latency, fault injection and the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// Simulated round-trip time per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayLatency {
    pub list: Duration,
    pub get: Duration,
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl GatewayLatency {
    /// Every call resolves without waiting
    pub fn none() -> Self {
        Self::uniform(Duration::ZERO)
    }

    pub fn uniform(delay: Duration) -> Self {
        Self {
            list: delay,
            get: delay,
            create: delay,
            update: delay,
            delete: delay,
        }
    }

    pub fn for_op(&self, op: GatewayOp) -> Duration {
        match op {
            GatewayOp::List => self.list,
            GatewayOp::Get => self.get,
            GatewayOp::Create => self.create,
            GatewayOp::Update => self.update,
            GatewayOp::Delete => self.delete,
        }
    }
}

impl Default for GatewayLatency {
    fn default() -> Self {
        Self {
            list: Duration::from_millis(500),
            get: Duration::from_millis(300),
            create: Duration::from_millis(400),
            update: Duration::from_millis(300),
            delete: Duration::from_millis(300),
        }
    }
}

/// One recorded gateway call, captured when the call is issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub op: GatewayOp,
    pub id: Option<TimerId>,
    pub patch: Option<TimerPatch>,
}

/// Timer store held in process memory.
///
/// Faults registered with [`InMemoryGateway::fail`] make matching calls fail
/// with a network error after their latency elapses, until cleared.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    timers: Mutex<Vec<Timer>>,
    latency: Mutex<GatewayLatency>,
    faults: Mutex<HashSet<(GatewayOp, Option<TimerId>)>>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl InMemoryGateway {
    pub fn new(latency: GatewayLatency) -> Self {
        Self {
            latency: Mutex::new(latency),
            ..Self::default()
        }
    }

    /// Gateway pre-loaded with `timers`
    pub fn with_timers(latency: GatewayLatency, timers: Vec<Timer>) -> Self {
        let gateway = Self::new(latency);
        *lock(&gateway.timers) = timers;
        gateway
    }

    /// Gateway seeded with the three demo timers
    pub fn with_demo_timers(latency: GatewayLatency) -> Self {
        let now = Utc::now().timestamp_millis();
        let demo = |id: &str, name: &str, description: &str, elapsed: u64, age_ms: i64| Timer {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            elapsed,
            is_running: false,
            created_at: now - age_ms,
            started_at: None,
        };
        Self::with_timers(
            latency,
            vec![
                demo("1", "Project Work", "Working on the dashboard project", 3600, 86_400_000),
                demo("2", "Meeting", "Team standup meeting", 1800, 43_200_000),
                demo("3", "Learning", "Async Rust practice", 0, 0),
            ],
        )
    }

    pub fn set_latency(&self, latency: GatewayLatency) {
        *lock(&self.latency) = latency;
    }

    /// Make `op` fail, for one timer or for every timer when `id` is `None`
    pub fn fail(&self, op: GatewayOp, id: Option<&str>) {
        lock(&self.faults).insert((op, id.map(str::to_string)));
    }

    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    /// Calls issued so far, in issue order
    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_for(&self, op: GatewayOp) -> Vec<GatewayCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Stored copy of a timer, bypassing latency and faults
    pub fn stored(&self, id: &str) -> Option<Timer> {
        lock(&self.timers).iter().find(|t| t.id == id).cloned()
    }

    /// Record the call, wait out its latency, then apply any matching fault
    async fn round_trip(
        &self,
        op: GatewayOp,
        id: Option<&str>,
        patch: Option<&TimerPatch>,
    ) -> Result<(), GatewayError> {
        lock(&self.calls).push(GatewayCall {
            op,
            id: id.map(str::to_string),
            patch: patch.cloned(),
        });

        let delay = lock(&self.latency).for_op(op);
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let failing = {
            let faults = lock(&self.faults);
            faults.contains(&(op, None))
                || id.is_some_and(|id| faults.contains(&(op, Some(id.to_string()))))
        };
        if failing {
            warn!("Simulated {:?} failure for {:?}", op, id);
            return Err(GatewayError::Network(format!("simulated {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl TimerGateway for InMemoryGateway {
    async fn list(&self) -> Result<Vec<Timer>, GatewayError> {
        self.round_trip(GatewayOp::List, None, None).await?;
        Ok(lock(&self.timers).clone())
    }

    async fn get(&self, id: &str) -> Result<Timer, GatewayError> {
        self.round_trip(GatewayOp::Get, Some(id), None).await?;
        self.stored(id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn create(&self, fields: NewTimer) -> Result<Timer, GatewayError> {
        self.round_trip(GatewayOp::Create, None, None).await?;
        let timer = fields.into_timer(Uuid::new_v4().simple().to_string());
        debug!("Stored new timer {}", timer.id);
        lock(&self.timers).push(timer.clone());
        Ok(timer)
    }

    async fn update(&self, id: &str, patch: TimerPatch) -> Result<Timer, GatewayError> {
        self.round_trip(GatewayOp::Update, Some(id), Some(&patch)).await?;
        let mut timers = lock(&self.timers);
        let timer = timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        timer.apply(&patch);
        Ok(timer.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.round_trip(GatewayOp::Delete, Some(id), None).await?;
        let mut timers = lock(&self.timers);
        let before = timers.len();
        timers.retain(|t| t.id != id);
        if timers.len() == before {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
