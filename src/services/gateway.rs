//! Persistence gateway contract consumed by the engine

use async_trait::async_trait;

use crate::{
    error::GatewayError,
    state::{NewTimer, Timer, TimerPatch},
};

/// Asynchronous store of timers.
///
/// Every call may be slow and may fail independently. Implementations must not
/// block the caller's executor thread while waiting.
#[async_trait]
pub trait TimerGateway: Send + Sync {
    /// Fetch every timer in insertion order
    async fn list(&self) -> Result<Vec<Timer>, GatewayError>;

    async fn get(&self, id: &str) -> Result<Timer, GatewayError>;

    /// Store a new timer; the gateway assigns its id
    async fn create(&self, fields: NewTimer) -> Result<Timer, GatewayError>;

    /// Merge `patch` into the stored timer and return the stored result
    async fn update(&self, id: &str, patch: TimerPatch) -> Result<Timer, GatewayError>;

    async fn delete(&self, id: &str) -> Result<(), GatewayError>;
}
