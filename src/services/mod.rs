//! Persistence services module
//!
//! The gateway contract the engine talks to, plus the in-memory store used by
//! the binary and the tests.

pub mod gateway;
pub mod memory;

// Re-export main types
pub use gateway::TimerGateway;
pub use memory::{GatewayCall, GatewayLatency, GatewayOp, InMemoryGateway};
