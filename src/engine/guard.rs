//! Stale-response and teardown guards for asynchronous call sites

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use tokio::task::JoinHandle;
use tracing::warn;

/// Monotonic sequence counter for one logical operation stream.
///
/// Each issued operation takes a [`Ticket`]; a response may only be applied
/// while its ticket is still the latest issued on the stream.
#[derive(Debug, Clone, Default)]
pub struct SequenceGuard {
    latest: Arc<AtomicU64>,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new operation, superseding every earlier ticket
    pub fn issue(&self) -> Ticket {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            seq,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Tag a follow-up call with the current sequence without superseding it
    pub fn observe(&self) -> Ticket {
        Ticket {
            seq: self.latest.load(Ordering::SeqCst),
            latest: Arc::clone(&self.latest),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    seq: u64,
    latest: Arc<AtomicU64>,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// True while no newer operation has been issued on the stream
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.seq
    }
}

/// Mounted flag shared by an owner and its in-flight response handlers
#[derive(Debug, Clone)]
pub struct Lifecycle {
    mounted: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn mounted() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Returns false if already unmounted
    pub fn unmount(&self) -> bool {
        self.mounted.swap(false, Ordering::SeqCst)
    }
}

/// An asynchronous operation that has been issued and not yet observed.
///
/// Dropping it detaches the operation; it still completes in the background.
#[derive(Debug)]
pub struct InFlight {
    handle: JoinHandle<()>,
}

impl InFlight {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Wait until the gateway call has resolved and its result was handled
    pub async fn settled(self) {
        if let Err(e) = self.handle.await {
            warn!("In-flight operation did not complete: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let guard = SequenceGuard::new();
        let start = guard.issue();
        assert!(start.is_current());

        let pause = guard.issue();
        assert!(!start.is_current());
        assert!(pause.is_current());
        assert!(pause.seq() > start.seq());
    }

    #[test]
    fn test_observe_does_not_supersede() {
        let guard = SequenceGuard::new();
        let op = guard.issue();
        let flush = guard.observe();

        assert!(op.is_current());
        assert!(flush.is_current());

        guard.issue();
        assert!(!flush.is_current());
    }

    #[test]
    fn test_streams_are_independent() {
        let status = SequenceGuard::new();
        let edits = SequenceGuard::new();
        let save = edits.issue();
        status.issue();
        status.issue();
        assert!(save.is_current());
    }

    #[test]
    fn test_lifecycle_unmounts_once() {
        let lifecycle = Lifecycle::mounted();
        let shared = lifecycle.clone();
        assert!(shared.is_mounted());
        assert!(lifecycle.unmount());
        assert!(!shared.is_mounted());
        assert!(!lifecycle.unmount());
    }
}
