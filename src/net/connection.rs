//! Upgraded-connection tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Bound the number of connections holding a slot: handshakes still in
//!   flight plus upgraded sockets
//! - Release the slot when the request or connection task ends, however it ends

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks slot holders (in-flight handshakes and upgraded sockets) against a limit.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    slots: Arc<Semaphore>,
    max_connections: usize,
}

impl ConnectionTracker {
    pub fn new(max_connections: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        }
    }

    /// Reserve a slot for a new connection, or `None` if the limit is reached.
    ///
    /// The slot is held by the returned guard and released when it drops.
    pub fn try_track(&self) -> Option<ConnectionGuard> {
        let permit = Arc::clone(&self.slots).try_acquire_owned().ok()?;
        let guard = ConnectionGuard {
            _permit: permit,
            id: ConnectionId::new(),
            tracker: self.clone(),
        };
        metrics::connection_opened();
        Some(guard)
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// Guard that tracks a connection's lifetime.
/// Releases the slot when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    _permit: OwnedSemaphorePermit,
    id: ConnectionId,
    tracker: ConnectionTracker,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("conn-"));
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new(8);
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.try_track().unwrap();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.try_track().unwrap();
        assert_eq!(tracker.active_count(), 2);
        assert_ne!(guard1.id(), guard2.id());

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn connection_tracker_limit() {
        let tracker = ConnectionTracker::new(1);
        let guard = tracker.try_track().unwrap();
        assert!(tracker.try_track().is_none());

        drop(guard);
        assert!(tracker.try_track().is_some());
    }

    #[test]
    fn connection_tracker_concurrent_release() {
        let tracker = ConnectionTracker::new(64);
        let guards: Vec<_> = (0..64).map(|_| tracker.try_track().unwrap()).collect();
        assert_eq!(tracker.active_count(), 64);
        assert!(tracker.try_track().is_none());

        let handles: Vec<_> = guards
            .into_iter()
            .map(|guard| std::thread::spawn(move || drop(guard)))
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.active_count(), 0);
        let again: Vec<_> = (0..64).map(|_| tracker.try_track().unwrap()).collect();
        assert_eq!(again.len(), 64);
    }
}
