//! Connection Registry
//!
//! Process-wide map from user id to the live connection for that user.
//! One connection per user is tracked; a new connection replaces the
//! previous entry without closing the previous transport.
//!
//! The map sits behind a single readers-writer lock. Lookups and broadcasts
//! take the read side, add/remove take the write side, and no transport
//! I/O ever happens while the lock is held: broadcasts snapshot the handle
//! set and enqueue outside the lock into each connection's bounded queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use super::messages::OutboundEnvelope;
use crate::application::services::OnlineUsers;
use crate::domain::PresenceStatus;
use crate::infrastructure::metrics;

/// Registry-side reference to one live connection.
///
/// The owning [`ConnectionActor`](super::connection::ConnectionActor) holds
/// the receiving end of the outbound queue.
#[derive(Debug)]
pub struct ConnectionHandle {
    user_id: Uuid,
    username: String,
    connection_id: Uuid,
    outbound: Mutex<Option<mpsc::Sender<OutboundEnvelope>>>,
    closed: AtomicBool,
    unhealthy: Notify,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end of its outbound queue.
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Arc::new(Self {
            user_id,
            username: username.into(),
            connection_id: Uuid::new_v4(),
            outbound: Mutex::new(Some(tx)),
            closed: AtomicBool::new(false),
            unhealthy: Notify::new(),
        });
        (handle, rx)
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Enqueue an envelope without waiting.
    ///
    /// A full queue marks the connection unhealthy and wakes its actor to
    /// tear it down; the envelope is dropped. Returns whether the envelope
    /// was queued.
    pub fn send(&self, envelope: OutboundEnvelope) -> bool {
        let guard = self.outbound.lock();
        let Some(tx) = guard.as_ref() else {
            return false;
        };

        match tx.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                drop(guard);
                tracing::warn!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    dropped = dropped.kind(),
                    "Outbound queue full, tearing down slow connection"
                );
                metrics::record_queue_overflow();
                self.unhealthy.notify_one();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Resolves once the connection has been marked unhealthy.
    pub async fn unhealthy(&self) {
        self.unhealthy.notified().await
    }

    /// Close the outbound queue. Queued envelopes can still be drained;
    /// later sends fail immediately. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.outbound.lock().take();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Live connection lookup table
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, Arc<ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` as the connection for its user, replacing any
    /// previous entry, and announce the user as online to everyone else.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        let (replaced, peers, count) = {
            let mut connections = self.connections.write();
            let replaced = connections.insert(handle.user_id, handle.clone());
            let peers = Self::peers_of(&connections, handle.user_id);
            (replaced, peers, connections.len())
        };

        metrics::set_websocket_connections(count);

        match replaced {
            Some(previous) => tracing::info!(
                user_id = %handle.user_id,
                connection_id = %handle.connection_id,
                replaced_connection_id = %previous.connection_id,
                "Connection replaced"
            ),
            None => tracing::info!(
                user_id = %handle.user_id,
                connection_id = %handle.connection_id,
                "Connection registered"
            ),
        }

        let online =
            OutboundEnvelope::presence(handle.user_id, &handle.username, PresenceStatus::Online);
        Self::fan_out(&peers, &online);
    }

    /// Unregister `handle` if it is still the current connection for its
    /// user and announce the user as offline. A stale handle leaves the
    /// registry untouched. The handle's queue is closed in either case.
    ///
    /// Returns whether the registry entry was removed.
    pub fn remove(&self, handle: &Arc<ConnectionHandle>) -> bool {
        let removed = {
            let mut connections = self.connections.write();
            let is_current = connections
                .get(&handle.user_id)
                .is_some_and(|current| current.connection_id == handle.connection_id);

            if is_current {
                connections.remove(&handle.user_id);
                Some((Self::peers_of(&connections, handle.user_id), connections.len()))
            } else {
                None
            }
        };

        let was_current = match removed {
            Some((peers, count)) => {
                metrics::set_websocket_connections(count);
                tracing::info!(
                    user_id = %handle.user_id,
                    connection_id = %handle.connection_id,
                    "Connection removed"
                );
                let offline = OutboundEnvelope::presence(
                    handle.user_id,
                    &handle.username,
                    PresenceStatus::Offline,
                );
                Self::fan_out(&peers, &offline);
                true
            }
            None => {
                tracing::debug!(
                    user_id = %handle.user_id,
                    connection_id = %handle.connection_id,
                    "Stale connection removal ignored"
                );
                false
            }
        };

        handle.close();
        was_current
    }

    /// Best-effort push to one user. `false` means the user is not
    /// connected (or the connection could not take the envelope); it is
    /// not an error.
    pub fn send_to_user(&self, user_id: Uuid, envelope: OutboundEnvelope) -> bool {
        match self.current(user_id) {
            Some(handle) => handle.send(envelope),
            None => false,
        }
    }

    /// Push `envelope` to every connection except `user_id`'s.
    pub fn broadcast_except(&self, user_id: Uuid, envelope: &OutboundEnvelope) {
        let peers = Self::peers_of(&self.connections.read(), user_id);
        Self::fan_out(&peers, envelope);
    }

    /// The connection currently registered for `user_id`.
    pub fn current(&self, user_id: Uuid) -> Option<Arc<ConnectionHandle>> {
        self.connections.read().get(&user_id).cloned()
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.connections.read().contains_key(&user_id)
    }

    pub fn connected_count(&self) -> usize {
        self.connections.read().len()
    }

    fn peers_of(
        connections: &HashMap<Uuid, Arc<ConnectionHandle>>,
        user_id: Uuid,
    ) -> Vec<Arc<ConnectionHandle>> {
        connections
            .iter()
            .filter(|(id, _)| **id != user_id)
            .map(|(_, handle)| handle.clone())
            .collect()
    }

    fn fan_out(peers: &[Arc<ConnectionHandle>], envelope: &OutboundEnvelope) {
        for peer in peers {
            peer.send(envelope.clone());
        }
    }
}

impl OnlineUsers for ConnectionRegistry {
    fn is_online(&self, user_id: Uuid) -> bool {
        self.is_connected(user_id)
    }
}
