//! WebSocket Session State
//!
//! Per-connection bookkeeping owned by the inbound loop.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

/// Inbound-side session state
#[derive(Debug)]
pub struct SessionState {
    pub user_id: Uuid,
    pub connection_id: Uuid,
    pub frames_received: u64,
    pub connected_at: Instant,
    pub last_inbound: Instant,
}

impl SessionState {
    pub fn new(user_id: Uuid, connection_id: Uuid) -> Self {
        let now = Instant::now();
        Self {
            user_id,
            connection_id,
            frames_received: 0,
            connected_at: now,
            last_inbound: now,
        }
    }

    /// Record an inbound frame of any kind, including pongs.
    pub fn touch(&mut self) {
        self.frames_received += 1;
        self.last_inbound = Instant::now();
    }

    /// Instant after which the peer is considered gone.
    pub fn read_deadline(&self, pong_timeout: Duration) -> Instant {
        self.last_inbound + pong_timeout
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
