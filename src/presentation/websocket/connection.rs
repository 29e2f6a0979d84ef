//! Connection Actor
//!
//! One actor per live WebSocket. The inbound loop decodes frames and hands
//! them to the [`MessageRouter`] one at a time; the outbound loop drains the
//! connection's bounded queue, coalescing whatever is queued into a single
//! newline-separated text frame, and pings the peer on a fixed period.
//!
//! Both loops run inside one task. Whichever finishes first (or an
//! unhealthy signal from the registry side) ends the connection, and the
//! teardown below runs exactly once: registry removal, offline status,
//! transport close.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant, MissedTickBehavior};

use super::messages::{ErrorCode, OutboundEnvelope};
use super::registry::{ConnectionHandle, ConnectionRegistry};
use super::router::MessageRouter;
use super::session::SessionState;
use crate::config::WebSocketSettings;
use crate::domain::PresenceStatus;

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shutdown {
    /// Peer sent a close frame or the stream ended
    PeerClosed,
    /// No inbound frame within the pong timeout
    PongTimeout,
    /// Inbound frame larger than the configured ceiling
    FrameTooLarge(usize),
    /// Outbound queue overflowed
    Unhealthy,
    /// Outbound queue closed by the registry
    QueueClosed,
    /// A write did not complete within the write timeout
    WriteTimeout,
    /// Transport read or write failed
    Transport(String),
}

pub struct ConnectionActor {
    handle: Arc<ConnectionHandle>,
    queue: mpsc::Receiver<OutboundEnvelope>,
    registry: Arc<ConnectionRegistry>,
    router: Arc<MessageRouter>,
    settings: WebSocketSettings,
}

impl ConnectionActor {
    pub fn new(
        user_id: uuid::Uuid,
        username: impl Into<String>,
        router: Arc<MessageRouter>,
        settings: WebSocketSettings,
    ) -> Self {
        let (handle, queue) =
            ConnectionHandle::new(user_id, username, settings.send_queue_capacity);
        Self {
            handle,
            queue,
            registry: router.registry().clone(),
            router,
            settings,
        }
    }

    pub fn handle(&self) -> &Arc<ConnectionHandle> {
        &self.handle
    }

    /// Register the connection and serve it until it ends.
    pub async fn run<R, W, E>(self, mut inbound: R, mut outbound: W) -> Shutdown
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
        W: Sink<Message> + Unpin,
        W::Error: Display,
    {
        let ConnectionActor {
            handle,
            mut queue,
            registry,
            router,
            settings,
        } = self;

        registry.add(handle.clone());
        router.persist_presence(&handle, PresenceStatus::Online).await;

        let mut session = SessionState::new(handle.user_id(), handle.connection_id());

        let reason = {
            let read = read_loop(&handle, &router, &mut inbound, &mut session, &settings);
            let write = write_loop(&mut queue, &mut outbound, &settings);

            tokio::select! {
                reason = read => reason,
                reason = write => reason,
                _ = handle.unhealthy() => Shutdown::Unhealthy,
            }
        };

        // Teardown. A replaced connection leaves the user's status alone.
        if registry.remove(&handle) {
            router.persist_offline(&handle).await;
        }
        if let Err(e) = timeout(settings.write_timeout(), outbound.close()).await.unwrap_or(Ok(())) {
            tracing::debug!(connection_id = %handle.connection_id(), error = %e, "Transport close failed");
        }

        tracing::info!(
            user_id = %handle.user_id(),
            connection_id = %handle.connection_id(),
            frames = session.frames_received,
            duration_secs = session.connected_for().as_secs(),
            reason = ?reason,
            "Connection closed"
        );

        reason
    }
}

async fn read_loop<R, E>(
    handle: &ConnectionHandle,
    router: &MessageRouter,
    inbound: &mut R,
    session: &mut SessionState,
    settings: &WebSocketSettings,
) -> Shutdown
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let deadline = session.read_deadline(settings.pong_timeout());
        let frame = match timeout_at(deadline, inbound.next()).await {
            Err(_) => return Shutdown::PongTimeout,
            Ok(None) => return Shutdown::PeerClosed,
            Ok(Some(Err(e))) => return Shutdown::Transport(e.to_string()),
            Ok(Some(Ok(frame))) => frame,
        };
        session.touch();

        match frame {
            Message::Text(text) => {
                if text.len() > settings.max_message_size {
                    return Shutdown::FrameTooLarge(text.len());
                }
                router.handle_frame(handle, text.as_str()).await;
            }
            Message::Binary(bytes) => {
                if bytes.len() > settings.max_message_size {
                    return Shutdown::FrameTooLarge(bytes.len());
                }
                match std::str::from_utf8(&bytes) {
                    Ok(text) => router.handle_frame(handle, text).await,
                    Err(_) => {
                        handle.send(OutboundEnvelope::error(
                            ErrorCode::BadRequest,
                            "Invalid message format: frame is not UTF-8",
                            "unknown",
                        ));
                    }
                }
            }
            // Pings are answered by the transport; both only refresh the deadline.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Shutdown::PeerClosed,
        }
    }
}

async fn write_loop<W>(
    queue: &mut mpsc::Receiver<OutboundEnvelope>,
    outbound: &mut W,
    settings: &WebSocketSettings,
) -> Shutdown
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let period = settings.ping_interval();
    let mut ping = tokio::time::interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            next = queue.recv() => {
                let Some(first) = next else {
                    return Shutdown::QueueClosed;
                };

                let mut batch = vec![first];
                while let Ok(more) = queue.try_recv() {
                    batch.push(more);
                }

                let Some(text) = encode_batch(&batch) else {
                    continue;
                };
                if let Err(reason) = write(outbound, Message::Text(text.into()), settings).await {
                    return reason;
                }
            }
            _ = ping.tick() => {
                if let Err(reason) = write(outbound, Message::Ping(Default::default()), settings).await {
                    return reason;
                }
            }
        }
    }
}

async fn write<W>(outbound: &mut W, message: Message, settings: &WebSocketSettings) -> Result<(), Shutdown>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    match timeout(settings.write_timeout(), outbound.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Shutdown::Transport(e.to_string())),
        Err(_) => Err(Shutdown::WriteTimeout),
    }
}

/// Serialize queued envelopes into one newline-separated frame.
fn encode_batch(batch: &[OutboundEnvelope]) -> Option<String> {
    let lines: Vec<String> = batch
        .iter()
        .filter_map(|envelope| match serde_json::to_string(envelope) {
            Ok(line) => Some(line),
            Err(e) => {
                tracing::error!(kind = envelope.kind(), error = %e, "Failed to serialize envelope");
                None
            }
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
