//! Message Router
//!
//! Dispatches decoded inbound envelopes and drives the direct-message
//! delivery protocol:
//!
//! ```text
//! received -> ack(sent) -> persisted -> ack(delivered) -> forwarded | recipient offline
//! ```
//!
//! The router holds no per-connection state. Handlers for different
//! connections may run concurrently; a single connection's handlers run one
//! at a time because its inbound loop awaits each call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::messages::{
    AckStatus, DecodeError, DirectMessagePayload, DirectMessagePush, ErrorCode, InboundEnvelope,
    MessageAck, OutboundEnvelope, PresencePayload, ReadReceiptForward, ReadReceiptPayload,
    TypingForward, TypingIndicatorPayload,
};
use super::registry::{ConnectionHandle, ConnectionRegistry};
use crate::domain::{
    ConversationId, ConversationStore, DirectMessage, PresenceStatus, UserRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::validation::describe;

pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn ConversationStore>,
    users: Arc<dyn UserRepository>,
    store_timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn ConversationStore>,
        users: Arc<dyn UserRepository>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            users,
            store_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Decode one text frame and route it. Undecodable frames are answered
    /// with an `error` envelope on the same connection.
    pub async fn handle_frame(&self, origin: &ConnectionHandle, text: &str) {
        match InboundEnvelope::decode(text) {
            Ok(envelope) => self.route(origin, envelope).await,
            Err(DecodeError::UnsupportedType(kind)) => {
                tracing::warn!(user_id = %origin.user_id(), kind = %kind, "Unknown message type received");
                metrics::record_envelope("unsupported");
                origin.send(OutboundEnvelope::error(
                    ErrorCode::UnsupportedType,
                    "Invalid message type",
                    &kind,
                ));
            }
            Err(DecodeError::Malformed { kind, reason }) => {
                tracing::debug!(user_id = %origin.user_id(), kind = %kind, reason = %reason, "Malformed frame");
                metrics::record_envelope("malformed");
                origin.send(OutboundEnvelope::error(
                    ErrorCode::BadRequest,
                    format!("Invalid message format: {}", reason),
                    &kind,
                ));
            }
        }
    }

    pub async fn route(&self, origin: &ConnectionHandle, envelope: InboundEnvelope) {
        metrics::record_envelope(envelope.kind());
        tracing::trace!(user_id = %origin.user_id(), kind = envelope.kind(), "Routing envelope");

        match envelope {
            InboundEnvelope::DirectMessage(payload) => {
                self.handle_direct_message(origin, payload).await
            }
            InboundEnvelope::TypingIndicator(payload) => {
                self.handle_typing_indicator(origin, payload)
            }
            InboundEnvelope::ReadReceipt(payload) => self.handle_read_receipt(origin, payload),
            InboundEnvelope::Presence(payload) => self.handle_presence(origin, payload).await,
        }
    }

    /// Persist a user's presence. Failures are logged and swallowed.
    pub async fn persist_presence(&self, origin: &ConnectionHandle, status: PresenceStatus) {
        let user_id = origin.user_id();
        let result = self
            .with_deadline(
                "update_status",
                self.users.update_status(user_id, origin.username(), status),
            )
            .await;

        if let Err(e) = result {
            tracing::warn!(user_id = %user_id, status = %status, error = %e, "Failed to persist presence");
        }
    }

    /// Persist `offline` for a connection that has already left the
    /// registry. Skipped when the user has connected again in the meantime.
    pub async fn persist_offline(&self, origin: &ConnectionHandle) {
        if self.registry.is_connected(origin.user_id()) {
            tracing::debug!(
                user_id = %origin.user_id(),
                connection_id = %origin.connection_id(),
                "User reconnected before teardown, keeping status"
            );
            return;
        }
        self.persist_presence(origin, PresenceStatus::Offline).await;
    }

    async fn handle_direct_message(&self, origin: &ConnectionHandle, payload: DirectMessagePayload) {
        const KIND: &str = "direct_message";

        if let Err(errors) = payload.validate() {
            origin.send(OutboundEnvelope::error(
                ErrorCode::BadRequest,
                describe(&errors),
                KIND,
            ));
            return;
        }

        let Some(recipient_id) = self.parse_recipient(origin, &payload.recipient_id, KIND) else {
            return;
        };

        let DirectMessagePayload {
            content,
            message_id: client_message_id,
            ..
        } = payload;

        let message = DirectMessage::new(
            Uuid::now_v7(),
            origin.user_id(),
            recipient_id,
            content,
            Utc::now(),
        );

        origin.send(OutboundEnvelope::MessageAck(MessageAck {
            client_message_id: client_message_id.clone(),
            server_message_id: Some(message.id),
            status: AckStatus::Sent,
            timestamp: Some(Utc::now()),
        }));

        if let Err(e) = self
            .with_deadline("append", self.store.append(&message))
            .await
        {
            tracing::error!(
                message_id = %message.id,
                sender_id = %message.sender_id,
                recipient_id = %recipient_id,
                error = %e,
                "Failed to persist direct message"
            );
            metrics::record_message_persisted(false);
            origin.send(OutboundEnvelope::error(
                ErrorCode::ServerError,
                "Failed to save message",
                KIND,
            ));
            return;
        }

        metrics::record_message_persisted(true);
        tracing::debug!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            recipient_id = %recipient_id,
            "Direct message persisted"
        );

        origin.send(OutboundEnvelope::MessageAck(MessageAck {
            client_message_id,
            server_message_id: Some(message.id),
            status: AckStatus::Delivered,
            timestamp: Some(Utc::now()),
        }));

        if !self.registry.is_connected(recipient_id) {
            tracing::debug!(message_id = %message.id, recipient_id = %recipient_id, "Recipient offline");
            return;
        }

        // The flag must be set before the push is attempted.
        if let Err(e) = self
            .with_deadline("mark_delivered", self.store.mark_delivered(message.id))
            .await
        {
            tracing::warn!(message_id = %message.id, error = %e, "Failed to mark message delivered");
        }

        let push = OutboundEnvelope::DirectMessage(DirectMessagePush {
            message_id: message.id,
            conversation_id: message.conversation_id(),
            sender_id: message.sender_id,
            sender_username: origin.username().to_string(),
            content: message.content,
            timestamp: message.created_at,
        });

        let forwarded = self.registry.send_to_user(recipient_id, push);
        tracing::debug!(message_id = %message.id, recipient_id = %recipient_id, forwarded, "Direct message forwarded");
    }

    fn handle_typing_indicator(&self, origin: &ConnectionHandle, payload: TypingIndicatorPayload) {
        const KIND: &str = "typing_indicator";

        if let Err(errors) = payload.validate() {
            origin.send(OutboundEnvelope::error(
                ErrorCode::BadRequest,
                describe(&errors),
                KIND,
            ));
            return;
        }

        let Some(recipient_id) = self.parse_recipient(origin, &payload.recipient_id, KIND) else {
            return;
        };

        self.registry.send_to_user(
            recipient_id,
            OutboundEnvelope::TypingIndicator(TypingForward {
                user_id: origin.user_id(),
                username: origin.username().to_string(),
                conversation_id: ConversationId::derive(origin.user_id(), recipient_id),
                status: payload.status,
            }),
        );
    }

    fn handle_read_receipt(&self, origin: &ConnectionHandle, payload: ReadReceiptPayload) {
        const KIND: &str = "read_receipt";

        let conversation_id = match payload.conversation_id.parse::<ConversationId>() {
            Ok(id) => id,
            Err(e) => {
                origin.send(OutboundEnvelope::error(
                    ErrorCode::InvalidConversation,
                    format!("Invalid conversation ID: {}", e),
                    KIND,
                ));
                return;
            }
        };

        let Some(other_user_id) = conversation_id.counterpart(origin.user_id()) else {
            origin.send(OutboundEnvelope::error(
                ErrorCode::InvalidConversation,
                "Not a participant of this conversation",
                KIND,
            ));
            return;
        };

        let Ok(last_read_message_id) = Uuid::try_parse(&payload.last_read_message_id) else {
            origin.send(OutboundEnvelope::error(
                ErrorCode::BadRequest,
                "Invalid last_read_message_id",
                KIND,
            ));
            return;
        };

        self.registry.send_to_user(
            other_user_id,
            OutboundEnvelope::ReadReceipt(ReadReceiptForward {
                user_id: origin.user_id(),
                username: origin.username().to_string(),
                conversation_id,
                last_read_message_id,
                timestamp: Utc::now(),
            }),
        );
    }

    async fn handle_presence(&self, origin: &ConnectionHandle, payload: PresencePayload) {
        const KIND: &str = "presence";

        let status = match payload.status.parse::<PresenceStatus>() {
            Ok(status) => status,
            Err(_) => {
                origin.send(OutboundEnvelope::error(
                    ErrorCode::BadRequest,
                    "Invalid status value",
                    KIND,
                ));
                return;
            }
        };

        self.persist_presence(origin, status).await;

        self.registry.broadcast_except(
            origin.user_id(),
            &OutboundEnvelope::presence(origin.user_id(), origin.username(), status),
        );
    }

    /// Parse a recipient id, answering with `InvalidRecipient` on failure.
    fn parse_recipient(&self, origin: &ConnectionHandle, raw: &str, kind: &str) -> Option<Uuid> {
        match Uuid::try_parse(raw) {
            Ok(id) if id == origin.user_id() => {
                origin.send(OutboundEnvelope::error(
                    ErrorCode::InvalidRecipient,
                    "Recipient must be another user",
                    kind,
                ));
                None
            }
            Ok(id) => Some(id),
            Err(_) => {
                origin.send(OutboundEnvelope::error(
                    ErrorCode::InvalidRecipient,
                    "Invalid recipient ID",
                    kind,
                ));
                None
            }
        }
    }

    async fn with_deadline<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{} exceeded {:?}",
                operation, self.store_timeout
            ))),
        }
    }
}
