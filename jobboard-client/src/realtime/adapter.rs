use std::collections::BTreeSet;

use futures_util::StreamExt;
use shared::models::{
    Message, PresenceMember, PresenceMeta, RealtimeEvent, SendMessageRequest, UserId,
};
use tracing::{debug, info, warn};

use super::{ChannelSpec, EventStream, MESSAGES_TABLE, RealtimeTransport};
use crate::{
    error::{ErrorKind, GatewayError, GatewayResult},
    gateway::ChatGateway,
};

/// Chat-facing operations over a realtime transport and the message gateway.
#[derive(Debug)]
pub struct RealtimeSync<T, G> {
    transport: T,
    gateway: G,
    presence_topic: String,
}

impl<T: RealtimeTransport, G: ChatGateway> RealtimeSync<T, G> {
    pub fn new(transport: T, gateway: G, presence_topic: impl Into<String>) -> Self {
        Self {
            transport,
            gateway,
            presence_topic: presence_topic.into(),
        }
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Join the presence channel as `current_user` and announce it online.
    ///
    /// # Errors
    /// Fails when the channel cannot be opened. A rejected `track` is only logged.
    pub async fn subscribe_presence(
        &self,
        current_user: UserId,
    ) -> GatewayResult<PresenceSubscription> {
        let channel = ChannelSpec::presence(self.presence_topic.clone(), current_user);
        let events = self.transport.subscribe(&channel).await?;
        if let Err(err) = self
            .transport
            .track(&channel, &PresenceMeta::online(current_user))
            .await
        {
            warn!(topic = %channel.topic, error = %err, "presence track failed");
        } else {
            info!(topic = %channel.topic, user_id = %current_user, "presence tracked");
        }
        Ok(PresenceSubscription { channel, events })
    }

    /// Withdraw presence. Best-effort: failures are logged and otherwise ignored.
    pub async fn untrack(&self, subscription: &PresenceSubscription) {
        match self.transport.untrack(&subscription.channel).await {
            Ok(()) => debug!(topic = %subscription.channel.topic, "presence untracked"),
            Err(err) => warn!(
                topic = %subscription.channel.topic,
                error = %err,
                "presence untrack failed"
            ),
        }
    }

    /// Open the insert feed for messages sent or received by `current_user`.
    ///
    /// Delivery is at-least-once; callers drop duplicates.
    ///
    /// # Errors
    /// Fails when the channel cannot be opened.
    pub async fn subscribe_message_inserts(
        &self,
        current_user: UserId,
    ) -> GatewayResult<MessageInserts> {
        let channel = ChannelSpec::message_inserts(current_user);
        let events = self.transport.subscribe(&channel).await?;
        Ok(MessageInserts {
            current_user,
            events,
        })
    }

    /// Every message between the two parties, oldest first.
    ///
    /// # Errors
    /// Returns the gateway error unchanged; callers decide how to degrade.
    pub async fn fetch_history(
        &self,
        current_user: UserId,
        contact: UserId,
    ) -> GatewayResult<Vec<Message>> {
        let mut messages = self.gateway.fetch_history(current_user, contact).await?;
        messages.sort_by_key(|message| message.created_at);
        debug!(contact_id = %contact, count = messages.len(), "history fetched");
        Ok(messages)
    }

    /// Insert a message row. The returned record carries the server id and timestamp.
    ///
    /// # Errors
    /// Returns the gateway error when the insert is rejected.
    pub async fn send_message(
        &self,
        current_user: UserId,
        contact: UserId,
        body: &str,
    ) -> GatewayResult<Message> {
        let request = SendMessageRequest {
            sender_id: current_user,
            recipient_id: contact,
            body: body.to_string(),
        };
        let message = self.gateway.send_message(&request).await?;
        debug!(message_id = %message.id, contact_id = %contact, "message stored");
        Ok(message)
    }
}

/// Live presence channel membership.
pub struct PresenceSubscription {
    channel: ChannelSpec,
    events: EventStream,
}

impl std::fmt::Debug for PresenceSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSubscription")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl PresenceSubscription {
    pub const fn channel(&self) -> &ChannelSpec {
        &self.channel
    }

    /// The next full member set. `None` once the channel closes.
    pub async fn next_members(&mut self) -> Option<GatewayResult<BTreeSet<UserId>>> {
        loop {
            match self.events.next().await? {
                Ok(RealtimeEvent::PresenceSync { payload }) => {
                    return Some(Ok(member_ids(&payload.members)));
                }
                Ok(RealtimeEvent::Error { payload }) => {
                    return Some(Err(stream_error(&payload.code, &payload.message)));
                }
                Ok(RealtimeEvent::RowInsert { .. }) => {}
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

fn member_ids(members: &[PresenceMember]) -> BTreeSet<UserId> {
    members
        .iter()
        .filter_map(|member| match member.key.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(_) => {
                debug!(key = %member.key, "ignoring presence key that is not a user id");
                None
            }
        })
        .collect()
}

fn stream_error(code: &str, message: &str) -> GatewayError {
    GatewayError::new(ErrorKind::Server, format!("{code}: {message}"))
}

/// Message rows inserted for one user.
pub struct MessageInserts {
    current_user: UserId,
    events: EventStream,
}

impl std::fmt::Debug for MessageInserts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageInserts")
            .field("current_user", &self.current_user)
            .finish_non_exhaustive()
    }
}

impl MessageInserts {
    /// The next inserted message involving the user. `None` once the channel closes.
    ///
    /// Rows from other tables, rows that do not decode as messages, and rows
    /// not involving the user are skipped.
    pub async fn next_message(&mut self) -> Option<GatewayResult<Message>> {
        loop {
            match self.events.next().await? {
                Ok(RealtimeEvent::RowInsert { payload }) => {
                    if payload.table != MESSAGES_TABLE {
                        continue;
                    }
                    match serde_json::from_value::<Message>(payload.record) {
                        Ok(message) if message.involves(self.current_user) => {
                            return Some(Ok(message));
                        }
                        Ok(message) => {
                            debug!(message_id = %message.id, "ignoring insert for another user");
                        }
                        Err(err) => warn!(error = %err, "message insert did not decode"),
                    }
                }
                Ok(RealtimeEvent::Error { payload }) => {
                    return Some(Err(stream_error(&payload.code, &payload.message)));
                }
                Ok(RealtimeEvent::PresenceSync { .. }) => {}
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// Invoke `on_insert` for every message until the channel closes.
    ///
    /// Stream errors are logged and skipped. Returns the number of messages delivered.
    pub async fn run(mut self, mut on_insert: impl FnMut(Message)) -> usize {
        let mut delivered = 0;
        while let Some(item) = self.next_message().await {
            match item {
                Ok(message) => {
                    on_insert(message);
                    delivered += 1;
                }
                Err(err) => warn!(error = %err, "message insert stream error"),
            }
        }
        delivered
    }
}
