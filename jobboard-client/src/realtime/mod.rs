//! Realtime synchronization.
//!
//! A [`RealtimeTransport`] delivers pushed events for a channel and carries
//! presence heartbeats. [`RealtimeSync`] builds the chat-specific
//! subscriptions on top of it.

mod adapter;
#[cfg(test)]
pub(crate) mod memory;
mod sse;

use async_trait::async_trait;
use futures_util::stream::LocalBoxStream;
use shared::models::{PresenceMeta, RealtimeEvent, UserId};

use crate::error::GatewayResult;

pub use adapter::{MessageInserts, PresenceSubscription, RealtimeSync};
pub use sse::{SseDecoder, SseFrame, SseTransport};

/// Events delivered by a subscription, in arrival order.
pub type EventStream = LocalBoxStream<'static, GatewayResult<RealtimeEvent>>;

pub const MESSAGES_TABLE: &str = "messages";

/// Equality predicate on a row column, rendered as `column=eq.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{}=eq.{}", self.column, self.value)
    }
}

/// A named topic plus what the subscriber wants from it.
///
/// `filters` are alternatives: a row matches when any of them does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub topic: String,
    pub table: Option<String>,
    pub filters: Vec<RowFilter>,
    pub presence_key: Option<String>,
}

impl ChannelSpec {
    /// Presence channel where this client is known by `key`.
    pub fn presence(topic: impl Into<String>, key: UserId) -> Self {
        Self {
            topic: topic.into(),
            table: None,
            filters: Vec::new(),
            presence_key: Some(key.to_string()),
        }
    }

    /// Message rows sent or received by `user`.
    #[must_use]
    pub fn message_inserts(user: UserId) -> Self {
        Self {
            topic: format!("messages:{user}"),
            table: Some(MESSAGES_TABLE.to_string()),
            filters: vec![
                RowFilter::eq("sender_id", user),
                RowFilter::eq("recipient_id", user),
            ],
            presence_key: None,
        }
    }
}

/// Connection to the publish/subscribe backend.
#[async_trait(?Send)]
pub trait RealtimeTransport {
    /// Open a subscription. The stream ends when the server closes it.
    async fn subscribe(&self, channel: &ChannelSpec) -> GatewayResult<EventStream>;

    /// Announce this client as present on the channel.
    async fn track(&self, channel: &ChannelSpec, meta: &PresenceMeta) -> GatewayResult<()>;

    /// Withdraw this client's presence.
    async fn untrack(&self, channel: &ChannelSpec) -> GatewayResult<()>;
}
