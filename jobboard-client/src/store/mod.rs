//! Chat slice of the client state.
//!
//! [`ChatState`] is a yewdux store mutated only through [`ChatAction`]
//! reducers; nothing outside this module assigns its fields.

mod reducer;

#[cfg(test)]
mod reducer_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shared::models::{Contact, Message, MessageId, Timestamp, UserId};
use uuid::Uuid;
use yewdux::Store;

pub use reducer::ChatAction;

/// Tag bound to one history fetch; results carrying an older token are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

/// Lifecycle of the open conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationPhase {
    #[default]
    NoContactSelected,
    LoadingHistory,
    Ready,
}

/// Whether the backend exposes per-message read state.
///
/// When it does not, unread counters are pinned to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadTracking {
    #[default]
    Available,
    Unavailable,
}

/// The history fetch the store is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub contact_id: UserId,
    pub token: RequestToken,
}

/// Optimistic placeholder for a message that has not been confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub client_id: Uuid,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
    pub created_at: Timestamp,
}

impl PendingMessage {
    #[must_use]
    pub fn new(sender_id: UserId, recipient_id: UserId, body: impl Into<String>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            body: body.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// A row of the rendered conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatEntry {
    Confirmed(Message),
    Pending(PendingMessage),
}

impl ChatEntry {
    #[must_use]
    pub const fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::Confirmed(message) => Some(message.id),
            Self::Pending(_) => None,
        }
    }

    #[must_use]
    pub const fn sender_id(&self) -> UserId {
        match self {
            Self::Confirmed(message) => message.sender_id,
            Self::Pending(pending) => pending.sender_id,
        }
    }

    #[must_use]
    pub const fn recipient_id(&self) -> UserId {
        match self {
            Self::Confirmed(message) => message.recipient_id,
            Self::Pending(pending) => pending.recipient_id,
        }
    }

    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::Confirmed(message) => &message.body,
            Self::Pending(pending) => &pending.body,
        }
    }

    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        match self {
            Self::Confirmed(message) => message.created_at,
            Self::Pending(pending) => pending.created_at,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    #[must_use]
    pub const fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Confirmed(message) => Some(message),
            Self::Pending(_) => None,
        }
    }
}

/// Contacts, messages, and presence for the signed-in user.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Store)]
pub struct ChatState {
    pub current_user: Option<UserId>,
    pub contacts: Vec<Contact>,
    pub messages: Vec<ChatEntry>,
    pub active_contact: Option<UserId>,
    pub presence: BTreeSet<UserId>,
    pub read_tracking: ReadTracking,
    pub history_request: Option<HistoryRequest>,
    pub phase: ConversationPhase,
}

impl ChatState {
    #[must_use]
    pub fn contact(&self, id: UserId) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.id == id)
    }

    #[must_use]
    pub fn active(&self) -> Option<&Contact> {
        self.active_contact.and_then(|id| self.contact(id))
    }

    #[must_use]
    pub fn is_online(&self, id: UserId) -> bool {
        self.presence.contains(&id)
    }

    /// The conversation partner an entry belongs to, relative to the current user.
    #[must_use]
    pub fn counterpart_of(&self, entry: &ChatEntry) -> UserId {
        match self.current_user {
            Some(me) if entry.sender_id() == me => entry.recipient_id(),
            Some(_) => entry.sender_id(),
            None => entry.recipient_id(),
        }
    }

    pub(crate) fn message_belongs_to(&self, message: &Message, contact: UserId) -> bool {
        match self.current_user {
            Some(me) => message.involves(me) && message.counterpart(me) == contact,
            None => message.involves(contact),
        }
    }

    /// Entries exchanged with `contact`, in store order.
    pub fn conversation(&self, contact: UserId) -> impl Iterator<Item = &ChatEntry> + '_ {
        self.messages
            .iter()
            .filter(move |entry| self.counterpart_of(entry) == contact)
    }

    #[must_use]
    pub fn has_message(&self, id: MessageId) -> bool {
        self.messages
            .iter()
            .any(|entry| entry.message_id() == Some(id))
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|entry| entry.is_pending()).count()
    }

    #[must_use]
    pub fn unread_total(&self) -> u32 {
        self.contacts
            .iter()
            .map(|contact| contact.unread_count)
            .fold(0, u32::saturating_add)
    }

    pub(crate) fn contact_mut(&mut self, id: UserId) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|contact| contact.id == id)
    }
}
