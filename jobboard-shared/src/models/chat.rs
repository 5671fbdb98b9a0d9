use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Server-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse().map(Self)
    }
}

/// Server-assigned message row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted one-to-one chat message.
///
/// Everything except `read_at` is immutable once the server has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub read_at: Option<Timestamp>,
}

impl Message {
    /// The other party of the conversation as seen by `me`.
    #[must_use]
    pub fn counterpart(&self, me: UserId) -> UserId {
        if self.sender_id == me {
            self.recipient_id
        } else {
            self.sender_id
        }
    }

    /// Whether `user` is the sender or the recipient.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.sender_id == user || self.recipient_id == user
    }

    #[must_use]
    pub const fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

/// Conversation list entry for one counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_ref: Option<String>,
    #[serde(default)]
    pub last_message_preview: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<Timestamp>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Contact {
    /// A contact known only by id, typically first seen through a pushed message.
    #[must_use]
    pub fn placeholder(id: UserId) -> Self {
        Self {
            id,
            display_name: String::new(),
            avatar_ref: None,
            last_message_preview: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    /// Display name, falling back to the numeric id when the name is unknown.
    #[must_use]
    pub fn label(&self) -> String {
        if self.display_name.trim().is_empty() {
            format!("user #{}", self.id)
        } else {
            self.display_name.clone()
        }
    }
}

/// Payload for inserting a new message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
}

/// Marks every message from `contact_id` to `user_id` as read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: UserId,
    pub contact_id: UserId,
}

/// Presence metadata sent with a `track` heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMeta {
    pub key: String,
    pub online_at: Timestamp,
}

impl PresenceMeta {
    #[must_use]
    pub fn online(user: UserId) -> Self {
        Self {
            key: user.to_string(),
            online_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(sender: i64, recipient: i64) -> Message {
        Message {
            id: MessageId(1),
            sender_id: UserId(sender),
            recipient_id: UserId(recipient),
            body: "hello".into(),
            created_at: Timestamp(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()),
            read_at: None,
        }
    }

    #[test]
    fn counterpart_is_the_other_party() {
        let msg = message(1, 2);
        assert_eq!(msg.counterpart(UserId(1)), UserId(2));
        assert_eq!(msg.counterpart(UserId(2)), UserId(1));
        assert!(msg.involves(UserId(2)));
        assert!(!msg.involves(UserId(3)));
    }

    #[test]
    fn message_without_read_at_field_decodes_as_unread() {
        let json = r#"{"id":7,"sender_id":3,"recipient_id":4,"body":"hi","created_at":"2025-01-02T03:04:05Z"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId(7));
        assert!(msg.is_unread());
    }

    #[test]
    fn contact_label_falls_back_to_id() {
        let mut contact = Contact::placeholder(UserId(42));
        assert_eq!(contact.label(), "user #42");
        contact.display_name = "Mona".into();
        assert_eq!(contact.label(), "Mona");
    }

    #[test]
    fn user_id_parses_from_presence_keys() {
        assert_eq!("17".parse::<UserId>().unwrap(), UserId(17));
        assert!("anon".parse::<UserId>().is_err());
    }
}
