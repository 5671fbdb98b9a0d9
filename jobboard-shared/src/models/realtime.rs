use serde::{Deserialize, Serialize};

/// One member entry reported by a presence sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMember {
    pub key: String,
    #[serde(default)]
    pub online_at: Option<super::Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSyncEvent {
    pub members: Vec<PresenceMember>,
}

/// A row inserted into a table the subscriber is filtered on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowInsertEvent {
    pub table: String,
    pub record: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamErrorEvent {
    pub code: String,
    pub message: String,
}

/// Events pushed over a realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RealtimeEvent {
    #[serde(rename = "presence.sync")]
    PresenceSync { payload: PresenceSyncEvent },
    #[serde(rename = "row.insert")]
    RowInsert { payload: RowInsertEvent },
    #[serde(rename = "error")]
    Error { payload: StreamErrorEvent },
}

impl RealtimeEvent {
    /// Event name used on the `event:` line of the stream.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PresenceSync { .. } => "presence.sync",
            Self::RowInsert { .. } => "row.insert",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_insert_uses_dotted_tag() {
        let json = r#"{"type":"row.insert","payload":{"table":"messages","record":{"id":1}}}"#;
        let event: RealtimeEvent = serde_json::from_str(json).unwrap();
        match event {
            RealtimeEvent::RowInsert { payload } => {
                assert_eq!(payload.table, "messages");
                assert_eq!(payload.record["id"], 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn presence_sync_members_default_online_at() {
        let json = r#"{"type":"presence.sync","payload":{"members":[{"key":"5"},{"key":"9","online_at":"2025-01-01T00:00:00Z"}]}}"#;
        let event: RealtimeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.name(), "presence.sync");
        let RealtimeEvent::PresenceSync { payload } = event else {
            panic!("expected presence sync");
        };
        assert_eq!(payload.members.len(), 2);
        assert!(payload.members[0].online_at.is_none());
        assert!(payload.members[1].online_at.is_some());
    }
}
