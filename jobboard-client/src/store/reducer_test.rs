//! Reducer behavior for the chat slice.

use std::{collections::BTreeSet, rc::Rc};

use chrono::{TimeZone, Utc};
use shared::models::{Contact, Message, MessageId, Timestamp, UserId};
use yewdux::{Context, Dispatch};

use super::*;

const ME: UserId = UserId(1);

fn at(seconds: i64) -> Timestamp {
    Timestamp(Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap())
}

fn message(id: i64, sender: UserId, recipient: UserId, seconds: i64) -> Message {
    Message {
        id: MessageId(id),
        sender_id: sender,
        recipient_id: recipient,
        body: format!("message {id}"),
        created_at: at(seconds),
        read_at: None,
    }
}

fn contact(id: i64, seconds: Option<i64>) -> Contact {
    Contact {
        last_message_at: seconds.map(at),
        ..Contact::placeholder(UserId(id))
    }
}

fn state_for(me: UserId) -> ChatState {
    let mut state = ChatState::default();
    ChatAction::SetCurrentUser(me).reduce(&mut state);
    state
}

fn reduce_all(state: &mut ChatState, actions: impl IntoIterator<Item = ChatAction>) {
    for action in actions {
        action.reduce(state);
    }
}

fn ids(state: &ChatState) -> Vec<i64> {
    state.contacts.iter().map(|contact| contact.id.0).collect()
}

fn message_ids(state: &ChatState) -> Vec<Option<i64>> {
    state
        .messages
        .iter()
        .map(|entry| entry.message_id().map(|id| id.0))
        .collect()
}

/// Each append adds one entry, in call order, even for repeated ids.
#[test]
fn append_message_adds_exactly_one_entry_in_order() {
    let mut state = state_for(ME);
    let sequence = [
        message(3, UserId(2), ME, 30),
        message(1, ME, UserId(2), 10),
        message(2, UserId(4), ME, 20),
        message(1, ME, UserId(2), 10),
    ];

    for (index, msg) in sequence.iter().enumerate() {
        ChatAction::AppendMessage(msg.clone()).reduce(&mut state);
        assert_eq!(state.messages.len(), index + 1);
    }
    assert_eq!(
        message_ids(&state),
        vec![Some(3), Some(1), Some(2), Some(1)]
    );
}

#[test]
fn append_message_updates_active_contact_preview_without_reordering() {
    let mut state = state_for(ME);
    reduce_all(
        &mut state,
        [
            ChatAction::LoadContacts(vec![contact(2, Some(50)), contact(3, Some(40))]),
            ChatAction::SetActiveContact(contact(3, None)),
            ChatAction::AppendMessage(message(9, UserId(3), ME, 60)),
            ChatAction::AppendMessage(message(10, UserId(2), ME, 70)),
        ],
    );

    assert_eq!(ids(&state), vec![2, 3]);
    let active = state.contact(UserId(3)).unwrap();
    assert_eq!(active.last_message_preview.as_deref(), Some("message 9"));
    assert_eq!(active.last_message_at, Some(at(60)));
    let other = state.contact(UserId(2)).unwrap();
    assert_eq!(other.last_message_at, Some(at(50)));
    assert!(other.last_message_preview.is_none());
}

/// The touched contact ends up first regardless of where it started.
#[test]
fn touch_contact_moves_contact_to_front() {
    for position in 0..4_i64 {
        let mut state = state_for(ME);
        ChatAction::LoadContacts((0..4).map(|i| contact(10 + i, Some(100 - i))).collect())
            .reduce(&mut state);
        let target = UserId(10 + position);

        ChatAction::TouchContact {
            contact_id: target,
            preview: "ping".into(),
            timestamp: at(500),
        }
        .reduce(&mut state);

        assert_eq!(state.contacts.len(), 4);
        assert_eq!(state.contacts[0].id, target);
        assert_eq!(
            state.contacts[0].last_message_preview.as_deref(),
            Some("ping")
        );
    }
}

#[test]
fn touch_contact_on_empty_list_creates_then_updates() {
    let mut state = state_for(ME);

    ChatAction::TouchContact {
        contact_id: UserId(5),
        preview: "hi".into(),
        timestamp: at(1),
    }
    .reduce(&mut state);
    assert_eq!(state.contacts.len(), 1);
    assert_eq!(state.contacts[0].id, UserId(5));
    assert_eq!(state.contacts[0].last_message_preview.as_deref(), Some("hi"));
    assert_eq!(state.contacts[0].last_message_at, Some(at(1)));

    ChatAction::TouchContact {
        contact_id: UserId(5),
        preview: "hey".into(),
        timestamp: at(2),
    }
    .reduce(&mut state);
    assert_eq!(state.contacts.len(), 1);
    assert_eq!(state.contacts[0].id, UserId(5));
    assert_eq!(state.contacts[0].last_message_preview.as_deref(), Some("hey"));
    assert_eq!(state.contacts[0].last_message_at, Some(at(2)));
}

#[test]
fn touch_contact_reorders_older_contact_ahead() {
    let mut state = state_for(ME);
    ChatAction::LoadContacts(vec![contact(20, Some(3)), contact(10, Some(5))]).reduce(&mut state);
    assert_eq!(ids(&state), vec![10, 20]);

    ChatAction::TouchContact {
        contact_id: UserId(20),
        preview: "x".into(),
        timestamp: at(10),
    }
    .reduce(&mut state);

    assert_eq!(ids(&state), vec![20, 10]);
    assert_eq!(state.contacts[0].last_message_at, Some(at(10)));
    assert_eq!(state.contacts[1].last_message_at, Some(at(5)));
}

#[test]
fn clear_then_increment_yields_one() {
    for before in [0_u32, 1, 7, u32::MAX] {
        let mut state = state_for(ME);
        let mut seeded = contact(4, Some(1));
        seeded.unread_count = before;
        ChatAction::LoadContacts(vec![seeded]).reduce(&mut state);

        reduce_all(
            &mut state,
            [
                ChatAction::ClearUnread(UserId(4)),
                ChatAction::IncrementUnread(UserId(4)),
            ],
        );

        assert_eq!(state.contact(UserId(4)).unwrap().unread_count, 1);
    }
}

#[test]
fn set_active_contact_twice_is_idempotent() {
    let mut state = state_for(ME);
    reduce_all(
        &mut state,
        [
            ChatAction::LoadContacts(vec![contact(2, Some(5))]),
            ChatAction::AppendMessage(message(1, UserId(2), ME, 1)),
        ],
    );

    let target = contact(8, None);
    ChatAction::SetActiveContact(target.clone()).reduce(&mut state);
    let contacts_after_first = state.contacts.clone();
    let messages_after_first = state.messages.clone();

    ChatAction::SetActiveContact(target).reduce(&mut state);

    assert_eq!(state.contacts, contacts_after_first);
    assert_eq!(state.messages, messages_after_first);
    assert_eq!(state.active_contact, Some(UserId(8)));
    assert_eq!(state.contacts.len(), 2);
}

#[test]
fn load_contacts_sorts_newest_first_with_missing_timestamps_last() {
    let mut state = state_for(ME);
    ChatAction::LoadContacts(vec![
        contact(1, None),
        contact(2, Some(10)),
        contact(3, Some(30)),
        contact(2, Some(99)),
        contact(4, Some(20)),
    ])
    .reduce(&mut state);

    assert_eq!(ids(&state), vec![3, 4, 2, 1]);
}

#[test]
fn stale_history_response_is_discarded() {
    let mut state = state_for(ME);
    reduce_all(
        &mut state,
        [
            ChatAction::SetActiveContact(contact(2, None)),
            ChatAction::BeginHistoryLoad {
                contact_id: UserId(2),
                token: RequestToken(1),
            },
            ChatAction::SetActiveContact(contact(3, None)),
            ChatAction::BeginHistoryLoad {
                contact_id: UserId(3),
                token: RequestToken(2),
            },
        ],
    );
    assert_eq!(state.phase, ConversationPhase::LoadingHistory);

    ChatAction::HistoryLoaded {
        contact_id: UserId(2),
        token: RequestToken(1),
        messages: vec![message(1, UserId(2), ME, 1)],
    }
    .reduce(&mut state);
    assert!(state.messages.is_empty());
    assert_eq!(state.phase, ConversationPhase::LoadingHistory);

    ChatAction::HistoryLoaded {
        contact_id: UserId(3),
        token: RequestToken(2),
        messages: vec![message(7, UserId(3), ME, 2)],
    }
    .reduce(&mut state);
    assert_eq!(message_ids(&state), vec![Some(7)]);
    assert_eq!(state.phase, ConversationPhase::Ready);
    assert_eq!(state.history_request, None);

    ChatAction::HistoryLoaded {
        contact_id: UserId(3),
        token: RequestToken(2),
        messages: Vec::new(),
    }
    .reduce(&mut state);
    assert_eq!(message_ids(&state), vec![Some(7)]);
}

#[test]
fn history_load_keeps_messages_pushed_while_loading() {
    let mut state = state_for(ME);
    let pending = PendingMessage::new(ME, UserId(2), "on its way");
    reduce_all(
        &mut state,
        [
            ChatAction::SetActiveContact(contact(2, None)),
            ChatAction::BeginHistoryLoad {
                contact_id: UserId(2),
                token: RequestToken(1),
            },
            ChatAction::AppendMessage(message(12, UserId(2), ME, 40)),
            ChatAction::AppendMessage(message(11, UserId(2), ME, 30)),
            ChatAction::AppendMessage(message(50, UserId(9), ME, 35)),
            ChatAction::AppendPending(pending.clone()),
            ChatAction::HistoryLoaded {
                contact_id: UserId(2),
                token: RequestToken(1),
                messages: vec![
                    message(10, ME, UserId(2), 10),
                    message(11, UserId(2), ME, 30),
                ],
            },
        ],
    );

    assert_eq!(
        message_ids(&state),
        vec![Some(10), Some(11), Some(12), None]
    );
    assert_eq!(state.messages[3], ChatEntry::Pending(pending));
    let active = state.contact(UserId(2)).unwrap();
    assert_eq!(active.last_message_at, Some(at(40)));
}

#[test]
fn confirm_pending_replaces_placeholder_in_place() {
    let mut state = state_for(ME);
    let pending = PendingMessage::new(ME, UserId(2), "hello");
    let client_id = pending.client_id;
    reduce_all(
        &mut state,
        [
            ChatAction::SetActiveContact(contact(2, None)),
            ChatAction::AppendMessage(message(1, UserId(2), ME, 1)),
            ChatAction::AppendPending(pending),
            ChatAction::AppendMessage(message(2, UserId(2), ME, 2)),
            ChatAction::ConfirmPending {
                client_id,
                message: message(3, ME, UserId(2), 3),
            },
        ],
    );

    assert_eq!(message_ids(&state), vec![Some(1), Some(3), Some(2)]);
    assert_eq!(state.pending_count(), 0);
}

#[test]
fn confirm_pending_drops_placeholder_when_push_arrived_first() {
    let mut state = state_for(ME);
    let pending = PendingMessage::new(ME, UserId(2), "hello");
    let client_id = pending.client_id;
    let confirmed = message(3, ME, UserId(2), 3);
    reduce_all(
        &mut state,
        [
            ChatAction::SetActiveContact(contact(2, None)),
            ChatAction::AppendPending(pending),
            ChatAction::AppendMessage(confirmed.clone()),
            ChatAction::ConfirmPending {
                client_id,
                message: confirmed,
            },
        ],
    );

    assert_eq!(message_ids(&state), vec![Some(3)]);
}

#[test]
fn fail_pending_removes_only_that_placeholder() {
    let mut state = state_for(ME);
    let first = PendingMessage::new(ME, UserId(2), "one");
    let second = PendingMessage::new(ME, UserId(2), "two");
    let failed = first.client_id;
    reduce_all(
        &mut state,
        [
            ChatAction::AppendPending(first),
            ChatAction::AppendPending(second.clone()),
            ChatAction::FailPending { client_id: failed },
        ],
    );

    assert_eq!(state.messages, vec![ChatEntry::Pending(second)]);
}

#[test]
fn read_at_is_set_once_and_never_rewritten() {
    let mut state = state_for(ME);
    let mut already_read = message(2, UserId(2), ME, 2);
    already_read.read_at = Some(at(5));
    let mut seeded = contact(2, Some(3));
    seeded.unread_count = 2;
    reduce_all(
        &mut state,
        [
            ChatAction::LoadContacts(vec![seeded]),
            ChatAction::AppendMessage(message(1, UserId(2), ME, 1)),
            ChatAction::AppendMessage(already_read),
            ChatAction::AppendMessage(message(3, ME, UserId(2), 3)),
            ChatAction::MarkConversationRead {
                contact_id: UserId(2),
                read_at: at(100),
            },
            ChatAction::MarkConversationRead {
                contact_id: UserId(2),
                read_at: at(200),
            },
        ],
    );

    let read: Vec<_> = state
        .messages
        .iter()
        .map(|entry| entry.as_message().unwrap().read_at)
        .collect();
    assert_eq!(read, vec![Some(at(100)), Some(at(5)), None]);
    assert_eq!(state.contact(UserId(2)).unwrap().unread_count, 0);
}

#[test]
fn recount_unread_counts_unread_messages_from_contact() {
    let mut state = state_for(ME);
    let mut read = message(2, UserId(2), ME, 2);
    read.read_at = Some(at(3));
    reduce_all(
        &mut state,
        [
            ChatAction::LoadContacts(vec![contact(2, Some(1))]),
            ChatAction::AppendMessage(message(1, UserId(2), ME, 1)),
            ChatAction::AppendMessage(read),
            ChatAction::AppendMessage(message(3, UserId(2), ME, 3)),
            ChatAction::AppendMessage(message(4, ME, UserId(2), 4)),
            ChatAction::RecountUnread(UserId(2)),
        ],
    );

    assert_eq!(state.contact(UserId(2)).unwrap().unread_count, 2);
}

#[test]
fn unread_is_pinned_to_zero_without_read_tracking() {
    let mut state = state_for(ME);
    let mut seeded = contact(2, Some(1));
    seeded.unread_count = 4;
    ChatAction::LoadContacts(vec![seeded.clone()]).reduce(&mut state);

    ChatAction::SetReadTracking(ReadTracking::Unavailable).reduce(&mut state);
    assert_eq!(state.contact(UserId(2)).unwrap().unread_count, 0);

    reduce_all(
        &mut state,
        [
            ChatAction::IncrementUnread(UserId(2)),
            ChatAction::AppendMessage(message(1, UserId(2), ME, 1)),
            ChatAction::RecountUnread(UserId(2)),
            ChatAction::LoadContacts(vec![seeded]),
        ],
    );
    assert_eq!(state.unread_total(), 0);
}

#[test]
fn presence_is_replaced_wholesale() {
    let mut state = state_for(ME);
    ChatAction::ReplacePresence(BTreeSet::from([UserId(2), UserId(3)])).reduce(&mut state);
    assert!(state.is_online(UserId(2)));

    ChatAction::ReplacePresence(BTreeSet::from([UserId(4)])).reduce(&mut state);
    assert!(!state.is_online(UserId(2)));
    assert!(state.is_online(UserId(4)));
}

#[test]
fn conversation_filters_by_counterpart() {
    let mut state = state_for(ME);
    reduce_all(
        &mut state,
        [
            ChatAction::AppendMessage(message(1, UserId(2), ME, 1)),
            ChatAction::AppendMessage(message(2, ME, UserId(3), 2)),
            ChatAction::AppendMessage(message(3, ME, UserId(2), 3)),
            ChatAction::AppendPending(PendingMessage::new(ME, UserId(2), "soon")),
        ],
    );

    assert_eq!(state.conversation(UserId(2)).count(), 3);
    assert_eq!(state.conversation(UserId(3)).count(), 1);
}

/// Actions dispatched through yewdux land in the shared store.
#[test]
fn dispatch_applies_actions_through_the_store() {
    let cx = Context::new();
    let dispatch = Dispatch::<ChatState>::new(&cx);

    dispatch.apply(ChatAction::SetCurrentUser(ME));
    dispatch.apply(ChatAction::TouchContact {
        contact_id: UserId(5),
        preview: "hi".into(),
        timestamp: at(1),
    });

    let state: Rc<ChatState> = dispatch.get();
    assert_eq!(state.current_user, Some(ME));
    assert_eq!(ids(&state), vec![5]);

    let second = Dispatch::<ChatState>::new(&cx);
    assert_eq!(second.get().contacts.len(), 1);
}
