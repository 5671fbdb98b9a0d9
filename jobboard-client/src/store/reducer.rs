use std::{collections::BTreeSet, rc::Rc};

use shared::models::{Contact, Message, Timestamp, UserId};
use tracing::{debug, trace};
use uuid::Uuid;
use yewdux::prelude::Reducer;

use super::{
    ChatEntry, ChatState, ConversationPhase, HistoryRequest, PendingMessage, ReadTracking,
    RequestToken,
};

/// Every mutation the chat slice accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    SetCurrentUser(UserId),
    SetReadTracking(ReadTracking),
    /// Replace the contact list, newest conversation first.
    LoadContacts(Vec<Contact>),
    /// Point the open conversation at `contact`, adding it to the list if unknown.
    /// Messages are left alone; loading history is a separate step.
    SetActiveContact(Contact),
    /// Push one message. Updates the active contact's preview in place.
    AppendMessage(Message),
    /// Record the latest message for a contact and move it to the front.
    TouchContact {
        contact_id: UserId,
        preview: String,
        timestamp: Timestamp,
    },
    IncrementUnread(UserId),
    ClearUnread(UserId),
    BeginHistoryLoad {
        contact_id: UserId,
        token: RequestToken,
    },
    /// Install a fetched history. Ignored unless `token` is still the outstanding request.
    HistoryLoaded {
        contact_id: UserId,
        token: RequestToken,
        messages: Vec<Message>,
    },
    AppendPending(PendingMessage),
    ConfirmPending {
        client_id: Uuid,
        message: Message,
    },
    FailPending {
        client_id: Uuid,
    },
    MarkConversationRead {
        contact_id: UserId,
        read_at: Timestamp,
    },
    ReplacePresence(BTreeSet<UserId>),
    /// Re-derive one contact's unread counter from loaded messages.
    RecountUnread(UserId),
}

impl Reducer<ChatState> for ChatAction {
    fn apply(self, mut state: Rc<ChatState>) -> Rc<ChatState> {
        self.reduce(Rc::make_mut(&mut state));
        state
    }
}

impl ChatAction {
    /// Apply the action to a mutable state in place.
    pub fn reduce(self, state: &mut ChatState) {
        match self {
            Self::SetCurrentUser(user) => state.current_user = Some(user),
            Self::SetReadTracking(tracking) => {
                state.read_tracking = tracking;
                if tracking == ReadTracking::Unavailable {
                    for contact in &mut state.contacts {
                        contact.unread_count = 0;
                    }
                }
            }
            Self::LoadContacts(contacts) => load_contacts(state, contacts),
            Self::SetActiveContact(contact) => set_active_contact(state, contact),
            Self::AppendMessage(message) => append_message(state, message),
            Self::TouchContact {
                contact_id,
                preview,
                timestamp,
            } => touch_contact(state, contact_id, preview, timestamp),
            Self::IncrementUnread(contact_id) => {
                if state.read_tracking == ReadTracking::Unavailable {
                    return;
                }
                if let Some(contact) = state.contact_mut(contact_id) {
                    contact.unread_count = contact.unread_count.saturating_add(1);
                }
            }
            Self::ClearUnread(contact_id) => {
                if let Some(contact) = state.contact_mut(contact_id) {
                    contact.unread_count = 0;
                }
            }
            Self::BeginHistoryLoad { contact_id, token } => {
                state.history_request = Some(HistoryRequest { contact_id, token });
                state.phase = ConversationPhase::LoadingHistory;
            }
            Self::HistoryLoaded {
                contact_id,
                token,
                messages,
            } => history_loaded(state, contact_id, token, messages),
            Self::AppendPending(pending) => state.messages.push(ChatEntry::Pending(pending)),
            Self::ConfirmPending { client_id, message } => {
                confirm_pending(state, client_id, message);
            }
            Self::FailPending { client_id } => {
                state.messages.retain(|entry| {
                    !matches!(entry, ChatEntry::Pending(pending) if pending.client_id == client_id)
                });
            }
            Self::MarkConversationRead {
                contact_id,
                read_at,
            } => mark_conversation_read(state, contact_id, read_at),
            Self::ReplacePresence(members) => state.presence = members,
            Self::RecountUnread(contact_id) => recount_unread(state, contact_id),
        }
    }
}

fn load_contacts(state: &mut ChatState, contacts: Vec<Contact>) {
    let mut seen = BTreeSet::new();
    let mut contacts: Vec<Contact> = contacts
        .into_iter()
        .filter(|contact| seen.insert(contact.id))
        .collect();
    // Newest first; contacts without a timestamp sink to the end.
    contacts.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
    if state.read_tracking == ReadTracking::Unavailable {
        for contact in &mut contacts {
            contact.unread_count = 0;
        }
    }
    state.contacts = contacts;
}

fn set_active_contact(state: &mut ChatState, contact: Contact) {
    state.active_contact = Some(contact.id);
    match state.contact_mut(contact.id) {
        Some(existing) => {
            if !contact.display_name.trim().is_empty() {
                existing.display_name = contact.display_name;
            }
            if contact.avatar_ref.is_some() {
                existing.avatar_ref = contact.avatar_ref;
            }
        }
        None => {
            let mut contact = contact;
            if state.read_tracking == ReadTracking::Unavailable {
                contact.unread_count = 0;
            }
            state.contacts.push(contact);
        }
    }
}

fn append_message(state: &mut ChatState, message: Message) {
    if let Some(active) = state.active_contact
        && state.message_belongs_to(&message, active)
        && let Some(contact) = state.contact_mut(active)
    {
        contact.last_message_preview = Some(message.body.clone());
        contact.last_message_at = Some(message.created_at);
    }
    state.messages.push(ChatEntry::Confirmed(message));
}

fn touch_contact(state: &mut ChatState, contact_id: UserId, preview: String, timestamp: Timestamp) {
    let mut contact = match state.contacts.iter().position(|c| c.id == contact_id) {
        Some(index) => state.contacts.remove(index),
        None => Contact::placeholder(contact_id),
    };
    contact.last_message_preview = Some(preview);
    contact.last_message_at = Some(timestamp);
    state.contacts.insert(0, contact);
}

fn history_loaded(
    state: &mut ChatState,
    contact_id: UserId,
    token: RequestToken,
    messages: Vec<Message>,
) {
    let expected = Some(HistoryRequest { contact_id, token });
    if state.history_request != expected || state.active_contact != Some(contact_id) {
        debug!(
            contact_id = %contact_id,
            token = token.0,
            "discarding stale history response"
        );
        return;
    }

    let fetched: BTreeSet<_> = messages.iter().map(|message| message.id).collect();
    let mut confirmed: Vec<Message> = messages;
    let mut pending = Vec::new();

    for entry in std::mem::take(&mut state.messages) {
        match entry {
            ChatEntry::Confirmed(message)
                if !fetched.contains(&message.id)
                    && state.message_belongs_to(&message, contact_id) =>
            {
                trace!(message_id = %message.id, "keeping message received during history load");
                confirmed.push(message);
            }
            ChatEntry::Pending(placeholder) if placeholder.recipient_id == contact_id => {
                pending.push(placeholder);
            }
            _ => {}
        }
    }

    confirmed.sort_by_key(|message| message.created_at);

    if let Some(last) = confirmed.last()
        && let Some(contact) = state.contact_mut(contact_id)
        && contact.last_message_at.is_none_or(|at| at < last.created_at)
    {
        contact.last_message_preview = Some(last.body.clone());
        contact.last_message_at = Some(last.created_at);
    }

    state.messages = confirmed
        .into_iter()
        .map(ChatEntry::Confirmed)
        .chain(pending.into_iter().map(ChatEntry::Pending))
        .collect();
    state.history_request = None;
    state.phase = ConversationPhase::Ready;
}

fn confirm_pending(state: &mut ChatState, client_id: Uuid, message: Message) {
    let already_present = state.has_message(message.id);
    let position = state.messages.iter().position(
        |entry| matches!(entry, ChatEntry::Pending(pending) if pending.client_id == client_id),
    );

    match position {
        Some(index) if already_present => {
            state.messages.remove(index);
        }
        Some(index) => state.messages[index] = ChatEntry::Confirmed(message),
        None if !already_present
            && state
                .active_contact
                .is_some_and(|active| state.message_belongs_to(&message, active)) =>
        {
            state.messages.push(ChatEntry::Confirmed(message));
        }
        None => {}
    }
}

fn mark_conversation_read(state: &mut ChatState, contact_id: UserId, read_at: Timestamp) {
    let me = state.current_user;
    for entry in &mut state.messages {
        if let ChatEntry::Confirmed(message) = entry
            && message.sender_id == contact_id
            && me.is_none_or(|me| message.recipient_id == me)
            && message.read_at.is_none()
        {
            message.read_at = Some(read_at);
        }
    }
    if let Some(contact) = state.contact_mut(contact_id) {
        contact.unread_count = 0;
    }
}

fn recount_unread(state: &mut ChatState, contact_id: UserId) {
    let count = if state.read_tracking == ReadTracking::Unavailable {
        0
    } else {
        let me = state.current_user;
        let unread = state
            .messages
            .iter()
            .filter_map(ChatEntry::as_message)
            .filter(|message| {
                message.sender_id == contact_id
                    && me.is_none_or(|me| message.recipient_id == me)
                    && message.is_unread()
            })
            .count();
        u32::try_from(unread).unwrap_or(u32::MAX)
    };
    if let Some(contact) = state.contact_mut(contact_id) {
        contact.unread_count = count;
    }
}
