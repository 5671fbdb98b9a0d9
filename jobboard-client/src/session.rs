//! Chat session coordinator.
//!
//! Owns the store dispatch and the realtime adapter for one signed-in user,
//! turning gateway results and pushed events into [`ChatAction`]s. All
//! methods take `&self`; the session is driven from a single task.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    rc::Rc,
};

use shared::models::{Contact, MarkReadRequest, Message, MessageId, Timestamp, UserId};
use tracing::{debug, info, warn};
use yewdux::Dispatch;

use crate::{
    error::{ErrorKind, GatewayResult},
    gateway::ChatGateway,
    notify::Notification,
    realtime::{RealtimeSync, RealtimeTransport},
    store::{ChatAction, ChatState, PendingMessage, ReadTracking, RequestToken},
};

/// Monotonic source of history request tokens.
#[derive(Debug, Default)]
pub struct RequestTokens {
    last: Cell<u64>,
}

impl RequestTokens {
    pub fn next(&self) -> RequestToken {
        let token = self.last.get() + 1;
        self.last.set(token);
        RequestToken(token)
    }
}

/// Handle for a history load started by [`ChatSession::select_contact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTicket {
    pub contact_id: UserId,
    pub token: RequestToken,
}

/// Chat state and realtime plumbing for one signed-in user.
pub struct ChatSession<T, G> {
    dispatch: Dispatch<ChatState>,
    sync: RealtimeSync<T, G>,
    current_user: UserId,
    tokens: RequestTokens,
    /// Every message id delivered so far, including ones no longer loaded in the store.
    seen: RefCell<BTreeSet<MessageId>>,
    notifications: RefCell<Vec<Notification>>,
}

impl<T, G> std::fmt::Debug for ChatSession<T, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("current_user", &self.current_user)
            .field("tokens", &self.tokens)
            .field("seen", &self.seen.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<T: RealtimeTransport, G: ChatGateway> ChatSession<T, G> {
    /// Bind the store to `current_user` and set the initial read-tracking mode.
    pub fn new(
        dispatch: Dispatch<ChatState>,
        sync: RealtimeSync<T, G>,
        current_user: UserId,
        read_tracking: ReadTracking,
    ) -> Self {
        dispatch.apply(ChatAction::SetCurrentUser(current_user));
        dispatch.apply(ChatAction::SetReadTracking(read_tracking));
        Self {
            dispatch,
            sync,
            current_user,
            tokens: RequestTokens::default(),
            seen: RefCell::new(BTreeSet::new()),
            notifications: RefCell::new(Vec::new()),
        }
    }

    /// Snapshot of the chat store.
    pub fn state(&self) -> Rc<ChatState> {
        self.dispatch.get()
    }

    /// The realtime adapter, for opening subscriptions.
    pub const fn sync(&self) -> &RealtimeSync<T, G> {
        &self.sync
    }

    /// The signed-in user this session belongs to.
    pub const fn current_user(&self) -> UserId {
        self.current_user
    }

    /// Replace the contact list from the backend. On failure the current list is kept.
    pub async fn load_contacts(&self) -> bool {
        match self.sync.gateway().list_contacts().await {
            Ok(contacts) => {
                debug!(count = contacts.len(), "contacts loaded");
                self.dispatch.apply(ChatAction::LoadContacts(contacts));
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to load contacts");
                self.notify(Notification::from_error("loading conversations", &err));
                false
            }
        }
    }

    /// Open a conversation and start a history load for it.
    pub fn select_contact(&self, contact: Contact) -> HistoryTicket {
        let contact_id = contact.id;
        let token = self.tokens.next();
        self.dispatch.apply(ChatAction::SetActiveContact(contact));
        self.dispatch.apply(ChatAction::ClearUnread(contact_id));
        self.dispatch
            .apply(ChatAction::BeginHistoryLoad { contact_id, token });
        debug!(contact_id = %contact_id, token = token.0, "conversation selected");
        HistoryTicket { contact_id, token }
    }

    /// Fetch and install the history for `ticket`.
    pub async fn load_history(&self, ticket: HistoryTicket) {
        let result = self
            .sync
            .fetch_history(self.current_user, ticket.contact_id)
            .await;
        self.complete_history(ticket, result).await;
    }

    /// Install a history result. Results for a superseded ticket are dropped.
    ///
    /// A failed fetch shows an empty conversation plus a notification and
    /// leaves the server-side read state untouched.
    pub async fn complete_history(&self, ticket: HistoryTicket, result: GatewayResult<Vec<Message>>) {
        if !self.is_current(ticket) {
            debug!(
                contact_id = %ticket.contact_id,
                token = ticket.token.0,
                "history result arrived after the selection changed"
            );
            return;
        }

        match result {
            Ok(messages) => {
                self.remember(messages.iter().map(|message| message.id));
                self.dispatch.apply(ChatAction::HistoryLoaded {
                    contact_id: ticket.contact_id,
                    token: ticket.token,
                    messages,
                });
                self.mark_read(ticket.contact_id).await;
            }
            Err(err) => {
                warn!(contact_id = %ticket.contact_id, error = %err, "history fetch failed");
                self.notify(Notification::from_error("loading messages", &err));
                self.dispatch.apply(ChatAction::HistoryLoaded {
                    contact_id: ticket.contact_id,
                    token: ticket.token,
                    messages: Vec::new(),
                });
                self.dispatch
                    .apply(ChatAction::RecountUnread(ticket.contact_id));
            }
        }
    }

    fn remember(&self, ids: impl IntoIterator<Item = MessageId>) {
        self.seen.borrow_mut().extend(ids);
    }

    fn is_current(&self, ticket: HistoryTicket) -> bool {
        let state = self.dispatch.get();
        state.active_contact == Some(ticket.contact_id)
            && state
                .history_request
                .is_some_and(|request| request.token == ticket.token)
    }

    async fn mark_read(&self, contact_id: UserId) {
        if self.dispatch.get().read_tracking == ReadTracking::Unavailable {
            return;
        }

        let request = MarkReadRequest {
            user_id: self.current_user,
            contact_id,
        };
        match self.sync.gateway().mark_read(&request).await {
            Ok(()) => self.dispatch.apply(ChatAction::MarkConversationRead {
                contact_id,
                read_at: Timestamp::now(),
            }),
            Err(err) if err.is(ErrorKind::NotFound) => {
                info!("backend has no read tracking; unread counters disabled");
                self.dispatch
                    .apply(ChatAction::SetReadTracking(ReadTracking::Unavailable));
            }
            Err(err) => {
                debug!(contact_id = %contact_id, error = %err, "mark read failed");
                self.dispatch.apply(ChatAction::RecountUnread(contact_id));
            }
        }
    }

    /// Send `body` to the active contact with an optimistic placeholder.
    ///
    /// Returns the stored message, or `None` if nothing was sent.
    pub async fn send(&self, body: &str) -> Option<Message> {
        let body = body.trim();
        if body.is_empty() {
            self.notify(Notification::warning("message is empty"));
            return None;
        }
        let Some(contact_id) = self.dispatch.get().active_contact else {
            self.notify(Notification::warning("select a conversation first"));
            return None;
        };

        let pending = PendingMessage::new(self.current_user, contact_id, body);
        let client_id = pending.client_id;
        self.dispatch.apply(ChatAction::TouchContact {
            contact_id,
            preview: pending.body.clone(),
            timestamp: pending.created_at,
        });
        self.dispatch.apply(ChatAction::AppendPending(pending));

        match self
            .sync
            .send_message(self.current_user, contact_id, body)
            .await
        {
            Ok(message) => {
                self.remember([message.id]);
                self.dispatch.apply(ChatAction::TouchContact {
                    contact_id,
                    preview: message.body.clone(),
                    timestamp: message.created_at,
                });
                self.dispatch.apply(ChatAction::ConfirmPending {
                    client_id,
                    message: message.clone(),
                });
                Some(message)
            }
            Err(err) => {
                warn!(contact_id = %contact_id, error = %err, "send failed");
                self.dispatch.apply(ChatAction::FailPending { client_id });
                self.notify(Notification::from_error("sending message", &err));
                None
            }
        }
    }

    /// Apply a pushed insert. Returns `false` when the message was already known.
    pub fn handle_insert(&self, message: Message) -> bool {
        let state = self.dispatch.get();
        if !message.involves(self.current_user) {
            return false;
        }
        let first_delivery = self.seen.borrow_mut().insert(message.id);
        if !first_delivery || state.has_message(message.id) {
            debug!(message_id = %message.id, "duplicate insert dropped");
            return false;
        }

        let contact_id = message.counterpart(self.current_user);
        let from_contact = message.sender_id != self.current_user;
        let is_active = state.active_contact == Some(contact_id);
        drop(state);

        self.dispatch.apply(ChatAction::TouchContact {
            contact_id,
            preview: message.body.clone(),
            timestamp: message.created_at,
        });
        self.dispatch.apply(ChatAction::AppendMessage(message));
        if from_contact && !is_active {
            self.dispatch.apply(ChatAction::IncrementUnread(contact_id));
        }
        true
    }

    /// Replace the online set with the latest presence sync.
    pub fn handle_presence(&self, members: BTreeSet<UserId>) {
        debug!(online = members.len(), "presence sync");
        self.dispatch.apply(ChatAction::ReplacePresence(members));
    }

    /// Queue a notification for the outer surface.
    pub fn notify(&self, notification: Notification) {
        self.notifications.borrow_mut().push(notification);
    }

    /// Take every notification raised since the last call.
    pub fn drain_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.borrow_mut())
    }
}
