//! Direct messages: one-shot commands plus an interactive `open` loop.

use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;
use client::{
    GatewayResult, JobBoardClient, Notification,
    realtime::{RealtimeSync, SseTransport},
    session::{ChatSession, HistoryTicket},
    store::{ChatEntry, ChatState, ConversationPhase, ReadTracking},
};
use futures::{
    FutureExt, StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use shared::{
    config::ClientConfig,
    models::{Contact, Message, UserId},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use yewdux::{Context as StoreContext, Dispatch};

use super::{authenticated_client, failed};

type Session = ChatSession<SseTransport, JobBoardClient>;
type HistoryLoad<'a> = LocalBoxFuture<'a, (HistoryTicket, GatewayResult<Vec<Message>>)>;

#[derive(Subcommand, Debug)]
pub enum ChatCommand {
    /// List conversations, most recent first
    Contacts,
    /// Print the conversation with one contact
    History {
        /// Contact user id
        #[arg(long = "with", short = 'w')]
        contact: UserId,
    },
    /// Send one message
    Send {
        /// Recipient user id
        #[arg(long, short)]
        to: UserId,
        text: String,
    },
    /// Live chat: type to send, `/open <id>` to switch, `/quit` to leave
    Open {
        /// Conversation to open right away
        #[arg(long = "with", short = 'w')]
        contact: Option<UserId>,
    },
}

pub async fn run(command: ChatCommand, config: &ClientConfig) -> Result<()> {
    let session = build_session(config)?;
    match command {
        ChatCommand::Contacts => {
            if !session.load_contacts().await {
                return Err(first_notification(&session, "loading conversations failed"));
            }
            print!("{}", render_contacts(&session.state()));
            Ok(())
        }
        ChatCommand::History { contact } => {
            let ticket = select(&session, contact).await;
            session.load_history(ticket).await;
            print_notifications(&session);
            print!("{}", render_conversation(&session.state(), contact));
            Ok(())
        }
        ChatCommand::Send { to, text } => {
            select(&session, to).await;
            match session.send(&text).await {
                Some(message) => {
                    println!("Sent message #{} to {to}", message.id);
                    Ok(())
                }
                None => Err(first_notification(&session, "message was not sent")),
            }
        }
        ChatCommand::Open { contact } => open(&session, contact).await,
    }
}

fn build_session(config: &ClientConfig) -> Result<Session> {
    let (client, stored) = authenticated_client(config)?;
    let transport = SseTransport::from_config(config, Some(stored.token.clone()))
        .context("failed to set up the realtime connection")?;
    let sync = RealtimeSync::new(transport, client, config.chat.presence_channel.clone());
    let read_tracking = if config.chat.read_receipts {
        ReadTracking::Available
    } else {
        ReadTracking::Unavailable
    };
    let dispatch = Dispatch::<ChatState>::new(&StoreContext::new());
    Ok(ChatSession::new(dispatch, sync, stored.user_id, read_tracking))
}

/// Select `contact`, using what the contact list knows about them when it loads.
async fn select(session: &Session, contact: UserId) -> HistoryTicket {
    if session.state().contact(contact).is_none() {
        session.load_contacts().await;
    }
    let known = session
        .state()
        .contact(contact)
        .cloned()
        .unwrap_or_else(|| Contact::placeholder(contact));
    session.select_contact(known)
}

fn start_history_load(session: &Session, ticket: HistoryTicket) -> HistoryLoad<'_> {
    async move {
        let result = session
            .sync()
            .fetch_history(session.current_user(), ticket.contact_id)
            .await;
        (ticket, result)
    }
    .boxed_local()
}

async fn open(session: &Session, initial: Option<UserId>) -> Result<()> {
    let me = session.current_user();
    session.load_contacts().await;
    print!("{}", render_contacts(&session.state()));

    let mut presence = session
        .sync()
        .subscribe_presence(me)
        .await
        .map_err(failed("joining the presence channel"))?;
    let mut inserts = session
        .sync()
        .subscribe_message_inserts(me)
        .await
        .map_err(failed("subscribing to new messages"))?;
    let (mut presence_open, mut inserts_open) = (true, true);

    let mut loads: FuturesUnordered<HistoryLoad<'_>> = FuturesUnordered::new();
    if let Some(contact) = initial {
        let ticket = select(session, contact).await;
        loads.push(start_history_load(session, ticket));
    }

    println!("{HELP}");
    print_notifications(session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                match Input::parse(&line) {
                    Input::Empty => {}
                    Input::Quit => break,
                    Input::Help => println!("{HELP}"),
                    Input::Contacts => {
                        session.load_contacts().await;
                        print!("{}", render_contacts(&session.state()));
                    }
                    Input::Open(contact) => {
                        let ticket = select(session, contact).await;
                        loads.push(start_history_load(session, ticket));
                        println!("Loading conversation with {}...", label(&session.state(), contact));
                    }
                    Input::Send(text) => {
                        if let Some(message) = session.send(&text).await {
                            println!("{}", render_entry(&session.state(), &ChatEntry::Confirmed(message)));
                        }
                    }
                    Input::Invalid(reason) => eprintln!("{reason}"),
                }
            }
            Some((ticket, result)) = loads.next(), if !loads.is_empty() => {
                session.complete_history(ticket, result).await;
                let state = session.state();
                if state.active_contact == Some(ticket.contact_id) && state.phase == ConversationPhase::Ready {
                    print!("{}", render_conversation(&state, ticket.contact_id));
                }
            }
            insert = inserts.next_message(), if inserts_open => match insert {
                Some(Ok(message)) => {
                    let entry = ChatEntry::Confirmed(message.clone());
                    if session.handle_insert(message) {
                        println!("{}", render_insert(&session.state(), &entry));
                    }
                }
                Some(Err(err)) => warn!(error = %err, "message stream error"),
                None => {
                    inserts_open = false;
                    session.notify(Notification::warning("live updates stopped; restart to reconnect"));
                }
            },
            members = presence.next_members(), if presence_open => match members {
                Some(Ok(members)) => session.handle_presence(members),
                Some(Err(err)) => warn!(error = %err, "presence stream error"),
                None => {
                    presence_open = false;
                    info!("presence channel closed");
                }
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                break;
            }
        }
        print_notifications(session);
    }

    session.sync().untrack(&presence).await;
    Ok(())
}

const HELP: &str = "Type a message and press enter to send it.\n  /open <id>  switch conversation\n  /contacts   refresh the contact list\n  /help       show this help\n  /quit       leave";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Quit,
    Help,
    Contacts,
    Open(UserId),
    Send(String),
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("quit" | "q" | "exit"), _) => Self::Quit,
            (Some("help" | "h"), _) => Self::Help,
            (Some("contacts" | "c"), _) => Self::Contacts,
            (Some("open" | "o"), Some(id)) => id.parse().map_or_else(
                |_| Self::Invalid(format!("`{id}` is not a user id")),
                Self::Open,
            ),
            (Some("open" | "o"), None) => Self::Invalid("usage: /open <user id>".to_string()),
            _ => Self::Invalid(format!("unknown command `/{command}`; try /help")),
        }
    }
}

fn print_notifications(session: &Session) {
    for notification in session.drain_notifications() {
        eprintln!("{notification}");
    }
}

fn first_notification(session: &Session, fallback: &str) -> anyhow::Error {
    session
        .drain_notifications()
        .into_iter()
        .next()
        .map_or_else(|| anyhow!("{fallback}"), |notification| anyhow!(notification.text))
}

fn label(state: &ChatState, id: UserId) -> String {
    state
        .contact(id)
        .map_or_else(|| Contact::placeholder(id).label(), Contact::label)
}

fn render_contacts(state: &ChatState) -> String {
    if state.contacts.is_empty() {
        return "No conversations yet.\n".to_string();
    }
    let mut out = String::new();
    for contact in &state.contacts {
        let marker = if state.is_online(contact.id) { '●' } else { '○' };
        let _ = write!(out, "{marker} {:<24} #{:<6}", contact.label(), contact.id);
        if contact.unread_count > 0 {
            let _ = write!(out, " [{} unread]", contact.unread_count);
        }
        if let Some(preview) = &contact.last_message_preview {
            let _ = write!(out, " {}", truncate(preview, 40));
        }
        if let Some(at) = contact.last_message_at {
            let _ = write!(out, " · {}", at.display_short());
        }
        out.push('\n');
    }
    out
}

fn render_conversation(state: &ChatState, contact: UserId) -> String {
    let mut out = format!("── {} ──\n", label(state, contact));
    let mut empty = true;
    for entry in state.conversation(contact) {
        empty = false;
        out.push_str(&render_entry(state, entry));
        out.push('\n');
    }
    if empty {
        out.push_str("No messages yet.\n");
    }
    out
}

fn render_entry(state: &ChatState, entry: &ChatEntry) -> String {
    let author = if Some(entry.sender_id()) == state.current_user {
        "you".to_string()
    } else {
        label(state, entry.sender_id())
    };
    let mut line = format!("[{}] {author}: {}", entry.created_at().display_short(), entry.body());
    if entry.is_pending() {
        line.push_str(" (sending)");
    }
    line
}

fn render_insert(state: &ChatState, entry: &ChatEntry) -> String {
    let contact = state.counterpart_of(entry);
    if state.active_contact == Some(contact) {
        return render_entry(state, entry);
    }
    let unread = state.contact(contact).map_or(0, |contact| contact.unread_count);
    if unread > 0 {
        format!("New message from {} ({unread} unread)", label(state, contact))
    } else {
        format!("New message from {}", label(state, contact))
    }
}

fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
