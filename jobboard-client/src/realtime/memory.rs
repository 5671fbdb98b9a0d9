//! In-process transport for exercising subscriptions without a server.

use std::{cell::RefCell, collections::HashMap};

use async_trait::async_trait;
use futures_util::StreamExt;
use shared::models::{PresenceMeta, RealtimeEvent};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{ChannelSpec, EventStream, RealtimeTransport};
use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Default)]
pub struct MemoryTransport {
    subscribers: RefCell<HashMap<String, Vec<UnboundedSender<GatewayResult<RealtimeEvent>>>>>,
    pub subscriptions: RefCell<Vec<ChannelSpec>>,
    pub tracked: RefCell<Vec<(String, String)>>,
    pub untracked: RefCell<Vec<String>>,
    pub fail_untrack: bool,
}

impl MemoryTransport {
    pub fn failing_untrack() -> Self {
        Self {
            fail_untrack: true,
            ..Self::default()
        }
    }

    /// Deliver `event` to every open subscription on `topic`.
    pub fn publish(&self, topic: &str, event: &RealtimeEvent) {
        self.send_each(topic, || Ok(event.clone()));
    }

    pub fn publish_error(&self, topic: &str, message: &str) {
        self.send_each(topic, || Err(GatewayError::network(message)));
    }

    /// End every subscription on `topic`.
    pub fn close(&self, topic: &str) {
        self.subscribers.borrow_mut().remove(topic);
    }

    fn send_each(&self, topic: &str, mut item: impl FnMut() -> GatewayResult<RealtimeEvent>) {
        if let Some(senders) = self.subscribers.borrow_mut().get_mut(topic) {
            senders.retain(|sender| sender.send(item()).is_ok());
        }
    }
}

#[async_trait(?Send)]
impl RealtimeTransport for MemoryTransport {
    async fn subscribe(&self, channel: &ChannelSpec) -> GatewayResult<EventStream> {
        let (sender, receiver) = unbounded_channel();
        self.subscribers
            .borrow_mut()
            .entry(channel.topic.clone())
            .or_default()
            .push(sender);
        self.subscriptions.borrow_mut().push(channel.clone());
        Ok(UnboundedReceiverStream::new(receiver).boxed_local())
    }

    async fn track(&self, channel: &ChannelSpec, meta: &PresenceMeta) -> GatewayResult<()> {
        self.tracked
            .borrow_mut()
            .push((channel.topic.clone(), meta.key.clone()));
        Ok(())
    }

    async fn untrack(&self, channel: &ChannelSpec) -> GatewayResult<()> {
        if self.fail_untrack {
            return Err(GatewayError::network("connection reset"));
        }
        self.untracked.borrow_mut().push(channel.topic.clone());
        Ok(())
    }
}
