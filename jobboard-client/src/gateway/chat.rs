use async_trait::async_trait;
use shared::models::{Contact, Envelope, MarkReadRequest, Message, SendMessageRequest, UserId};

use super::JobBoardClient;
use crate::error::GatewayResult;

/// Chat message operations the realtime adapter and chat session depend on.
#[async_trait(?Send)]
pub trait ChatGateway {
    /// Conversation list for the authenticated user.
    async fn list_contacts(&self) -> GatewayResult<Vec<Contact>>;

    /// Every message exchanged between `user` and `contact`.
    async fn fetch_history(&self, user: UserId, contact: UserId) -> GatewayResult<Vec<Message>>;

    /// Insert a message row and return the stored record.
    async fn send_message(&self, request: &SendMessageRequest) -> GatewayResult<Message>;

    /// Mark everything `contact` sent to `user` as read.
    async fn mark_read(&self, request: &MarkReadRequest) -> GatewayResult<()>;
}

#[async_trait(?Send)]
impl ChatGateway for JobBoardClient {
    async fn list_contacts(&self) -> GatewayResult<Vec<Contact>> {
        let url = self.api_url("messages/contacts");
        let envelope: Envelope<Contact> = self.send_json(self.http().get(url)).await?;
        Ok(envelope.into_items())
    }

    async fn fetch_history(&self, user: UserId, contact: UserId) -> GatewayResult<Vec<Message>> {
        let url = self.api_url("messages");
        let request = self.http().get(url).query(&[
            ("user_id", user.to_string()),
            ("contact_id", contact.to_string()),
        ]);
        let envelope: Envelope<Message> = self.send_json(request).await?;
        Ok(envelope.into_items())
    }

    async fn send_message(&self, request: &SendMessageRequest) -> GatewayResult<Message> {
        let url = self.api_url("messages");
        self.send_json(self.http().post(url).json(request)).await
    }

    async fn mark_read(&self, request: &MarkReadRequest) -> GatewayResult<()> {
        let url = self.api_url("messages/read");
        self.send_empty(self.http().patch(url).json(request)).await
    }
}
