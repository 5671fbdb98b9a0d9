use shared::models::{
    Comment, CreateCommentRequest, CreatePostRequest, Envelope, Page, Post, ReactRequest,
    ReactionKind, UpdateCommentRequest,
};

use super::JobBoardClient;
use crate::error::GatewayResult;

impl JobBoardClient {
    /// One page of the post feed.
    ///
    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn list_posts(&self, page: u32) -> GatewayResult<Page<Post>> {
        let url = self.api_url("posts");
        self.send_page(self.http().get(url).query(&[("page", page)]))
            .await
    }

    /// Publish a new post.
    ///
    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn create_post(&self, request: &CreatePostRequest) -> GatewayResult<Post> {
        let url = self.api_url("posts");
        self.send_json(self.http().post(url).json(request)).await
    }

    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn react_to_post(&self, post_id: i64, kind: ReactionKind) -> GatewayResult<()> {
        let url = self.api_url(&format!("posts/{post_id}/react"));
        let payload = ReactRequest {
            reaction_type: kind,
        };
        self.send_empty(self.http().post(url).json(&payload)).await
    }

    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn remove_reaction(&self, post_id: i64) -> GatewayResult<()> {
        let url = self.api_url(&format!("posts/{post_id}/reaction"));
        self.send_empty(self.http().delete(url)).await
    }

    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn list_comments(&self, post_id: i64) -> GatewayResult<Vec<Comment>> {
        let url = self.api_url(&format!("posts/{post_id}/comments"));
        let envelope: Envelope<Comment> = self.send_json(self.http().get(url)).await?;
        Ok(envelope.into_items())
    }

    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn create_comment(&self, request: &CreateCommentRequest) -> GatewayResult<Comment> {
        let url = self.api_url("comments");
        self.send_json(self.http().post(url).json(request)).await
    }

    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn update_comment(
        &self,
        comment_id: i64,
        request: &UpdateCommentRequest,
    ) -> GatewayResult<Comment> {
        let url = self.api_url(&format!("comments/{comment_id}"));
        self.send_json(self.http().put(url).json(request)).await
    }

    /// # Errors
    /// Returns the classified gateway error when the request fails.
    pub async fn delete_comment(&self, comment_id: i64) -> GatewayResult<()> {
        let url = self.api_url(&format!("comments/{comment_id}"));
        self.send_empty(self.http().delete(url)).await
    }
}
