//! Remote data gateway.
//!
//! Thin request functions over the REST backend. Every call returns
//! [`GatewayResult`]; callers decide how failures surface.

mod auth;
mod chat;
mod feed;
mod jobs;
mod profiles;

use std::sync::{Arc, Mutex};

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    config::ClientConfig,
    models::{Envelope, Page},
};
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

pub use chat::ChatGateway;

const USER_AGENT: &str = concat!("jobboard-client/", env!("CARGO_PKG_VERSION"));

/// API client for the job board backend.
#[derive(Clone, Debug)]
pub struct JobBoardClient {
    base_url: String,
    http: Client,
    token: Arc<Mutex<Option<String>>>,
}

impl JobBoardClient {
    /// Create a new API client with the provided base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_http(base_url, http))
    }

    /// Build a client from resolved configuration, honoring the request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &ClientConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_http(&config.api_base_url, http))
    }

    fn with_http(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = token;
        }
    }

    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        self.token
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
    }

    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = self.current_token() {
            request.bearer_auth(token)
        } else {
            request
        }
    }

    async fn dispatch(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = self.authorize(request).send().await.map_err(|err| {
            warn!(error = %err, "request failed before a response arrived");
            GatewayError::from(err)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = GatewayError::from_status(status, &body);
        debug!(status = %status, kind = %error.kind(), "request rejected");
        Err(error)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> GatewayResult<T> {
        let response = self.dispatch(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(GatewayError::from)
    }

    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> GatewayResult<()> {
        self.dispatch(request).await.map(|_| ())
    }

    /// Fetch a list endpoint and normalize whichever envelope shape it answers with.
    pub(crate) async fn send_page<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> GatewayResult<Page<T>> {
        let envelope: Envelope<T> = self.send_json(request).await?;
        Ok(envelope.into_page())
    }
}
