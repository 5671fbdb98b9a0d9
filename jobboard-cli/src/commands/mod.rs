pub mod chat;
pub mod completion;
pub mod config;
pub mod feed;
pub mod jobs;
pub mod profile;
pub mod session;

use std::{env, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use client::{GatewayError, JobBoardClient, Notification, StoredSession, TokenStore, TokenStoreError};
use shared::config::ClientConfig;

/// Overrides where the session file lives.
const SESSION_FILE_ENV: &str = "JOBBOARD_SESSION_FILE";

pub(crate) fn token_store() -> TokenStore {
    env::var_os(SESSION_FILE_ENV)
        .map(PathBuf::from)
        .map_or_else(TokenStore::default, TokenStore::new)
}

pub(crate) fn require_session(store: &TokenStore) -> Result<StoredSession> {
    match store.load() {
        Ok(session) => Ok(session),
        Err(TokenStoreError::Missing(path)) => Err(anyhow!(
            "no saved session at {}; run `jobboard session login` first",
            path.display()
        )),
        Err(err) => Err(err).context("failed to read the saved session"),
    }
}

pub(crate) fn anonymous_client(config: &ClientConfig) -> Result<JobBoardClient> {
    JobBoardClient::from_config(config).context("failed to build the HTTP client")
}

/// A client carrying the saved bearer token, plus the session it came from.
pub(crate) fn authenticated_client(config: &ClientConfig) -> Result<(JobBoardClient, StoredSession)> {
    let session = require_session(&token_store())?;
    let client = anonymous_client(config)?.with_token(Some(session.token.clone()));
    Ok((client, session))
}

/// Turn a gateway failure into the same text the chat screen would show.
pub(crate) fn failed(action: &'static str) -> impl FnOnce(GatewayError) -> anyhow::Error {
    move |err| {
        tracing::debug!(action, kind = %err.kind(), error = %err, "request failed");
        anyhow!(Notification::from_error(action, &err).text)
    }
}

pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.filter(|value| !value.trim().is_empty()).unwrap_or("-")
}
