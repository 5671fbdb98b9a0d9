//! Persisted bearer token and user id.
//!
//! The only durable client state: `{ token, user_id }` as JSON under the
//! platform config directory, readable by the owner only.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use shared::models::{AuthenticatedUser, UserId, UserRole};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("no saved session at {0}")]
    Missing(PathBuf),
    #[error("failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl StoredSession {
    #[must_use]
    pub fn new(token: impl Into<String>, user: &AuthenticatedUser) -> Self {
        Self {
            token: token.into(),
            user_id: user.id,
            email: Some(user.email.clone()),
            role: Some(user.role),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/jobboard/session.json`, or the working directory when no home is known.
    #[must_use]
    pub fn default_path() -> PathBuf {
        BaseDirs::new().map_or_else(
            || PathBuf::from("./session.json"),
            |dirs| dirs.config_dir().join("jobboard").join("session.json"),
        )
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    /// `Missing` when nothing has been saved, `Corrupt` when the file cannot be parsed.
    pub fn load(&self) -> Result<StoredSession, TokenStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(TokenStoreError::Missing(self.path.clone()));
            }
            Err(source) => return Err(self.io_error(source)),
        };
        serde_json::from_str(&contents).map_err(|source| TokenStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, session: &StoredSession) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let body = serde_json::to_vec_pretty(session).map_err(|source| {
            TokenStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, body).map_err(|source| self.io_error(source))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|source| self.io_error(source))?;
        }
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the saved session. Returns whether a file existed.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool, TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
