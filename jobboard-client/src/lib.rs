#![cfg_attr(not(test), forbid(unsafe_code))]

//! Jobboard client library.
//!
//! - [`gateway`]: REST calls returning [`error::GatewayResult`].
//! - [`store`]: the chat slice, a yewdux store changed only by [`store::ChatAction`].
//! - [`realtime`]: presence and message-insert subscriptions.
//! - [`session`]: coordinates the three for one signed-in user.

pub mod error;
pub mod gateway;
pub mod notify;
pub mod realtime;
pub mod session;
pub mod store;
pub mod token_store;

pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use gateway::{ChatGateway, JobBoardClient};
pub use notify::Notification;
pub use session::ChatSession;
pub use token_store::{StoredSession, TokenStore, TokenStoreError};
