pub mod auth;
pub mod chat;
pub mod envelope;
pub mod errors;
pub mod feed;
pub mod jobs;
pub mod profile;
pub mod realtime;
pub mod timestamp;

pub use auth::{AuthenticatedUser, LoginRequest, LoginResponse, UserRole};
pub use chat::{
    Contact, MarkReadRequest, Message, MessageId, PresenceMeta, SendMessageRequest, UserId,
};
pub use envelope::{Envelope, Page, PaginatedBody};
pub use errors::ErrorResponse;
pub use feed::{
    Comment, CreateCommentRequest, CreatePostRequest, Post, ReactRequest, ReactionKind,
    UpdateCommentRequest,
};
pub use jobs::{
    ApplicationStatus, CreateJobRequest, Job, JobApplication, JobApplicationRequest, JobType,
};
pub use profile::{EmployerProfile, ItianProfile};
pub use realtime::{
    PresenceMember, PresenceSyncEvent, RealtimeEvent, RowInsertEvent, StreamErrorEvent,
};
pub use timestamp::Timestamp;
