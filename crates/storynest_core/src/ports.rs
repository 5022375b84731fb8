//! crates/storynest_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or provider APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    CommentWithAuthor, Genre, LikeState, Page, Story, StoryDetail, StoryStatus, StoryWithAuthor,
    User, UserCredentials,
};
use crate::media::EncodedImage;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Input Types
//=========================================================================================

/// Fields required to create a user row. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// Partial profile update; only `Some` fields change.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Fields required to create a story row. `word_count` is computed by the
/// caller from `content` before it reaches the store.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub title: String,
    pub content: String,
    pub genre: Genre,
    pub author_id: Uuid,
    pub is_ai_generated: bool,
    pub status: StoryStatus,
    pub word_count: u64,
    pub image_url: Option<String>,
    pub image_asset_id: Option<String>,
}

/// Partial story update; only `Some` fields change. When `content` is set the
/// caller supplies the recomputed `word_count` alongside it.
#[derive(Debug, Clone, Default)]
pub struct StoryChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub word_count: Option<u64>,
    pub genre: Option<Genre>,
    pub status: Option<StoryStatus>,
    pub image_url: Option<String>,
    pub image_asset_id: Option<String>,
}

/// Filters and pagination for the story listing endpoints.
#[derive(Debug, Clone, Default)]
pub struct StoryQuery {
    pub page: u32,
    pub limit: u32,
    pub genre: Option<Genre>,
    /// Free-text match over title and content.
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Connectivity probe for the health endpoint.
    async fn health(&self) -> PortResult<()>;

    // --- User Management ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>>;

    /// Credentials lookup for login; email is matched lowercased.
    async fn credentials_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> PortResult<User>;

    async fn set_profile_picture(
        &self,
        user_id: Uuid,
        url: &str,
        asset_id: &str,
    ) -> PortResult<()>;

    /// Deleting a user cascades to their stories, likes, and comments.
    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Password Reset ---
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Replaces the password hash and clears the token and expiry in a single
    /// statement. Returns `false` when no row carries an unexpired matching
    /// token.
    async fn reset_password_by_token(
        &self,
        token: &str,
        new_hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<bool>;

    // --- Story Management ---
    async fn create_story(&self, new_story: NewStory) -> PortResult<Story>;

    async fn story_by_id(&self, story_id: Uuid) -> PortResult<Option<Story>>;

    /// The fully-resolved view: author username, like membership, comments.
    async fn story_detail(&self, story_id: Uuid) -> PortResult<Option<StoryDetail>>;

    /// Newest-created-first, with the filters in `query` applied.
    async fn list_stories(&self, query: StoryQuery) -> PortResult<Page<StoryWithAuthor>>;

    async fn update_story(&self, story_id: Uuid, changes: StoryChanges) -> PortResult<Story>;

    async fn delete_story(&self, story_id: Uuid) -> PortResult<()>;

    // --- Likes and Comments ---
    /// Set-semantics flip: removes the membership row if present, inserts it
    /// otherwise.
    async fn toggle_like(&self, story_id: Uuid, user_id: Uuid) -> PortResult<LikeState>;

    /// Appends a comment and returns the full, author-resolved comment list.
    async fn add_comment(
        &self,
        story_id: Uuid,
        author_id: Uuid,
        text: &str,
    ) -> PortResult<Vec<CommentWithAuthor>>;
}

/// A published asset at the external host.
#[derive(Debug, Clone)]
pub struct PublishedAsset {
    pub url: String,
    pub asset_id: String,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Uploads an encoded image, requesting automatic format/quality
    /// optimization. Failures surface to the caller unretried.
    async fn publish(&self, image: &EncodedImage, folder: &str) -> PortResult<PublishedAsset>;

    /// Best-effort delete of a previously published asset. Callers log
    /// failures and move on; deletion is never on a user-facing critical path.
    async fn retire(&self, asset_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait TextCompletionService: Send + Sync {
    /// Issues one completion request and returns the generated text, or an
    /// error when the provider response carries no completion.
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> PortResult<String>;
}

impl<T> Page<T> {
    /// Assembles a page, deriving the page count from `total` and `limit`.
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit)) as u32
        };
        Self {
            items,
            total,
            page,
            pages,
        }
    }
}
