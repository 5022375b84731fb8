//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use storynest_core::domain::{
    CommentWithAuthor, Genre, LikeState, Page, Story, StoryDetail, StoryStatus, StoryWithAuthor,
    User, UserCredentials,
};
use storynest_core::ports::{
    DatabaseService, NewStory, NewUser, PortError, PortResult, ProfileChanges, StoryChanges,
    StoryQuery,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Creates a lazily-connecting pool and pings it a bounded number of times.
///
/// The service starts even when every ping fails: the health probe then
/// reports the database as disconnected and data-dependent routes fail
/// per-request instead of at boot.
pub async fn connect_with_retry(
    database_url: &str,
    attempts: u32,
    interval: Duration,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(database_url)?;

    for attempt in 1..=attempts {
        match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => {
                info!("Database connection established");
                return Ok(pool);
            }
            Err(e) => {
                warn!("Database ping {attempt}/{attempts} failed: {e}");
                if attempt < attempts {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
    warn!("Starting without a database connection; data routes will fail per-request");
    Ok(pool)
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    profile_picture_url: Option<String>,
    profile_picture_asset_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            profile_picture_url: self.profile_picture_url,
            profile_picture_asset_id: self.profile_picture_asset_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, profile_picture_url, profile_picture_asset_id, \
                            created_at, updated_at";

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct StoryRecord {
    id: Uuid,
    title: String,
    content: String,
    genre: String,
    author_id: Uuid,
    is_ai_generated: bool,
    status: String,
    word_count: i64,
    image_url: Option<String>,
    image_asset_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoryRecord {
    fn to_domain(self) -> Story {
        Story {
            id: self.id,
            title: self.title,
            content: self.content,
            // Stored labels come from the fixed enumerations; unknown values
            // degrade rather than fail the whole read.
            genre: self.genre.parse().unwrap_or(Genre::Other),
            author_id: self.author_id,
            is_ai_generated: self.is_ai_generated,
            status: self.status.parse().unwrap_or_default(),
            word_count: self.word_count.max(0) as u64,
            image_url: self.image_url,
            image_asset_id: self.image_asset_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const STORY_COLUMNS: &str = "id, title, content, genre, author_id, is_ai_generated, status, \
                             word_count, image_url, image_asset_id, created_at, updated_at";

#[derive(FromRow)]
struct StoryWithAuthorRecord {
    id: Uuid,
    title: String,
    content: String,
    genre: String,
    author_id: Uuid,
    is_ai_generated: bool,
    status: String,
    word_count: i64,
    image_url: Option<String>,
    image_asset_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_username: String,
    like_count: i64,
}

impl StoryWithAuthorRecord {
    fn to_domain(self) -> StoryWithAuthor {
        let like_count = self.like_count.max(0) as u64;
        let author_username = self.author_username;
        let story = StoryRecord {
            id: self.id,
            title: self.title,
            content: self.content,
            genre: self.genre,
            author_id: self.author_id,
            is_ai_generated: self.is_ai_generated,
            status: self.status,
            word_count: self.word_count,
            image_url: self.image_url,
            image_asset_id: self.image_asset_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .to_domain();
        StoryWithAuthor {
            story,
            author_username,
            like_count,
        }
    }
}

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl CommentRecord {
    fn to_domain(self) -> CommentWithAuthor {
        CommentWithAuthor {
            id: self.id,
            author_id: self.author_id,
            author_username: self.author_username,
            text: self.body,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn health(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn credentials_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET \
               username = COALESCE($2, username), \
               email = COALESCE($3, email), \
               updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(changes.username)
            .bind(changes.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {user_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn set_profile_picture(
        &self,
        user_id: Uuid,
        url: &str,
        asset_id: &str,
    ) -> PortResult<()> {
        sqlx::query(
            "UPDATE users SET profile_picture_url = $2, profile_picture_asset_id = $3, \
             updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(url)
        .bind(asset_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn reset_password_by_token(
        &self,
        token: &str,
        new_hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET hashed_password = $2, reset_token = NULL, \
             reset_token_expires_at = NULL, updated_at = now() \
             WHERE reset_token = $1 AND reset_token_expires_at > $3",
        )
        .bind(token)
        .bind(new_hashed_password)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_story(&self, new_story: NewStory) -> PortResult<Story> {
        let sql = format!(
            "INSERT INTO stories (id, title, content, genre, author_id, is_ai_generated, \
             status, word_count, image_url, image_asset_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {STORY_COLUMNS}"
        );
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_story.title)
            .bind(&new_story.content)
            .bind(new_story.genre.as_str())
            .bind(new_story.author_id)
            .bind(new_story.is_ai_generated)
            .bind(new_story.status.as_str())
            .bind(new_story.word_count as i64)
            .bind(&new_story.image_url)
            .bind(&new_story.image_asset_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn story_by_id(&self, story_id: Uuid) -> PortResult<Option<Story>> {
        let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = $1");
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(StoryRecord::to_domain))
    }

    async fn story_detail(&self, story_id: Uuid) -> PortResult<Option<StoryDetail>> {
        let sql = format!(
            "SELECT s.{}, u.username AS author_username, \
               (SELECT COUNT(*) FROM story_likes l WHERE l.story_id = s.id) AS like_count \
             FROM stories s JOIN users u ON u.id = s.author_id \
             WHERE s.id = $1",
            STORY_COLUMNS.replace(", ", ", s.")
        );
        let Some(record) = sqlx::query_as::<_, StoryWithAuthorRecord>(&sql)
            .bind(story_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
        else {
            return Ok(None);
        };

        let like_user_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM story_likes WHERE story_id = $1 ORDER BY created_at ASC",
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let comments = self.comments_for(story_id).await?;

        let with_author = record.to_domain();
        Ok(Some(StoryDetail {
            story: with_author.story,
            author_username: with_author.author_username,
            like_user_ids,
            comments,
        }))
    }

    async fn list_stories(&self, query: StoryQuery) -> PortResult<Page<StoryWithAuthor>> {
        let genre = query.genre.map(|g| g.as_str().to_string());
        let search = query.search.filter(|s| !s.trim().is_empty());
        let pattern = search.map(|s| format!("%{}%", s.trim()));

        const FILTERS: &str = "($1::text IS NULL OR s.genre = $1) \
             AND ($2::uuid IS NULL OR s.author_id = $2) \
             AND ($3::text IS NULL OR s.title ILIKE $3 OR s.content ILIKE $3)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM stories s WHERE {FILTERS}"
        ))
        .bind(&genre)
        .bind(query.author_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let page = query.page.max(1);
        let limit = query.limit.max(1);
        let offset = i64::from(page - 1) * i64::from(limit);

        let sql = format!(
            "SELECT s.{}, u.username AS author_username, \
               (SELECT COUNT(*) FROM story_likes l WHERE l.story_id = s.id) AS like_count \
             FROM stories s JOIN users u ON u.id = s.author_id \
             WHERE {FILTERS} \
             ORDER BY s.created_at DESC \
             LIMIT $4 OFFSET $5",
            STORY_COLUMNS.replace(", ", ", s.")
        );
        let records = sqlx::query_as::<_, StoryWithAuthorRecord>(&sql)
            .bind(&genre)
            .bind(query.author_id)
            .bind(&pattern)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let items = records
            .into_iter()
            .map(StoryWithAuthorRecord::to_domain)
            .collect();
        Ok(Page::new(items, total.max(0) as u64, page, limit))
    }

    async fn update_story(&self, story_id: Uuid, changes: StoryChanges) -> PortResult<Story> {
        let sql = format!(
            "UPDATE stories SET \
               title = COALESCE($2, title), \
               content = COALESCE($3, content), \
               word_count = COALESCE($4, word_count), \
               genre = COALESCE($5, genre), \
               status = COALESCE($6, status), \
               image_url = COALESCE($7, image_url), \
               image_asset_id = COALESCE($8, image_asset_id), \
               updated_at = now() \
             WHERE id = $1 RETURNING {STORY_COLUMNS}"
        );
        let record = sqlx::query_as::<_, StoryRecord>(&sql)
            .bind(story_id)
            .bind(changes.title)
            .bind(changes.content)
            .bind(changes.word_count.map(|n| n as i64))
            .bind(changes.genre.map(|g| g.as_str()))
            .bind(changes.status.map(|s| s.as_str()))
            .bind(changes.image_url)
            .bind(changes.image_asset_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Story {story_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn delete_story(&self, story_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(story_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn toggle_like(&self, story_id: Uuid, user_id: Uuid) -> PortResult<LikeState> {
        let removed = sqlx::query("DELETE FROM story_likes WHERE story_id = $1 AND user_id = $2")
            .bind(story_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?
            .rows_affected();

        let liked = if removed == 0 {
            sqlx::query(
                "INSERT INTO story_likes (story_id, user_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(story_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
            true
        } else {
            false
        };

        let like_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM story_likes WHERE story_id = $1")
                .bind(story_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;

        Ok(LikeState {
            liked,
            like_count: like_count.max(0) as u64,
        })
    }

    async fn add_comment(
        &self,
        story_id: Uuid,
        author_id: Uuid,
        text: &str,
    ) -> PortResult<Vec<CommentWithAuthor>> {
        sqlx::query(
            "INSERT INTO story_comments (id, story_id, author_id, body) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(story_id)
        .bind(author_id)
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        self.comments_for(story_id).await
    }
}

impl DbAdapter {
    async fn comments_for(&self, story_id: Uuid) -> PortResult<Vec<CommentWithAuthor>> {
        let records = sqlx::query_as::<_, CommentRecord>(
            "SELECT c.id, c.author_id, u.username AS author_username, c.body, c.created_at \
             FROM story_comments c JOIN users u ON u.id = c.author_id \
             WHERE c.story_id = $1 ORDER BY c.created_at ASC",
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CommentRecord::to_domain).collect())
    }
}
