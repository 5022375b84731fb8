//! services/api/src/web/views.rs
//!
//! The JSON envelope and the response shapes the handlers return. Domain
//! structs never serialize directly; these views decide what clients see.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use storynest_core::domain::{CommentWithAuthor, Story, StoryDetail, StoryWithAuthor, User};

//=========================================================================================
// Success Envelope
//=========================================================================================

/// The success envelope: `{"success": true, "data"?: .., "message"?: ..}`.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    pub fn data_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        })
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.into()),
        })
    }
}

//=========================================================================================
// User Views
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PublicUser {
    pub fn from_domain(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            profile_picture_url: user.profile_picture_url.clone(),
            created_at: user.created_at,
        }
    }
}

/// Identity plus a fresh session token, returned by register and login.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthView {
    pub token: String,
    pub user: PublicUser,
}

//=========================================================================================
// Story Views
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub genre: String,
    pub author: AuthorRef,
    pub is_ai_generated: bool,
    pub status: String,
    pub word_count: u64,
    pub image_url: Option<String>,
    pub like_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryView {
    pub fn from_parts(story: &Story, author_username: &str, like_count: u64) -> Self {
        Self {
            id: story.id,
            title: story.title.clone(),
            content: story.content.clone(),
            genre: story.genre.as_str().to_string(),
            author: AuthorRef {
                id: story.author_id,
                username: author_username.to_string(),
            },
            is_ai_generated: story.is_ai_generated,
            status: story.status.as_str().to_string(),
            word_count: story.word_count,
            image_url: story.image_url.clone(),
            like_count,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }

    pub fn from_listing(item: &StoryWithAuthor) -> Self {
        Self::from_parts(&item.story, &item.author_username, item.like_count)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub author: AuthorRef,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn from_domain(comment: &CommentWithAuthor) -> Self {
        Self {
            id: comment.id,
            author: AuthorRef {
                id: comment.author_id,
                username: comment.author_username.clone(),
            },
            text: comment.text.clone(),
            created_at: comment.created_at,
        }
    }
}

/// The fully-resolved single-story view.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDetailView {
    #[serde(flatten)]
    pub story: StoryView,
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentView>,
}

impl StoryDetailView {
    pub fn from_domain(detail: &StoryDetail) -> Self {
        Self {
            story: StoryView::from_parts(
                &detail.story,
                &detail.author_username,
                detail.like_user_ids.len() as u64,
            ),
            likes: detail.like_user_ids.clone(),
            comments: detail.comments.iter().map(CommentView::from_domain).collect(),
        }
    }
}

/// One page of the story listing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryListView {
    pub stories: Vec<StoryView>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}
