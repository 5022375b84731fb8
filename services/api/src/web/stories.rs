//! services/api/src/web/stories.rs
//!
//! Story endpoints: CRUD, listing, likes, comments, and the AI generation
//! proxy. Create and update accept multipart form data so an image can ride
//! along with the text fields.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::error::{ApiError, ApiResult};
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;
use crate::web::views::{
    CommentView, Envelope, StoryDetailView, StoryListView, StoryView,
};
use storynest_core::domain::{self, Genre, Story, StoryStatus};
use storynest_core::generation::generate_story;
use storynest_core::media;
use storynest_core::ports::{NewStory, PublishedAsset, StoryChanges, StoryQuery};
use storynest_core::validate;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 50;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub genre: Option<String>,
    pub search: Option<String>,
    /// Author username filter.
    pub author: Option<String>,
}

#[derive(Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeView {
    pub liked: bool,
    pub like_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedStoryView {
    pub title: String,
    pub content: String,
    pub genre: String,
    pub is_ai_generated: bool,
}

//=========================================================================================
// Multipart Form Support
//=========================================================================================

#[derive(Default)]
struct StoryForm {
    title: Option<String>,
    content: Option<String>,
    genre: Option<String>,
    status: Option<String>,
    is_ai_generated: Option<String>,
    image: Option<(Bytes, String, String)>,
}

async fn parse_story_form(mut multipart: Multipart) -> ApiResult<StoryForm> {
    let mut form = StoryForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = Some(read_text(field).await?),
            "content" => form.content = Some(read_text(field).await?),
            "genre" => form.genre = Some(read_text(field).await?),
            "status" => form.status = Some(read_text(field).await?),
            "isAiGenerated" => form.is_ai_generated = Some(read_text(field).await?),
            "image" => {
                let mime_type = field
                    .content_type()
                    .ok_or_else(|| {
                        ApiError::Validation("Image field is missing a content type".to_string())
                    })?
                    .to_string();
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::Validation(format!("Failed to read image field: {e}"))
                })?;
                form.image = Some((bytes, mime_type, filename));
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read form field: {e}")))
}

/// Runs an attached image through the ingest step and the asset store.
async fn publish_image(
    state: &AppState,
    image: &(Bytes, String, String),
    folder: &str,
) -> ApiResult<PublishedAsset> {
    let (bytes, mime_type, filename) = image;
    let encoded = media::ingest(bytes, mime_type, filename, Some(bytes.len()))?;
    state
        .assets
        .publish(&encoded, folder)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))
}

fn parse_genre(raw: &str) -> ApiResult<Genre> {
    raw.parse::<Genre>()
        .map_err(|_| ApiError::Validation(format!("Unknown genre: {raw}")))
}

fn parse_status(raw: &str) -> ApiResult<StoryStatus> {
    raw.parse::<StoryStatus>()
        .map_err(|_| ApiError::Validation(format!("Unknown status: {raw}")))
}

/// Looks up a story and checks the requester owns it. Shared by update and
/// delete, which fail identically.
async fn owned_story(state: &AppState, story_id: Uuid, user_id: Uuid) -> ApiResult<Story> {
    let story = state
        .db
        .story_by_id(story_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))?;
    if story.author_id != user_id {
        return Err(ApiError::Forbidden(
            "You can only modify your own stories".to_string(),
        ));
    }
    Ok(story)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/stories
pub async fn create_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = parse_story_form(multipart).await?;

    let title = form
        .title
        .ok_or_else(|| ApiError::Validation("Title is required".to_string()))?;
    let content = form
        .content
        .ok_or_else(|| ApiError::Validation("Story content is required".to_string()))?;
    let genre_raw = form
        .genre
        .ok_or_else(|| ApiError::Validation("Genre is required".to_string()))?;

    validate::validate_title(&title)?;
    validate::validate_content(&content)?;
    let genre = parse_genre(&genre_raw)?;
    let status = match form.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => StoryStatus::default(),
    };

    let published = match &form.image {
        Some(image) => Some(publish_image(&state, image, "stories").await?),
        None => None,
    };

    // Set when the client persists a draft it got from the generate endpoint.
    let is_ai_generated = form
        .is_ai_generated
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let word_count = domain::word_count(&content);
    let story = state
        .db
        .create_story(NewStory {
            title: title.trim().to_string(),
            content,
            genre,
            author_id: user.id,
            is_ai_generated,
            status,
            word_count,
            image_url: published.as_ref().map(|p| p.url.clone()),
            image_asset_id: published.as_ref().map(|p| p.asset_id.clone()),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Envelope::data(StoryView::from_parts(&story, &user.username, 0)),
    ))
}

/// GET /api/stories
pub async fn list_stories_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let genre = match params.genre.as_deref().filter(|g| !g.trim().is_empty()) {
        Some(raw) => Some(parse_genre(raw)?),
        None => None,
    };

    // An unknown author username matches nothing rather than erroring.
    let author_id = match params.author.as_deref().filter(|a| !a.trim().is_empty()) {
        Some(username) => match state.db.find_user_by_username(username.trim()).await? {
            Some(author) => Some(author.id),
            None => {
                return Ok(Envelope::data(StoryListView {
                    stories: Vec::new(),
                    total: 0,
                    page,
                    pages: 0,
                }))
            }
        },
        None => None,
    };

    let listing = state
        .db
        .list_stories(StoryQuery {
            page,
            limit,
            genre,
            search: params.search,
            author_id,
        })
        .await?;

    Ok(Envelope::data(StoryListView {
        stories: listing.items.iter().map(StoryView::from_listing).collect(),
        total: listing.total,
        page: listing.page,
        pages: listing.pages,
    }))
}

/// GET /api/stories/{id}
pub async fn get_story_handler(
    State(state): State<Arc<AppState>>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let detail = state
        .db
        .story_detail(story_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))?;
    Ok(Envelope::data(StoryDetailView::from_domain(&detail)))
}

/// PUT /api/stories/{id}
///
/// Partial update: only fields present in the form change. The author and the
/// AI-generated flag never change after creation.
pub async fn update_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(story_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let existing = owned_story(&state, story_id, user.id).await?;
    let form = parse_story_form(multipart).await?;

    let mut changes = StoryChanges::default();

    if let Some(title) = form.title {
        validate::validate_title(&title)?;
        changes.title = Some(title.trim().to_string());
    }
    if let Some(content) = form.content {
        validate::validate_content(&content)?;
        changes.word_count = Some(domain::word_count(&content));
        changes.content = Some(content);
    }
    if let Some(genre_raw) = form.genre {
        changes.genre = Some(parse_genre(&genre_raw)?);
    }
    if let Some(status_raw) = form.status {
        changes.status = Some(parse_status(&status_raw)?);
    }

    if let Some(image) = &form.image {
        let published = publish_image(&state, image, "stories").await?;
        changes.image_url = Some(published.url);
        changes.image_asset_id = Some(published.asset_id);
    }

    let updated = state.db.update_story(story_id, changes).await?;

    // Retire the replaced image only after the new one is committed.
    if form.image.is_some() {
        if let Some(old) = existing.image_asset_id {
            if let Err(e) = state.assets.retire(&old).await {
                warn!(story_id = %story_id, "failed to retire replaced story image: {e}");
            }
        }
    }

    let detail = state
        .db
        .story_detail(updated.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Story not found".to_string()))?;
    Ok(Envelope::data(StoryDetailView::from_domain(&detail)))
}

/// DELETE /api/stories/{id}
pub async fn delete_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let story = owned_story(&state, story_id, user.id).await?;

    if let Some(asset_id) = &story.image_asset_id {
        if let Err(e) = state.assets.retire(asset_id).await {
            warn!(story_id = %story_id, "failed to retire story image: {e}");
        }
    }

    state.db.delete_story(story_id).await?;
    Ok(Envelope::message("Story deleted successfully"))
}

/// POST /api/stories/{id}/like
pub async fn toggle_like_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(story_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if state.db.story_by_id(story_id).await?.is_none() {
        return Err(ApiError::NotFound("Story not found".to_string()));
    }

    let like = state.db.toggle_like(story_id, user.id).await?;
    Ok(Envelope::data(LikeView {
        liked: like.liked,
        like_count: like.like_count,
    }))
}

/// POST /api/stories/{id}/comments
pub async fn add_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(story_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("Comment text is required".to_string()));
    }

    if state.db.story_by_id(story_id).await?.is_none() {
        return Err(ApiError::NotFound("Story not found".to_string()));
    }

    let comments = state.db.add_comment(story_id, user.id, text).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(
            comments
                .iter()
                .map(CommentView::from_domain)
                .collect::<Vec<_>>(),
        ),
    ))
}

/// GET /api/stories/user/{user_id}
///
/// Self-only: a requester may list only their own stories.
pub async fn list_user_stories_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    if user.id != user_id {
        return Err(ApiError::Forbidden(
            "You can only view your own stories".to_string(),
        ));
    }

    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let listing = state
        .db
        .list_stories(StoryQuery {
            page,
            limit,
            author_id: Some(user_id),
            ..StoryQuery::default()
        })
        .await?;

    let view = StoryListView {
        stories: listing.items.iter().map(StoryView::from_listing).collect(),
        total: listing.total,
        page: listing.page,
        pages: listing.pages,
    };

    if view.total == 0 {
        return Ok(Envelope::data_with_message(
            view,
            "You haven't published any stories yet",
        ));
    }
    Ok(Envelope::data(view))
}

/// POST /api/stories/generate
///
/// Proxies to the generation provider; nothing is persisted here. The client
/// follows up with a normal create request if the user keeps the result.
pub async fn generate_story_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(_user)): Extension<CurrentUser>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<impl IntoResponse> {
    let completions = state.completions.as_ref().ok_or_else(|| {
        ApiError::Config(ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
    })?;

    let generated = generate_story(completions.as_ref(), &req.prompt).await?;

    Ok(Envelope::data(GeneratedStoryView {
        title: generated.title,
        content: generated.content,
        genre: generated.genre.as_str().to_string(),
        is_ai_generated: generated.is_ai_generated,
    }))
}
