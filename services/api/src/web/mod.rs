//! services/api/src/web/mod.rs
//!
//! Route tables and the liveness probe. `app` builds the complete router so
//! the binary and the integration tests serve exactly the same application.

pub mod auth;
pub mod middleware;
pub mod state;
pub mod stories;
pub mod token;
pub mod users;
pub mod views;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::web::state::AppState;

/// Builds the full application router: `/api` routes behind the rate limiter,
/// the health probe, and static serving of the local uploads directory.
pub fn app(state: Arc<AppState>) -> Router {
    let origin = state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000"));
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api = Router::new()
        .nest("/users", user_routes(state.clone()))
        .nest("/stories", story_routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/forgot-password", post(auth::forgot_password_handler))
        .route("/reset-password", post(auth::reset_password_handler));

    let protected = Router::new()
        .route(
            "/profile",
            get(users::get_profile_handler)
                .put(users::update_profile_handler)
                .delete(users::delete_profile_handler),
        )
        .route("/profile/picture", post(users::upload_picture_handler))
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    public.merge(protected)
}

fn story_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/", get(stories::list_stories_handler))
        .route("/{id}", get(stories::get_story_handler));

    let protected = Router::new()
        .route("/", post(stories::create_story_handler))
        .route("/generate", post(stories::generate_story_handler))
        .route("/user/{user_id}", get(stories::list_user_stories_handler))
        .route(
            "/{id}",
            put(stories::update_story_handler).delete(stories::delete_story_handler),
        )
        .route("/{id}/like", post(stories::toggle_like_handler))
        .route("/{id}/comments", post(stories::add_comment_handler))
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    public.merge(protected)
}

//=========================================================================================
// Health Probe
//=========================================================================================

#[derive(Serialize)]
struct HealthView {
    status: &'static str,
    database: &'static str,
}

/// GET /health - liveness plus the store's connectivity ping.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.db.health().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };
    Json(HealthView {
        status: "ok",
        database,
    })
}
