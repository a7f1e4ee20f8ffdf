use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    handlers::videos::Pagination,
    middleware_layer::auth::CurrentUser,
    models::tweet::Tweet,
    repositories::tweet as tweet_repo,
    services::ownership,
    state::AppState,
    validation::auth::validate_text,
};

#[derive(Deserialize, Debug)]
pub struct TweetRequest {
    pub content: String,
}

/// Posts a new tweet.
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<TweetRequest>,
) -> Result<Response> {
    validate_text("content", &payload.content, 280)?;

    let tweet =
        tweet_repo::create_tweet(&state.db, Uuid::new_v4(), &user.id, &payload.content).await?;

    tracing::info!("🐦 Tweet posted: {} by {}", tweet.id, user.id);
    Ok((StatusCode::CREATED, Json(tweet)).into_response())
}

/// Lists a user's tweets, newest first.
#[axum::debug_handler]
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Tweet>>> {
    let tweets =
        tweet_repo::list_for_user(&state.db, user_id, pagination.limit(), pagination.offset())
            .await?;
    Ok(Json(tweets))
}

/// Edits a tweet's content.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(tweet_id): Path<Uuid>,
    Json(payload): Json<TweetRequest>,
) -> Result<Json<Tweet>> {
    validate_text("content", &payload.content, 280)?;

    ownership::authorize(user.id, || tweet_repo::find_by_id(&state.db, tweet_id)).await?;

    let tweet = tweet_repo::update_content(&state.db, tweet_id, &payload.content).await?;
    Ok(Json(tweet))
}

/// Deletes a tweet.
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(tweet_id): Path<Uuid>,
) -> Result<StatusCode> {
    ownership::authorize(user.id, || tweet_repo::find_by_id(&state.db, tweet_id)).await?;

    if !tweet_repo::delete_tweet(&state.db, tweet_id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
