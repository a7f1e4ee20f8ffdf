use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::like::{LikeStatus, LikeTarget},
    repositories::{
        comment as comment_repo, like as like_repo, tweet as tweet_repo, video as video_repo,
    },
    state::AppState,
};

/// Toggles a like on a video.
#[axum::debug_handler]
pub async fn toggle_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<LikeStatus>> {
    video_repo::find_by_id(&state.db, video_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let liked = like_repo::toggle(&state.db, &user.id, LikeTarget::Video(video_id)).await?;
    Ok(Json(LikeStatus { liked }))
}

/// Toggles a like on a comment.
#[axum::debug_handler]
pub async fn toggle_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<LikeStatus>> {
    comment_repo::find_by_id(&state.db, comment_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let liked = like_repo::toggle(&state.db, &user.id, LikeTarget::Comment(comment_id)).await?;
    Ok(Json(LikeStatus { liked }))
}

/// Toggles a like on a tweet.
#[axum::debug_handler]
pub async fn toggle_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(tweet_id): Path<Uuid>,
) -> Result<Json<LikeStatus>> {
    tweet_repo::find_by_id(&state.db, tweet_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let liked = like_repo::toggle(&state.db, &user.id, LikeTarget::Tweet(tweet_id)).await?;
    Ok(Json(LikeStatus { liked }))
}
