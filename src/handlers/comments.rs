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
    models::comment::Comment,
    repositories::{comment as comment_repo, video as video_repo},
    services::ownership,
    state::AppState,
    validation::auth::validate_text,
};

#[derive(Deserialize, Debug)]
pub struct CommentRequest {
    pub content: String,
}

/// Lists a video's comments, newest first.
#[axum::debug_handler]
pub async fn list_for_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Comment>>> {
    video_repo::find_by_id(&state.db, video_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let comments =
        comment_repo::list_for_video(&state.db, video_id, pagination.limit(), pagination.offset())
            .await?;
    Ok(Json(comments))
}

/// Adds a comment to a video.
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<Response> {
    validate_text("content", &payload.content, 1000)?;

    video_repo::find_by_id(&state.db, video_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let comment = comment_repo::create_comment(
        &state.db,
        Uuid::new_v4(),
        &user.id,
        video_id,
        &payload.content,
    )
    .await?;

    tracing::info!("💬 Comment added: {} on video {}", comment.id, video_id);
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

/// Edits a comment's content.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>> {
    validate_text("content", &payload.content, 1000)?;

    ownership::authorize(user.id, || comment_repo::find_by_id(&state.db, comment_id)).await?;

    let comment = comment_repo::update_content(&state.db, comment_id, &payload.content).await?;
    Ok(Json(comment))
}

/// Deletes a comment.
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode> {
    ownership::authorize(user.id, || comment_repo::find_by_id(&state.db, comment_id)).await?;

    if !comment_repo::delete_comment(&state.db, comment_id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
