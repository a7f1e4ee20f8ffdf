use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::video::Video,
    repositories::video as video_repo,
    services::{assets, ownership},
    state::AppState,
    storage::AssetRef,
    validation::auth::validate_text,
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;

/// Page-number pagination shared by the listing endpoints.
#[derive(Deserialize, Debug, Default)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page.unwrap_or(1).max(1) - 1) * self.limit()
    }
}

/// Lists published videos, newest first.
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Video>>> {
    let videos =
        video_repo::list_published(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(videos))
}

/// Returns one published video. Unpublished videos are invisible here.
#[axum::debug_handler]
pub async fn get(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<Video>> {
    let video = video_repo::find_by_id(&state.db, video_id)
        .await?
        .filter(|v| v.is_published)
        .ok_or(AppError::NotFound)?;

    Ok(Json(video))
}

/// Publishes a new video.
///
/// Multipart: `title` and `description` text fields, an optional `duration`
/// in seconds, plus `video_file` and `thumbnail` files. Both files are at
/// the provider before the row is written; a failed insert reclaims them.
#[axum::debug_handler]
pub async fn publish(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut title = None;
    let mut description = None;
    let mut duration = 0.0_f64;
    let mut staged_video = None;
    let mut staged_thumbnail = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => title = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "duration" => {
                duration = read_text(field)
                    .await?
                    .parse()
                    .map_err(|_| AppError::Validation("Invalid duration".to_string()))?
            }
            "video_file" => {
                staged_video = Some(assets::stage_field(&state.config.temp_dir, field).await?)
            }
            "thumbnail" => {
                staged_thumbnail = Some(assets::stage_field(&state.config.temp_dir, field).await?)
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| AppError::Validation("title is required".to_string()))?;
    let description =
        description.ok_or_else(|| AppError::Validation("description is required".to_string()))?;
    let staged_video = staged_video
        .ok_or_else(|| AppError::Validation("video_file is required".to_string()))?;
    let staged_thumbnail = staged_thumbnail
        .ok_or_else(|| AppError::Validation("thumbnail is required".to_string()))?;

    validate_text("title", &title, 255)?;
    validate_text("description", &description, 5000)?;

    let storage = state.storage.as_ref();

    let video_file = assets::replace(storage, None, staged_video).await?.new_ref;

    let thumbnail = match assets::replace(storage, None, staged_thumbnail).await {
        Ok(swap) => swap.new_ref,
        Err(e) => {
            assets::reclaim(storage, &video_file).await;
            return Err(e);
        }
    };

    let video = match video_repo::create_video(
        &state.db,
        Uuid::new_v4(),
        &user.id,
        &title,
        &description,
        video_file.url(),
        thumbnail.url(),
        duration,
        true,
    )
    .await
    {
        Ok(video) => video,
        Err(e) => {
            assets::reclaim(storage, &video_file).await;
            assets::reclaim(storage, &thumbnail).await;
            return Err(e);
        }
    };

    tracing::info!("✅ Video published: {} by {}", video.id, user.id);
    Ok((StatusCode::CREATED, Json(video)).into_response())
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Multipart(format!("Failed to read text field: {}", e)))
}

/// Updates a video's title, description, and optionally its thumbnail.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Video>> {
    let mut title = None;
    let mut description = None;
    let mut staged_thumbnail = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => title = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "thumbnail" => {
                staged_thumbnail = Some(assets::stage_field(&state.config.temp_dir, field).await?)
            }
            _ => {}
        }
    }

    let video =
        ownership::authorize(user.id, || video_repo::find_by_id(&state.db, video_id)).await?;

    let title = title.unwrap_or_else(|| video.title.clone());
    let description = description.unwrap_or_else(|| video.description.clone());
    validate_text("title", &title, 255)?;
    validate_text("description", &description, 5000)?;

    let storage = state.storage.as_ref();

    let (thumbnail, reclaim_old) = match staged_thumbnail {
        Some(staged) => {
            let swap =
                assets::replace(storage, Some(AssetRef(video.thumbnail.clone())), staged).await?;
            (swap.new_ref.url().to_string(), swap.old_ref)
        }
        None => (video.thumbnail.clone(), None),
    };

    let updated = match video_repo::update_details(
        &state.db,
        video_id,
        &title,
        &description,
        &thumbnail,
    )
    .await
    {
        Ok(updated) => updated,
        Err(e) => {
            if reclaim_old.is_some() {
                assets::reclaim(storage, &AssetRef(thumbnail)).await;
            }
            return Err(e);
        }
    };

    if let Some(old) = reclaim_old {
        assets::reclaim(storage, &old).await;
    }

    tracing::info!("✅ Video updated: {}", video_id);
    Ok(Json(updated))
}

/// Flips a video's published flag.
#[axum::debug_handler]
pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<Video>> {
    ownership::authorize(user.id, || video_repo::find_by_id(&state.db, video_id)).await?;

    let video = video_repo::toggle_published(&state.db, video_id).await?;
    Ok(Json(video))
}

/// Deletes a video, then reclaims its media and thumbnail from the
/// provider. The row goes first so a reclaim failure can only orphan an
/// asset, never resurrect the record.
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(video_id): Path<Uuid>,
) -> Result<StatusCode> {
    let video =
        ownership::authorize(user.id, || video_repo::find_by_id(&state.db, video_id)).await?;

    if !video_repo::delete_video(&state.db, video_id).await? {
        return Err(AppError::NotFound);
    }

    let storage = state.storage.as_ref();
    assets::reclaim(storage, &AssetRef(video.video_file)).await;
    assets::reclaim(storage, &AssetRef(video.thumbnail)).await;

    tracing::info!("🗑️ Video deleted: {}", video_id);
    Ok(StatusCode::NO_CONTENT)
}
