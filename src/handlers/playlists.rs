use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::playlist::Playlist,
    repositories::{playlist as playlist_repo, video as video_repo},
    services::ownership,
    state::AppState,
    validation::auth::validate_text,
};

#[derive(Deserialize, Debug)]
pub struct PlaylistRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Creates a playlist. Names are unique per owner.
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<PlaylistRequest>,
) -> Result<Response> {
    validate_text("name", &payload.name, 100)?;

    if playlist_repo::exists_by_owner_and_name(&state.db, &user.id, &payload.name).await? {
        return Err(AppError::Conflict(
            "A playlist with this name already exists".to_string(),
        ));
    }

    let playlist = playlist_repo::create_playlist(
        &state.db,
        Uuid::new_v4(),
        &user.id,
        &payload.name,
        &payload.description,
    )
    .await?;

    tracing::info!("📋 Playlist created: {} by {}", playlist.id, user.id);
    Ok((StatusCode::CREATED, Json(playlist)).into_response())
}

/// Returns a playlist with its member video ids.
#[axum::debug_handler]
pub async fn get(
    State(state): State<AppState>,
    Path(playlist_id): Path<Uuid>,
) -> Result<Json<Playlist>> {
    let playlist = playlist_repo::find_by_id(&state.db, playlist_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(playlist))
}

/// Lists a user's playlists.
#[axum::debug_handler]
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Playlist>>> {
    let playlists = playlist_repo::list_for_user(&state.db, user_id).await?;
    Ok(Json(playlists))
}

/// Renames a playlist or changes its description.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(playlist_id): Path<Uuid>,
    Json(payload): Json<PlaylistRequest>,
) -> Result<Json<Playlist>> {
    validate_text("name", &payload.name, 100)?;

    let existing =
        ownership::authorize(user.id, || playlist_repo::find_by_id(&state.db, playlist_id))
            .await?;

    if existing.name != payload.name
        && playlist_repo::exists_by_owner_and_name(&state.db, &user.id, &payload.name).await?
    {
        return Err(AppError::Conflict(
            "A playlist with this name already exists".to_string(),
        ));
    }

    let playlist = playlist_repo::update_details(
        &state.db,
        playlist_id,
        &payload.name,
        &payload.description,
    )
    .await?;

    Ok(Json(playlist))
}

/// Deletes a playlist. Memberships go with it; videos are untouched.
#[axum::debug_handler]
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(playlist_id): Path<Uuid>,
) -> Result<StatusCode> {
    ownership::authorize(user.id, || playlist_repo::find_by_id(&state.db, playlist_id)).await?;

    if !playlist_repo::delete_playlist(&state.db, playlist_id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!("🗑️ Playlist deleted: {}", playlist_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Adds a video to a playlist. Adding twice is a no-op.
#[axum::debug_handler]
pub async fn add_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((playlist_id, video_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Playlist>> {
    ownership::authorize(user.id, || playlist_repo::find_by_id(&state.db, playlist_id)).await?;

    video_repo::find_by_id(&state.db, video_id)
        .await?
        .ok_or(AppError::NotFound)?;

    playlist_repo::add_video(&state.db, playlist_id, video_id).await?;

    let playlist = playlist_repo::find_by_id(&state.db, playlist_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(playlist))
}

/// Removes a video from a playlist.
#[axum::debug_handler]
pub async fn remove_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((playlist_id, video_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Playlist>> {
    ownership::authorize(user.id, || playlist_repo::find_by_id(&state.db, playlist_id)).await?;

    if !playlist_repo::remove_video(&state.db, playlist_id, video_id).await? {
        return Err(AppError::NotFound);
    }

    let playlist = playlist_repo::find_by_id(&state.db, playlist_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(playlist))
}
