use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::playlist::Playlist,
};

fn row_to_playlist(row: &Row, videos: Vec<Uuid>) -> Result<Playlist> {
    Ok(Playlist {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        owner: row.try_get("owner").map_err(|_| AppError::MissingData("owner".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        description: row.try_get("description").map_err(|_| AppError::MissingData("description".to_string()))?,
        videos,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

async fn member_videos(pool: &Pool, playlist_id: Uuid) -> Result<Vec<Uuid>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT video_id
            FROM playlist_videos
            WHERE playlist_id = $1
            ORDER BY added_at
            "#,
            &[&playlist_id],
        )
        .await?;
    rows.iter()
        .map(|r| {
            r.try_get("video_id")
                .map_err(|_| AppError::MissingData("video_id".to_string()))
        })
        .collect()
}

pub async fn create_playlist(
    pool: &Pool,
    id: Uuid,
    owner: &Uuid,
    name: &str,
    description: &str,
) -> Result<Playlist> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO playlists (id, owner, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
            &[&id, owner, &name, &description],
        )
        .await?;
    row_to_playlist(&row, Vec::new())
}

pub async fn find_by_id(pool: &Pool, playlist_id: Uuid) -> Result<Option<Playlist>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM playlists
            WHERE id = $1
            "#,
            &[&playlist_id],
        )
        .await?;
    match row {
        Some(r) => {
            let videos = member_videos(pool, playlist_id).await?;
            Ok(Some(row_to_playlist(&r, videos)?))
        }
        None => Ok(None),
    }
}

pub async fn exists_by_owner_and_name(pool: &Pool, owner: &Uuid, name: &str) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT 1 AS present
            FROM playlists
            WHERE owner = $1 AND name = $2
            "#,
            &[owner, &name],
        )
        .await?;
    Ok(row.is_some())
}

/// Lists a user's playlists without expanding memberships.
pub async fn list_for_user(pool: &Pool, owner: Uuid) -> Result<Vec<Playlist>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM playlists
            WHERE owner = $1
            ORDER BY created_at DESC
            "#,
            &[&owner],
        )
        .await?;
    rows.iter().map(|r| row_to_playlist(r, Vec::new())).collect()
}

pub async fn update_details(
    pool: &Pool,
    playlist_id: Uuid,
    name: &str,
    description: &str,
) -> Result<Playlist> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE playlists
            SET name = $1, description = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
            &[&name, &description, &playlist_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    let videos = member_videos(pool, playlist_id).await?;
    row_to_playlist(&row, videos)
}

pub async fn delete_playlist(pool: &Pool, playlist_id: Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            r#"
            DELETE FROM playlists
            WHERE id = $1
            "#,
            &[&playlist_id],
        )
        .await?;
    Ok(deleted == 1)
}

/// Adds a video to a playlist. Returns false if it was already a member.
pub async fn add_video(pool: &Pool, playlist_id: Uuid, video_id: Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let inserted = client
        .execute(
            r#"
            INSERT INTO playlist_videos (playlist_id, video_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
            &[&playlist_id, &video_id],
        )
        .await?;
    Ok(inserted == 1)
}

/// Removes a video from a playlist. Returns false if it was not a member.
pub async fn remove_video(pool: &Pool, playlist_id: Uuid, video_id: Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let removed = client
        .execute(
            r#"
            DELETE FROM playlist_videos
            WHERE playlist_id = $1 AND video_id = $2
            "#,
            &[&playlist_id, &video_id],
        )
        .await?;
    Ok(removed == 1)
}
