use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::video::Video,
};

fn row_to_video(row: &Row) -> Result<Video> {
    Ok(Video {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        owner: row.try_get("owner").map_err(|_| AppError::MissingData("owner".to_string()))?,
        title: row.try_get("title").map_err(|_| AppError::MissingData("title".to_string()))?,
        description: row.try_get("description").map_err(|_| AppError::MissingData("description".to_string()))?,
        video_file: row.try_get("video_file").map_err(|_| AppError::MissingData("video_file".to_string()))?,
        thumbnail: row.try_get("thumbnail").map_err(|_| AppError::MissingData("thumbnail".to_string()))?,
        duration: row.try_get("duration").map_err(|_| AppError::MissingData("duration".to_string()))?,
        views: row.try_get("views").map_err(|_| AppError::MissingData("views".to_string()))?,
        is_published: row.try_get("is_published").map_err(|_| AppError::MissingData("is_published".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

pub async fn create_video(
    pool: &Pool,
    id: Uuid,
    owner: &Uuid,
    title: &str,
    description: &str,
    video_file: &str,
    thumbnail: &str,
    duration: f64,
    is_published: bool,
) -> Result<Video> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO videos (id, owner, title, description, video_file, thumbnail, duration, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
            &[&id, owner, &title, &description, &video_file, &thumbnail, &duration, &is_published],
        )
        .await?;
    row_to_video(&row)
}

pub async fn find_by_id(pool: &Pool, video_id: Uuid) -> Result<Option<Video>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM videos
            WHERE id = $1
            "#,
            &[&video_id],
        )
        .await?;
    row.map(|r| row_to_video(&r)).transpose()
}

/// Lists published videos, newest first. Plain query, no joins.
pub async fn list_published(pool: &Pool, limit: i64, offset: i64) -> Result<Vec<Video>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM videos
            WHERE is_published = TRUE
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
            &[&limit, &offset],
        )
        .await?;
    rows.iter().map(row_to_video).collect()
}

/// Updates title, description, and (when replaced) the thumbnail reference.
pub async fn update_details(
    pool: &Pool,
    video_id: Uuid,
    title: &str,
    description: &str,
    thumbnail: &str,
) -> Result<Video> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE videos
            SET title = $1, description = $2, thumbnail = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
            &[&title, &description, &thumbnail, &video_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_video(&row)
}

pub async fn toggle_published(pool: &Pool, video_id: Uuid) -> Result<Video> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE videos
            SET is_published = NOT is_published, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            &[&video_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_video(&row)
}

pub async fn delete_video(pool: &Pool, video_id: Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            r#"
            DELETE FROM videos
            WHERE id = $1
            "#,
            &[&video_id],
        )
        .await?;
    Ok(deleted == 1)
}
