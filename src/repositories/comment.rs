use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::comment::Comment,
};

fn row_to_comment(row: &Row) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        owner: row.try_get("owner").map_err(|_| AppError::MissingData("owner".to_string()))?,
        video_id: row.try_get("video_id").map_err(|_| AppError::MissingData("video_id".to_string()))?,
        content: row.try_get("content").map_err(|_| AppError::MissingData("content".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

pub async fn create_comment(
    pool: &Pool,
    id: Uuid,
    owner: &Uuid,
    video_id: Uuid,
    content: &str,
) -> Result<Comment> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO comments (id, owner, video_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
            &[&id, owner, &video_id, &content],
        )
        .await?;
    row_to_comment(&row)
}

pub async fn find_by_id(pool: &Pool, comment_id: Uuid) -> Result<Option<Comment>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM comments
            WHERE id = $1
            "#,
            &[&comment_id],
        )
        .await?;
    row.map(|r| row_to_comment(&r)).transpose()
}

pub async fn list_for_video(
    pool: &Pool,
    video_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Comment>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM comments
            WHERE video_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            &[&video_id, &limit, &offset],
        )
        .await?;
    rows.iter().map(row_to_comment).collect()
}

pub async fn update_content(pool: &Pool, comment_id: Uuid, content: &str) -> Result<Comment> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE comments
            SET content = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
            &[&content, &comment_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_comment(&row)
}

pub async fn delete_comment(pool: &Pool, comment_id: Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            r#"
            DELETE FROM comments
            WHERE id = $1
            "#,
            &[&comment_id],
        )
        .await?;
    Ok(deleted == 1)
}
