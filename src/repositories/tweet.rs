use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::tweet::Tweet,
};

fn row_to_tweet(row: &Row) -> Result<Tweet> {
    Ok(Tweet {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        owner: row.try_get("owner").map_err(|_| AppError::MissingData("owner".to_string()))?,
        content: row.try_get("content").map_err(|_| AppError::MissingData("content".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

pub async fn create_tweet(pool: &Pool, id: Uuid, owner: &Uuid, content: &str) -> Result<Tweet> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO tweets (id, owner, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
            &[&id, owner, &content],
        )
        .await?;
    row_to_tweet(&row)
}

pub async fn find_by_id(pool: &Pool, tweet_id: Uuid) -> Result<Option<Tweet>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM tweets
            WHERE id = $1
            "#,
            &[&tweet_id],
        )
        .await?;
    row.map(|r| row_to_tweet(&r)).transpose()
}

pub async fn list_for_user(pool: &Pool, owner: Uuid, limit: i64, offset: i64) -> Result<Vec<Tweet>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM tweets
            WHERE owner = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            &[&owner, &limit, &offset],
        )
        .await?;
    rows.iter().map(row_to_tweet).collect()
}

pub async fn update_content(pool: &Pool, tweet_id: Uuid, content: &str) -> Result<Tweet> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE tweets
            SET content = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
            &[&content, &tweet_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_tweet(&row)
}

pub async fn delete_tweet(pool: &Pool, tweet_id: Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            r#"
            DELETE FROM tweets
            WHERE id = $1
            "#,
            &[&tweet_id],
        )
        .await?;
    Ok(deleted == 1)
}
