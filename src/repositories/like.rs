use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::{
    error::Result,
    models::like::LikeTarget,
};

/// Toggles a like. Returns true when the like now exists.
///
/// Target columns are static identifiers from `LikeTarget::column`,
/// never user input.
pub async fn toggle(pool: &Pool, user_id: &Uuid, target: LikeTarget) -> Result<bool> {
    let client = pool.get().await?;
    let column = target.column();
    let target_id = target.id();

    let delete_sql = format!("DELETE FROM likes WHERE user_id = $1 AND {} = $2", column);
    let removed = client
        .execute(delete_sql.as_str(), &[user_id, &target_id])
        .await?;

    if removed > 0 {
        return Ok(false);
    }

    let insert_sql = format!(
        "INSERT INTO likes (id, user_id, {}) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        column
    );
    client
        .execute(insert_sql.as_str(), &[&Uuid::new_v4(), user_id, &target_id])
        .await?;

    Ok(true)
}
