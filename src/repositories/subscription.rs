use deadpool_postgres::Pool;
use uuid::Uuid;
use crate::error::Result;

/// Toggles a subscription. Returns true when the subscription now exists.
pub async fn toggle(pool: &Pool, subscriber: &Uuid, channel: &Uuid) -> Result<bool> {
    let client = pool.get().await?;

    let removed = client
        .execute(
            r#"
            DELETE FROM subscriptions
            WHERE subscriber = $1 AND channel = $2
            "#,
            &[subscriber, channel],
        )
        .await?;

    if removed > 0 {
        return Ok(false);
    }

    client
        .execute(
            r#"
            INSERT INTO subscriptions (id, subscriber, channel)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
            &[&Uuid::new_v4(), subscriber, channel],
        )
        .await?;

    Ok(true)
}
