use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::user::User,
    services::tokens::SessionStore,
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        username: row.try_get("username").map_err(|_| AppError::MissingData("username".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        full_name: row.try_get("full_name").map_err(|_| AppError::MissingData("full_name".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        avatar: row.try_get("avatar").map_err(|_| AppError::MissingData("avatar".to_string()))?,
        cover_image: row.try_get("cover_image").map_err(|_| AppError::MissingData("cover_image".to_string()))?,
        session_token: row.try_get("session_token").map_err(|_| AppError::MissingData("session_token".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// Creates a new user in the database.
pub async fn create_user(
    pool: &Pool,
    id: Uuid,
    username: &str,
    email: &str,
    full_name: &str,
    password_hash: &str,
    avatar: &str,
    cover_image: Option<&str>,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (id, username, email, full_name, password, avatar, cover_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
            &[&id, &username, &email, &full_name, &password_hash, &avatar, &cover_image],
        )
        .await?;
    row_to_user(&row)
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: &Uuid) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user whose username or email matches the given login identifier.
pub async fn find_by_login(pool: &Pool, identifier: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE username = $1 OR email = $1
            "#,
            &[&identifier],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Checks whether a username or email is already taken.
pub async fn exists_by_username_or_email(
    pool: &Pool,
    username: &str,
    email: &str,
) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT 1 AS present
            FROM users
            WHERE username = $1 OR email = $2
            "#,
            &[&username, &email],
        )
        .await?;
    Ok(row.is_some())
}

/// Updates a user's full name and email.
pub async fn update_details(
    pool: &Pool,
    user_id: &Uuid,
    full_name: &str,
    email: &str,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE users
            SET full_name = $1, email = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
            &[&full_name, &email, user_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_user(&row)
}

/// Commits a new avatar reference.
pub async fn set_avatar(pool: &Pool, user_id: &Uuid, avatar_url: &str) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE users
            SET avatar = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
            &[&avatar_url, user_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_user(&row)
}

/// Commits a new cover image reference.
pub async fn set_cover_image(pool: &Pool, user_id: &Uuid, cover_url: &str) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE users
            SET cover_image = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
            &[&cover_url, user_id],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_user(&row)
}

/// Updates a user's password hash.
pub async fn update_password(pool: &Pool, user_id: &Uuid, new_password_hash: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            r#"
            UPDATE users
            SET password = $1, updated_at = NOW()
            WHERE id = $2
            "#,
            &[&new_password_hash, user_id],
        )
        .await?;
    Ok(())
}

/// The users table is the session store: exactly one live session token
/// per identity, on the identity's own row.
#[async_trait]
impl SessionStore for Pool {
    async fn session_token(&self, user_id: Uuid) -> Result<Option<String>> {
        let client = self.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT session_token
                FROM users
                WHERE id = $1
                "#,
                &[&user_id],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        row.try_get("session_token")
            .map_err(|_| AppError::MissingData("session_token".to_string()))
    }

    async fn store_session_token(&self, user_id: Uuid, token: &str) -> Result<bool> {
        let client = self.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE users
                SET session_token = $1, updated_at = NOW()
                WHERE id = $2
                "#,
                &[&token, &user_id],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn swap_session_token(&self, user_id: Uuid, current: &str, next: &str) -> Result<bool> {
        // Compare-and-swap: the WHERE clause loses the rotation race
        // instead of silently overwriting a concurrent refresh.
        let client = self.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE users
                SET session_token = $1, updated_at = NOW()
                WHERE id = $2 AND session_token = $3
                "#,
                &[&next, &user_id, &current],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn clear_session_token(&self, user_id: Uuid) -> Result<()> {
        let client = self.get().await?;
        client
            .execute(
                r#"
                UPDATE users
                SET session_token = NULL, updated_at = NOW()
                WHERE id = $1
                "#,
                &[&user_id],
            )
            .await?;
        Ok(())
    }
}
