use serde::Serialize;
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Represents a user in the system.
///
/// Deliberately not `Serialize`: the password hash and the persisted
/// session token must never reach a response body. Use [`User::public`].
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's username (stored lowercased, unique).
    pub username: String,
    /// The user's email address (unique).
    pub email: String,
    /// The user's full name.
    pub full_name: String,
    /// The user's hashed password.
    pub password: String,
    /// Avatar asset URL at the storage provider.
    pub avatar: String,
    /// Optional cover image asset URL.
    pub cover_image: Option<String>,
    /// The currently valid session token, if a session is active.
    pub session_token: Option<String>,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The public projection of a user, safe for response bodies.
#[derive(Clone, Debug, Serialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns the public projection of this user.
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            created_at: self.created_at,
        }
    }
}
