use serde::Serialize;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::services::ownership::Owned;

#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub id: Uuid,
    pub owner: Uuid,
    /// Unique per owner.
    pub name: String,
    pub description: String,
    /// Member video ids in insertion order.
    pub videos: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Playlist {
    fn owner_id(&self) -> Uuid {
        self.owner
    }
}
