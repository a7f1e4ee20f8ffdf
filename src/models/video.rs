use serde::Serialize;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::services::ownership::Owned;

#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub description: String,
    /// Media asset URL at the storage provider.
    pub video_file: String,
    /// Thumbnail asset URL at the storage provider.
    pub thumbnail: String,
    /// Duration in seconds, as reported at publish time.
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Video {
    fn owner_id(&self) -> Uuid {
        self.owner
    }
}
