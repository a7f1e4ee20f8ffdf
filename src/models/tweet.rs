use serde::Serialize;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::services::ownership::Owned;

#[derive(Debug, Clone, Serialize)]
pub struct Tweet {
    pub id: Uuid,
    pub owner: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Tweet {
    fn owner_id(&self) -> Uuid {
        self.owner
    }
}
