use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub url: String,
    pub repository: String,
    pub downloads: i64,
    pub favers: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Package {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
