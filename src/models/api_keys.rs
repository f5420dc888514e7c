use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoicing-platform credentials belonging to one owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OwnerApiKeys {
    pub owner_id: Uuid,
    #[serde(skip_serializing)]
    pub hostkit_api_key: String,
    #[serde(skip_serializing)]
    pub hostkit_api_secret: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnerApiKeys {
    pub fn new(owner_id: Uuid, hostkit_api_key: String, hostkit_api_secret: String) -> Self {
        let now = Utc::now();
        Self {
            owner_id,
            hostkit_api_key,
            hostkit_api_secret,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
