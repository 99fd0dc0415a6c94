use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Listing record in the database; also the JSON shape served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub images: Vec<String>, // hosted image URLs, upload order
    pub location: String,
    #[serde(rename = "whatsapp")]
    pub contact: String,
    pub is_approved: bool, // stored, never enforced
    #[serde(rename = "user")]
    pub owner_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated input for a new listing. Images are already hosted.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub location: String,
    pub contact: String,
    pub images: Vec<String>,
    pub owner_id: Uuid,
}
