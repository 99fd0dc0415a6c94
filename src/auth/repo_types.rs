use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub name: String,               // display name
    pub email: String,              // unique, stored as given
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    pub is_admin: bool,             // admin gate flag
    pub listing_ids: Vec<Uuid>,     // owned listings, appended on create
    pub created_at: OffsetDateTime, // creation timestamp
    pub updated_at: OffsetDateTime, // last mutation
}

/// Fields needed to insert a user; id and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}
