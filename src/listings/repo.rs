use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::listings::repo_types::{Listing, NewListing};

/// Listing store. All list queries return newest-created first.
#[async_trait]
pub trait ListingRepo: Send + Sync {
    async fn insert(&self, new: NewListing) -> anyhow::Result<Listing>;

    /// All listings, or only those whose location equals `location` exactly.
    async fn list(&self, location: Option<&str>) -> anyhow::Result<Vec<Listing>>;

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Listing>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Listing>>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgListingRepo {
    db: PgPool,
}

impl PgListingRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const LISTING_COLUMNS: &str = "id, title, description, images, location, contact, \
     is_approved, owner_id, created_at, updated_at";

#[async_trait]
impl ListingRepo for PgListingRepo {
    async fn insert(&self, new: NewListing) -> anyhow::Result<Listing> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            r#"
            INSERT INTO listings (id, title, description, images, location, contact, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.images)
        .bind(&new.location)
        .bind(&new.contact)
        .bind(new.owner_id)
        .fetch_one(&self.db)
        .await?;
        Ok(listing)
    }

    async fn list(&self, location: Option<&str>) -> anyhow::Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, Listing>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
              FROM listings
             WHERE $1::text IS NULL OR location = $1
             ORDER BY created_at DESC
            "#
        ))
        .bind(location)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Listing>> {
        let rows = sqlx::query_as::<_, Listing>(&format!(
            r#"
            SELECT {LISTING_COLUMNS}
              FROM listings
             WHERE owner_id = $1
             ORDER BY created_at DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Listing>> {
        let row = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
