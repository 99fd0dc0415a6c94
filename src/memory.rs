//! In-process user and listing stores, used by tests and `AppState::fake()`.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{CreateUserError, UserRepo},
        repo_types::{NewUser, User},
    },
    listings::{
        repo::ListingRepo,
        repo_types::{Listing, NewListing},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    listings: Vec<Listing>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a user's admin flag. Returns false if the user does not exist.
    pub async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.is_admin = is_admin;
                true
            }
            None => false,
        }
    }

    /// Drops a user record, leaving their listings in place.
    pub async fn remove_user(&self, user_id: Uuid) -> bool {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != user_id);
        tables.users.len() != before
    }
}

/// Newest first; later insertions win ties.
fn newest_first<'a>(rows: impl DoubleEndedIterator<Item = &'a Listing>) -> Vec<Listing> {
    let mut out: Vec<Listing> = rows.rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(CreateUserError::EmailTaken);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            is_admin: false,
            listing_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn push_listing(&self, user_id: Uuid, listing_id: Uuid) -> anyhow::Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.listing_ids.push(listing_id);
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[async_trait]
impl ListingRepo for MemoryStore {
    async fn insert(&self, new: NewListing) -> anyhow::Result<Listing> {
        let mut tables = self.tables.write().await;
        anyhow::ensure!(
            tables.users.iter().any(|u| u.id == new.owner_id),
            "owner {} does not exist",
            new.owner_id
        );
        let now = OffsetDateTime::now_utc();
        let listing = Listing {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            images: new.images,
            location: new.location,
            contact: new.contact,
            is_approved: false,
            owner_id: new.owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.listings.push(listing.clone());
        Ok(listing)
    }

    async fn list(&self, location: Option<&str>) -> anyhow::Result<Vec<Listing>> {
        let tables = self.tables.read().await;
        Ok(match location {
            Some(loc) => newest_first(tables.listings.iter().filter(|l| l.location == loc)),
            None => newest_first(tables.listings.iter()),
        })
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Listing>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.listings.iter().filter(|l| l.owner_id == owner_id),
        ))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Listing>> {
        let tables = self.tables.read().await;
        Ok(tables.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.listings.len();
        tables.listings.retain(|l| l.id != id);
        Ok(tables.listings.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "n".into(),
            email: email.into(),
            password_hash: "h".into(),
        }
    }

    fn new_listing(owner_id: Uuid, title: &str, location: &str) -> NewListing {
        NewListing {
            title: title.into(),
            description: "d".into(),
            location: location.into(),
            contact: "+222 0000".into(),
            images: vec!["https://images.local/posts/a.jpg".into()],
            owner_id,
        }
    }

    #[tokio::test]
    async fn email_is_unique_and_case_sensitive() {
        let store = MemoryStore::new();
        store.create(new_user("a@x.com")).await.unwrap();
        assert!(matches!(
            store.create(new_user("a@x.com")).await,
            Err(CreateUserError::EmailTaken)
        ));
        store.create(new_user("A@x.com")).await.unwrap();
        assert!(store.find_by_email("A@X.COM").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_requires_existing_owner() {
        let store = MemoryStore::new();
        assert!(store
            .insert(new_listing(Uuid::new_v4(), "t", "Riyadh"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn list_orders_newest_first_and_filters_exactly() {
        let store = MemoryStore::new();
        let owner = store.create(new_user("a@x.com")).await.unwrap();
        store.insert(new_listing(owner.id, "first", "Riyadh")).await.unwrap();
        store.insert(new_listing(owner.id, "second", "Ksar")).await.unwrap();
        store.insert(new_listing(owner.id, "third", "Riyadh")).await.unwrap();

        let all: Vec<String> = store.list(None).await.unwrap().into_iter().map(|l| l.title).collect();
        assert_eq!(all, ["third", "second", "first"]);

        let riyadh: Vec<String> = store
            .list(Some("Riyadh"))
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(riyadh, ["third", "first"]);
        assert!(store.list(Some("riyadh")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_listing_appends_to_owner() {
        let store = MemoryStore::new();
        let owner = store.create(new_user("a@x.com")).await.unwrap();
        let listing = store.insert(new_listing(owner.id, "t", "Riyadh")).await.unwrap();
        store.push_listing(owner.id, listing.id).await.unwrap();

        let owner = UserRepo::find_by_id(&store, owner.id).await.unwrap().unwrap();
        assert_eq!(owner.listing_ids, vec![listing.id]);
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let store = MemoryStore::new();
        let owner = store.create(new_user("a@x.com")).await.unwrap();
        let listing = store.insert(new_listing(owner.id, "t", "Riyadh")).await.unwrap();
        assert!(store.delete(listing.id).await.unwrap());
        assert!(!store.delete(listing.id).await.unwrap());
        assert!(ListingRepo::find_by_id(&store, listing.id).await.unwrap().is_none());
    }
}
