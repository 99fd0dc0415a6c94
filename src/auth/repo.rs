use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Credential store.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Find a user by email (exact match).
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Create a new user with hashed password.
    async fn create(&self, new: NewUser) -> Result<User, CreateUserError>;

    /// Append a listing id to the user's owned-listing list.
    async fn push_listing(&self, user_id: Uuid, listing_id: Uuid) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, is_admin, listing_ids, created_at, updated_at";

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CreateUserError::EmailTaken)
            }
            Err(e) => Err(CreateUserError::Store(e.into())),
        }
    }

    async fn push_listing(&self, user_id: Uuid, listing_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET listing_ids = array_append(listing_ids, $2),
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(listing_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
