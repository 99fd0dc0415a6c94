//! Application-state objects for a UI built on [`ApiClient`].
//!
//! The UI owns one `UserState` and one `ListingsState` and passes them (and the
//! client) into whatever needs them. Credentials travel with each call.

use uuid::Uuid;

use super::api::{ApiClient, ClientError, Credentials, ImageFile};
use crate::{
    auth::dto::{LoginRequest, Profile, RegisterRequest},
    listings::{dto::ListingDraft, repo_types::Listing},
};

pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// Listings shown per page in the browse view.
pub const DEFAULT_PAGE_SIZE: usize = 6;

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub credentials: Credentials,
}

impl CurrentUser {
    fn from_profile(profile: Profile, credentials: Credentials) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            credentials,
        }
    }
}

fn message_or(err: &ClientError, fallback: &str) -> String {
    err.api_message().unwrap_or(fallback).to_string()
}

#[derive(Debug, Default)]
pub struct UserState {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
}

impl UserState {
    pub fn credentials(&self) -> Option<&Credentials> {
        self.user.as_ref().map(|u| &u.credentials)
    }

    /// Registers, then loads the profile with the freshly issued token.
    pub async fn register(&mut self, api: &ApiClient, req: &RegisterRequest) -> Result<(), ClientError> {
        let result = async {
            let auth = api.register(req).await?;
            let credentials = Credentials::new(auth.token);
            let profile = api.profile(&credentials).await?;
            Ok::<_, ClientError>(CurrentUser::from_profile(profile, credentials))
        }
        .await;
        self.settle(result, "Registration failed")
    }

    pub async fn login(&mut self, api: &ApiClient, req: &LoginRequest) -> Result<(), ClientError> {
        let result = api.login(req).await.map(|auth| CurrentUser {
            id: auth.id,
            name: auth.name,
            email: auth.email,
            credentials: Credentials::new(auth.token),
        });
        self.settle(result, "Invalid credentials")
    }

    pub async fn logout(&mut self, api: &ApiClient) -> Result<(), ClientError> {
        match api.logout().await {
            Ok(_) => {
                self.user = None;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(message_or(&e, "Logout failed"));
                Err(e)
            }
        }
    }

    /// Revalidates a previously stored token.
    pub async fn restore(&mut self, api: &ApiClient, token: impl Into<String>) -> Result<(), ClientError> {
        let credentials = Credentials::new(token);
        match api.profile(&credentials).await {
            Ok(profile) => {
                self.user = Some(CurrentUser::from_profile(profile, credentials));
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.user = None;
                self.error = Some(SESSION_EXPIRED.to_string());
                Err(e)
            }
        }
    }

    fn settle(&mut self, result: Result<CurrentUser, ClientError>, fallback: &str) -> Result<(), ClientError> {
        match result {
            Ok(user) => {
                self.user = Some(user);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(message_or(&e, fallback));
                Err(e)
            }
        }
    }
}

/// One page of the cached listings.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a> {
    pub items: &'a [Listing],
    pub page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Default)]
pub struct ListingsState {
    pub listings: Vec<Listing>,
    pub error: Option<String>,
    pub loading: bool,
}

impl ListingsState {
    pub async fn fetch(&mut self, api: &ApiClient, location: Option<&str>) -> Result<(), ClientError> {
        self.loading = true;
        self.error = None;
        let result = api.listings(location).await;
        self.loading = false;
        match result {
            Ok(listings) => {
                self.listings = listings;
                Ok(())
            }
            Err(e) => {
                self.error = Some(message_or(&e, "Error fetching posts"));
                Err(e)
            }
        }
    }

    pub async fn fetch_mine(&mut self, api: &ApiClient, creds: &Credentials) -> Result<(), ClientError> {
        self.loading = true;
        self.error = None;
        let result = api.my_listings(creds).await;
        self.loading = false;
        match result {
            Ok(listings) => {
                self.listings = listings;
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Error fetching user posts")),
        }
    }

    /// Prepends the created listing on success.
    pub async fn create(
        &mut self,
        api: &ApiClient,
        creds: &Credentials,
        draft: &ListingDraft,
        images: Vec<ImageFile>,
    ) -> Result<(), ClientError> {
        self.error = None;
        match api.create_listing(creds, draft, images).await {
            Ok(listing) => {
                self.listings.insert(0, listing);
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Error creating post")),
        }
    }

    pub async fn delete(&mut self, api: &ApiClient, creds: &Credentials, id: Uuid) -> Result<(), ClientError> {
        self.error = None;
        match api.delete_listing(creds, id).await {
            Ok(_) => {
                self.listings.retain(|l| l.id != id);
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Error deleting post. Please try again.")),
        }
    }

    /// 1-based page of `per_page` listings; out-of-range pages are empty.
    pub fn page(&self, page: usize, per_page: usize) -> Page<'_> {
        let per_page = per_page.max(1);
        let total_pages = self.listings.len().div_ceil(per_page);
        let start = page.saturating_sub(1).saturating_mul(per_page).min(self.listings.len());
        let end = start.saturating_add(per_page).min(self.listings.len());
        Page {
            items: &self.listings[start..end],
            page,
            total_pages,
        }
    }

    fn fail(&mut self, err: ClientError, fallback: &str) -> ClientError {
        if err.is_unauthorized() {
            self.listings.clear();
            self.error = Some(SESSION_EXPIRED.to_string());
        } else {
            self.error = Some(message_or(&err, fallback));
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn listing(n: usize) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            title: format!("listing {n}"),
            description: "d".into(),
            images: vec!["https://images.local/posts/a.jpg".into()],
            location: "Ksar".into(),
            contact: "1".into(),
            is_approved: false,
            owner_id: Uuid::new_v4(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn paging_slices_cached_listings() {
        let state = ListingsState {
            listings: (0..14).map(listing).collect(),
            ..Default::default()
        };

        let first = state.page(1, DEFAULT_PAGE_SIZE);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.items.len(), 6);
        assert_eq!(first.items[0].title, "listing 0");

        let last = state.page(3, DEFAULT_PAGE_SIZE);
        assert_eq!(last.items.len(), 2);
        assert_eq!(last.items[1].title, "listing 13");

        assert!(state.page(4, DEFAULT_PAGE_SIZE).items.is_empty());
        assert!(state.page(0, DEFAULT_PAGE_SIZE).items.len() == 6);
    }

    #[test]
    fn paging_with_huge_page_size() {
        let state = ListingsState {
            listings: vec![listing(1)],
            ..Default::default()
        };
        assert_eq!(state.page(1, usize::MAX).items.len(), 1);
        assert!(state.page(2, usize::MAX).items.is_empty());
        assert_eq!(state.page(2, usize::MAX).total_pages, 1);
    }

    #[test]
    fn paging_empty() {
        let state = ListingsState::default();
        let page = state.page(1, DEFAULT_PAGE_SIZE);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn unauthorized_clears_listings() {
        let mut state = ListingsState {
            listings: vec![listing(1)],
            ..Default::default()
        };
        let err = state.fail(
            ClientError::Api {
                status: reqwest::StatusCode::UNAUTHORIZED,
                message: "Not authorized, token failed".into(),
            },
            "fallback",
        );
        assert!(err.is_unauthorized());
        assert!(state.listings.is_empty());
        assert_eq!(state.error.as_deref(), Some(SESSION_EXPIRED));
    }

    #[test]
    fn other_errors_keep_listings() {
        let mut state = ListingsState {
            listings: vec![listing(1)],
            ..Default::default()
        };
        state.fail(
            ClientError::Api {
                status: reqwest::StatusCode::NOT_FOUND,
                message: String::new(),
            },
            "Error deleting post. Please try again.",
        );
        assert_eq!(state.listings.len(), 1);
        assert_eq!(state.error.as_deref(), Some("Error deleting post. Please try again."));
    }
}
