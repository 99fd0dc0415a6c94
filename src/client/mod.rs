//! HTTP client for the listings API plus the session and listing state a UI keeps.

pub mod api;
pub mod state;

pub use api::{ApiClient, ClientError, Credentials, ImageFile};
pub use state::{CurrentUser, ListingsState, Page, UserState, DEFAULT_PAGE_SIZE, SESSION_EXPIRED};
