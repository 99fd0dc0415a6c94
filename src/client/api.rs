use reqwest::{
    multipart::{Form, Part},
    RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::dto::{AuthResponse, LoginRequest, Profile, RegisterRequest},
    error::MessageBody,
    listings::{dto::ListingDraft, repo_types::Listing},
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status and a `{message}` body.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// Server-provided message, if there is one.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Token a caller attaches to each protected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// An image file for the create form.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Typed client for the REST API. Holds no credentials of its own.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `https://host/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await?;
        Ok(Self::check(resp).await?.json::<T>().await?)
    }

    async fn check(resp: Response) -> Result<Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<MessageBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();
        Err(ClientError::Api { status, message })
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        Self::send(self.http.post(self.url("/users/register")).json(req)).await
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ClientError> {
        Self::send(self.http.post(self.url("/users/login")).json(req)).await
    }

    pub async fn logout(&self) -> Result<MessageBody, ClientError> {
        Self::send(self.http.post(self.url("/users/logout"))).await
    }

    pub async fn profile(&self, creds: &Credentials) -> Result<Profile, ClientError> {
        Self::send(
            self.http
                .get(self.url("/users/profile"))
                .bearer_auth(creds.token()),
        )
        .await
    }

    pub async fn listings(&self, location: Option<&str>) -> Result<Vec<Listing>, ClientError> {
        let mut req = self.http.get(self.url("/posts"));
        if let Some(location) = location {
            req = req.query(&[("location", location)]);
        }
        Self::send(req).await
    }

    pub async fn listing(&self, id: Uuid) -> Result<Listing, ClientError> {
        Self::send(self.http.get(self.url(&format!("/posts/{}", id)))).await
    }

    pub async fn my_listings(&self, creds: &Credentials) -> Result<Vec<Listing>, ClientError> {
        Self::send(
            self.http
                .get(self.url("/posts/user"))
                .bearer_auth(creds.token()),
        )
        .await
    }

    pub async fn create_listing(
        &self,
        creds: &Credentials,
        draft: &ListingDraft,
        images: Vec<ImageFile>,
    ) -> Result<Listing, ClientError> {
        let mut form = Form::new()
            .text("title", draft.title.clone())
            .text("description", draft.description.clone())
            .text("location", draft.location.clone())
            .text("whatsapp", draft.contact.clone());
        for img in images {
            let part = Part::bytes(img.bytes)
                .file_name(img.file_name)
                .mime_str(&img.content_type)?;
            form = form.part("images", part);
        }
        Self::send(
            self.http
                .post(self.url("/posts"))
                .bearer_auth(creds.token())
                .multipart(form),
        )
        .await
    }

    pub async fn delete_listing(
        &self,
        creds: &Credentials,
        id: Uuid,
    ) -> Result<MessageBody, ClientError> {
        Self::send(
            self.http
                .delete(self.url(&format!("/posts/{}", id)))
                .bearer_auth(creds.token()),
        )
        .await
    }
}
