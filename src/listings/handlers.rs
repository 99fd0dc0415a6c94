use axum::{
    extract::{
        multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{ListingDraft, ListingQuery},
    images::{remove_images, upload_images, UploadItem},
    repo_types::Listing,
    services::{self, validate_draft, MAX_IMAGES},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult, MessageBody},
    state::AppState,
};

/// Whole-request cap for the multipart create form.
const BODY_LIMIT: usize = 20 * 1024 * 1024;

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_listings).post(create_listing))
        .route("/posts/user", get(list_my_listings))
        .route("/posts/:id", get(get_listing).delete(delete_listing))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

#[instrument(skip(state))]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(q): Query<ListingQuery>,
) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(services::list_listings(&state, q.location()).await?))
}

#[instrument(skip(state))]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Listing>> {
    Ok(Json(services::get_listing(&state, &id).await?))
}

#[instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn list_my_listings(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(services::list_owned(&state, caller.0.id).await?))
}

#[instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn delete_listing(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageBody>> {
    services::delete_listing(&state, &id, caller.0.id).await?;
    Ok(Json(MessageBody::new("Post deleted successfully")))
}

/// Fields: `title`, `description`, `location`, `whatsapp`, and up to five `images` files.
async fn read_form(mp: &mut Multipart) -> AppResult<(ListingDraft, Vec<UploadItem>)> {
    let mut draft = ListingDraft::default();
    let mut files = Vec::new();

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::invalid_input(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" | "images[]" => {
                if files.len() == MAX_IMAGES {
                    return Err(AppError::invalid_input(format!(
                        "At most {} images are allowed",
                        MAX_IMAGES
                    )));
                }
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::invalid_input(e.body_text()))?;
                if !body.is_empty() {
                    files.push(UploadItem { body, content_type });
                }
            }
            "title" | "description" | "location" | "whatsapp" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::invalid_input(e.body_text()))?;
                let slot = match name.as_str() {
                    "title" => &mut draft.title,
                    "description" => &mut draft.description,
                    "location" => &mut draft.location,
                    _ => &mut draft.contact,
                };
                *slot = value;
            }
            _ => {}
        }
    }
    Ok((draft, files))
}

/// POST /posts (multipart). Images are hosted first; if the listing cannot be
/// stored they are removed again.
#[instrument(skip(state, caller, mp), fields(user_id = %caller.0.id))]
pub async fn create_listing(
    State(state): State<AppState>,
    caller: AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, HeaderMap, Json<Listing>)> {
    let mut mp = mp.map_err(|e| AppError::invalid_input(e.body_text()))?;
    let (draft, files) = read_form(&mut mp).await?;
    validate_draft(&draft, files.len())?;

    let urls = upload_images(&state, files).await?;
    let listing = match services::create_listing(&state, caller.0.id, draft, urls.clone()).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!(error = %e, "listing not stored; removing uploaded images");
            remove_images(&state, &urls).await;
            return Err(e);
        }
    };

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/posts/{}", listing.id)) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(listing)))
}
