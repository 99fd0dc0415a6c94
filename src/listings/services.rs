use tracing::{info, warn};
use uuid::Uuid;

use super::dto::ListingDraft;
use super::images::remove_images;
use super::repo_types::{Listing, NewListing};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const MAX_IMAGES: usize = 5;

/// Checks text fields and image count before anything is uploaded.
pub fn validate_draft(draft: &ListingDraft, image_count: usize) -> AppResult<()> {
    let blank = [
        &draft.title,
        &draft.description,
        &draft.location,
        &draft.contact,
    ]
    .iter()
    .any(|f| f.trim().is_empty());
    if blank || image_count == 0 {
        return Err(AppError::invalid_input(
            "All fields are required, including images",
        ));
    }
    if image_count > MAX_IMAGES {
        return Err(AppError::invalid_input(format!(
            "At most {} images are allowed",
            MAX_IMAGES
        )));
    }
    Ok(())
}

pub fn parse_listing_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::invalid_input("Invalid post ID format"))
}

/// Persists a listing whose images are already hosted, then records it on the
/// owner. The owner update is best-effort and never undoes the listing.
pub async fn create_listing(
    st: &AppState,
    owner_id: Uuid,
    draft: ListingDraft,
    images: Vec<String>,
) -> AppResult<Listing> {
    validate_draft(&draft, images.len())?;

    let listing = st
        .listings
        .insert(NewListing {
            title: draft.title,
            description: draft.description,
            location: draft.location,
            contact: draft.contact,
            images,
            owner_id,
        })
        .await?;

    if let Err(e) = st.users.push_listing(owner_id, listing.id).await {
        warn!(error = %e, %owner_id, listing_id = %listing.id, "failed to record listing on owner");
    }

    info!(listing_id = %listing.id, %owner_id, images = listing.images.len(), "listing created");
    Ok(listing)
}

pub async fn list_listings(st: &AppState, location: Option<&str>) -> AppResult<Vec<Listing>> {
    Ok(st.listings.list(location).await?)
}

pub async fn list_owned(st: &AppState, owner_id: Uuid) -> AppResult<Vec<Listing>> {
    Ok(st.listings.list_by_owner(owner_id).await?)
}

pub async fn get_listing(st: &AppState, raw_id: &str) -> AppResult<Listing> {
    let id = parse_listing_id(raw_id)?;
    st.listings
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))
}

/// Removes every hosted image (failures logged and skipped), then the record.
/// Any authenticated caller may delete; `caller_id` is only logged.
pub async fn delete_listing(st: &AppState, raw_id: &str, caller_id: Uuid) -> AppResult<()> {
    let Ok(id) = Uuid::parse_str(raw_id) else {
        return Err(AppError::not_found("Post not found"));
    };
    let listing = st
        .listings
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    if listing.owner_id != caller_id {
        warn!(listing_id = %id, owner_id = %listing.owner_id, %caller_id, "listing deleted by non-owner");
    }

    let failed = remove_images(st, &listing.images).await;
    if failed > 0 {
        warn!(listing_id = %id, failed, "some images could not be deleted");
    }

    if !st.listings.delete(id).await? {
        return Err(AppError::not_found("Post not found"));
    }
    info!(listing_id = %id, %caller_id, "listing deleted");
    Ok(())
}
