use anyhow::Context;
use bytes::Bytes;
use futures::future::join_all;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::storage::key_from_url;

/// Folder every listing image is stored under on the image host.
pub const IMAGE_FOLDER: &str = "posts";

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn object_key(content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("{}/{}-{}.{}", IMAGE_FOLDER, millis, Uuid::new_v4(), ext)
}

/// Uploads in order and returns the hosted URLs in the same order.
/// On failure the images already uploaded by this call are removed again.
pub async fn upload_images(st: &AppState, images: Vec<UploadItem>) -> anyhow::Result<Vec<String>> {
    let mut urls = Vec::with_capacity(images.len());
    for img in images {
        let key = object_key(&img.content_type);
        match st
            .storage
            .put_object(&key, img.body, &img.content_type)
            .await
            .with_context(|| format!("put_object {}", key))
        {
            Ok(url) => urls.push(url),
            Err(e) => {
                remove_images(st, &urls).await;
                return Err(e);
            }
        }
    }
    Ok(urls)
}

/// Deletes every image concurrently. Failures are logged and skipped;
/// returns how many could not be deleted.
pub async fn remove_images(st: &AppState, urls: &[String]) -> usize {
    let deletions = urls.iter().map(|url| async move {
        let Some(key) = key_from_url(url) else {
            warn!(%url, "cannot derive image key from url");
            return false;
        };
        match st.storage.delete_object(&key).await {
            Ok(()) => {
                debug!(%key, "image deleted");
                true
            }
            Err(e) => {
                warn!(%url, error = %e, "failed to delete image");
                false
            }
        }
    });
    join_all(deletions).await.into_iter().filter(|ok| !ok).count()
}
