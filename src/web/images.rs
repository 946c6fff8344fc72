//! Serving stored images, with conditional request support.

use std::io::ErrorKind;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use axum::http::response::Builder;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use httpdate::{fmt_http_date, parse_http_date};

use super::AppState;
use crate::constants::IMAGE_CACHE_CONTROL;
use crate::error::ImagegenError;
use crate::store::is_valid_filename;

/// Cache headers derived from image metadata.
#[derive(Clone, Debug)]
pub(crate) struct ImageCacheHeaders {
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
    modified_at: Option<SystemTime>,
}

impl ImageCacheHeaders {
    /// Builds cache headers from filesystem metadata.
    pub(crate) fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified_at = metadata.modified().ok();
        let etag = build_etag(metadata.len(), modified_at);
        let last_modified =
            modified_at.and_then(|modified| HeaderValue::from_str(&fmt_http_date(modified)).ok());
        Self {
            etag,
            last_modified,
            modified_at,
        }
    }
}

/// Applies image cache headers to a response builder.
fn apply_cache_headers(mut builder: Builder, cache: &ImageCacheHeaders) -> Builder {
    builder = builder.header(CACHE_CONTROL, IMAGE_CACHE_CONTROL.as_str());
    if let Some(etag) = &cache.etag {
        builder = builder.header(ETAG, etag.clone());
    }
    if let Some(last_modified) = &cache.last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified.clone());
    }
    builder
}

/// Returns true when the request matches a not-modified response.
fn is_not_modified(headers: &HeaderMap, cache: &ImageCacheHeaders) -> bool {
    if let Some(if_none_match) = headers.get(IF_NONE_MATCH) {
        if let Ok(value) = if_none_match.to_str() {
            let value = value.trim();
            if value == "*" {
                return true;
            }
            if let Some(etag) = cache.etag.as_ref().and_then(|value| value.to_str().ok())
                && value.split(',').any(|candidate| candidate.trim() == etag)
            {
                return true;
            }
        }
        return false;
    }

    if let (Some(if_modified_since), Some(modified_at)) =
        (headers.get(IF_MODIFIED_SINCE), cache.modified_at)
        && let Ok(value) = if_modified_since.to_str()
        && let Ok(since) = parse_http_date(value)
        && whole_seconds(modified_at) <= since
    {
        return true;
    }

    false
}

/// HTTP dates carry no sub-second part.
fn whole_seconds(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| UNIX_EPOCH + Duration::from_secs(duration.as_secs()))
        .unwrap_or(time)
}

fn build_etag(size: u64, modified_at: Option<SystemTime>) -> Option<HeaderValue> {
    let suffix = match modified_at {
        Some(modified) => modified
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_micros().to_string())
            .unwrap_or_else(|_| "0".to_string()),
        None => "0".to_string(),
    };
    let value = format!("W/\"{}-{}\"", size, suffix);
    HeaderValue::from_str(&value).ok()
}

/// handles GET /image/{filename}
pub(crate) async fn serve_image_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Result<Response, ImagegenError> {
    if !is_valid_filename(&filename) {
        return Err(ImagegenError::BadRequest(format!(
            "Invalid filename {filename}"
        )));
    }

    let image_path = state.store.image_path(&filename);
    let metadata = match tokio::fs::metadata(&image_path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(ImagegenError::NotFound(filename)),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ImagegenError::NotFound(filename));
        }
        Err(err) => return Err(err.into()),
    };
    let cache_headers = ImageCacheHeaders::from_metadata(&metadata);
    if is_not_modified(&headers, &cache_headers) {
        let builder = Response::builder().status(StatusCode::NOT_MODIFIED);
        return apply_cache_headers(builder, &cache_headers)
            .body(Body::empty())
            .map_err(ImagegenError::from);
    }

    match tokio::fs::read(&image_path).await {
        Ok(bytes) => {
            let content_type = image::guess_format(&bytes)
                .map(|format| format.to_mime_type())
                .unwrap_or("application/octet-stream");
            let builder = Response::builder().header(CONTENT_TYPE, content_type);
            apply_cache_headers(builder, &cache_headers)
                .body(Body::from(bytes))
                .map_err(ImagegenError::from)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Err(ImagegenError::NotFound(filename)),
        Err(err) => Err(err.into()),
    }
}
