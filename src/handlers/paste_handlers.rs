//! HTTP handlers for paste upload, retrieval, and deletion.
//!
//! Buffers the whole request body, feeds it to the boundary parser, and
//! delegates storage concerns to `StorageService`. Rendering of retrieved
//! content is steered by the optional extension suffix on the key.

use crate::{
    errors::AppError,
    keys::generate_key,
    models::content::ContentKind,
    multipart, render,
    services::storage_service::{PasteContent, StorageService},
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;

/// Extensions served raw with an `image/{ext}` content type.
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "bmp", "ico"];

/// Multipart field carrying the paste payload.
const CONTENT_FIELD: &str = "c";

/// POST `/` — upload under a freshly generated key.
pub async fn create_paste(
    State(service): State<StorageService>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let key = generate_key(service.config.key_length);
    store_from_form(service, key, headers, body).await
}

/// POST `/{key}` — upload under a caller-chosen slug, overwriting any
/// previous content stored there.
pub async fn create_paste_with_key(
    State(service): State<StorageService>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    store_from_form(service, key, headers, body).await
}

async fn store_from_form(
    service: StorageService,
    key: String,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !multipart::is_form_data(content_type) {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Content-Type must be multipart/form-data",
        ));
    }

    let boundary = multipart::boundary_from_content_type(content_type).unwrap_or_default();
    let mut form = multipart::parse_form_data(&body, &boundary);
    let Some(part) = form.remove(CONTENT_FIELD) else {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "Content not found"));
    };

    let ip = client_ip(&headers);
    service.store_paste(&key, &part.content, &ip).await?;

    plain_text(format!("{}{}\n", service.config.base_url, key))
}

/// GET `/{key}` — retrieve and render; the key may carry a `.{extension}`
/// suffix steering the response form.
pub async fn get_paste(
    State(service): State<StorageService>,
    Path(raw_key): Path<String>,
) -> Result<Response, AppError> {
    let (key, extension) = split_extension(&raw_key);
    let content = service.load_paste(key).await?;
    Ok(render_paste(content, extension))
}

/// DELETE `/{key}` — remove a paste when the caller's IP matches the
/// creator's.
pub async fn delete_paste(
    State(service): State<StorageService>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let ip = client_ip(&headers);
    service.delete_paste(&key, &ip).await?;
    plain_text("Deleted".to_string())
}

/// Split a raw path segment into lookup key and optional extension on the
/// first `.`.
fn split_extension(raw_key: &str) -> (&str, Option<&str>) {
    match raw_key.split_once('.') {
        Some((key, ext)) if !ext.is_empty() => (key, Some(ext)),
        Some((key, _)) => (key, None),
        None => (raw_key, None),
    }
}

/// Pick the response form for decoded content.
///
/// The extension is trusted over the actual bytes: `.png` yields an image
/// content type even for stored text. Without an extension, tagged-binary
/// content skips the text probe entirely; everything else is served as text
/// when it strictly decodes and as raw bytes when it does not.
fn render_paste(content: PasteContent, extension: Option<&str>) -> Response {
    match extension {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => {
            with_content_type(content.bytes, &format!("image/{}", ext))
        }
        Some(ext) => {
            let text = String::from_utf8_lossy(&content.bytes).into_owned();
            with_content_type(
                render::highlight_page(&text, ext).into_bytes(),
                "text/html; charset=utf-8",
            )
        }
        None => {
            if content.kind == ContentKind::Binary {
                return with_content_type(content.bytes, "application/octet-stream");
            }
            match String::from_utf8(content.bytes) {
                Ok(text) => with_content_type(text.into_bytes(), "text/plain; charset=utf-8"),
                Err(err) => with_content_type(err.into_bytes(), "application/octet-stream"),
            }
        }
    }
}

/// Client address from the proxy trust headers: first `X-Forwarded-For`
/// hop, then `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_default()
}

fn plain_text(body: String) -> Result<Response, AppError> {
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    Ok(response)
}

fn with_content_type(bytes: Vec<u8>, content_type: &str) -> Response {
    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    response
}
