//! Defines routes for all paste operations.
//!
//! ## Structure
//! - `POST   /` — upload a multipart form, key is generated
//! - `POST   /{key}` — upload under a caller-chosen slug
//! - `GET    /{key}` — retrieve; the key may carry a `.{extension}` suffix
//! - `DELETE /{key}` — delete, creator IP only
//!
//! Health endpoints are mounted at `/healthz` and `/readyz`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        paste_handlers::{create_paste, create_paste_with_key, delete_paste, get_paste},
    },
    services::storage_service::{MAX_CONTENT_BYTES, StorageService},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for all paste routes.
///
/// The router carries shared state (`StorageService`) to all handlers. The
/// default axum body cap sits below the content ceiling, so it is lifted to
/// the ceiling plus headroom for multipart framing; the precise limit is
/// enforced against the extracted content field.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // paste routes
        .route("/", post(create_paste))
        .route(
            "/{key}",
            post(create_paste_with_key)
                .get(get_paste)
                .delete(delete_paste),
        )
        .layer(DefaultBodyLimit::max(MAX_CONTENT_BYTES + 64 * 1024))
}
