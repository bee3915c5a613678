//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok"), never performs I/O
//! - GET /readyz   -> readiness that checks SQLite connectivity and disk I/O
//!   under the object root

use crate::services::storage_service::StorageService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

/// `GET /healthz` — cheap liveness probe.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Returns 200 when SQLite answers `SELECT 1` and the object root survives a
/// write/read/delete probe, 503 with per-check detail otherwise.
pub async fn readyz(State(service): State<StorageService>) -> impl IntoResponse {
    let mut checks = HashMap::new();
    checks.insert("sqlite", check_sqlite(&service).await);
    checks.insert("disk", check_disk(&service).await);

    let overall_ok = checks.values().all(|check| check.ok);
    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn check_sqlite(service: &StorageService) -> CheckStatus {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*service.db)
        .await
    {
        Ok(1) => CheckStatus {
            ok: true,
            error: None,
        },
        Ok(other) => CheckStatus {
            ok: false,
            error: Some(format!("unexpected result: {}", other)),
        },
        Err(err) => CheckStatus {
            ok: false,
            error: Some(format!("error: {}", err)),
        },
    }
}

async fn check_disk(service: &StorageService) -> CheckStatus {
    let tmp_path = service.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
    let probe = async {
        fs::write(&tmp_path, b"readyz").await?;
        let bytes = fs::read(&tmp_path).await?;
        if bytes != b"readyz" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "file content mismatch",
            ));
        }
        fs::remove_file(&tmp_path).await
    }
    .await;

    match probe {
        Ok(_) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(err) => {
            let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
            CheckStatus {
                ok: false,
                error: Some(err.to_string()),
            }
        }
    }
}
