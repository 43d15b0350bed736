//! Pilot photo endpoint
//!
//! Photos are read from under the source root, either by pilot id (using the
//! pilot's photo reference from the published snapshot) or by an explicit
//! relative path.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PilotImageQuery {
    pub id: Option<String>,
    pub path: Option<String>,
}

/// Join `relative` onto `base`, refusing anything that escapes `base`
///
/// Purely lexical: `..` may only cancel components added by `relative`.
pub fn resolve_under(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut resolved: Vec<Component> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    let mut path = base.to_path_buf();
    path.extend(resolved);
    Some(path)
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// GET /api/pilot_image?id=..|path=..
///
/// - 400 without `id` or `path`
/// - 404 for an unknown pilot id
/// - 403 when the reference leaves the source root
/// - 204 when the pilot has no photo or the file is missing
pub async fn get_pilot_image(
    State(state): State<AppState>,
    Query(query): Query<PilotImageQuery>,
) -> ApiResult<Response> {
    let reference = match (query.path, query.id) {
        (Some(path), _) => path,
        (None, Some(id)) => {
            let snapshot = state.publisher.current().await;
            let pilot = snapshot
                .pilots
                .get(&id)
                .ok_or_else(|| ApiError::NotFound(format!("Pilot {}", id)))?;
            match &pilot.photo_path {
                Some(path) if !path.trim().is_empty() => path.clone(),
                _ => {
                    debug!("Pilot {} has no photo", id);
                    return Ok(StatusCode::NO_CONTENT.into_response());
                }
            }
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Pilot id or photo path is required".to_string(),
            ))
        }
    };

    let root = state.settings.snapshot().await.source_root_path;
    let Some(image_path) = resolve_under(&root, &reference) else {
        warn!("Refused pilot image outside the source root: {}", reference);
        return Err(ApiError::Forbidden(reference));
    };

    match tokio::fs::read(&image_path).await {
        Ok(bytes) => Ok((
            [(header::CONTENT_TYPE, content_type(&image_path))],
            bytes,
        )
            .into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Pilot image not found at {}", image_path.display());
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Err(e) => Err(ApiError::Io(e)),
    }
}
