use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    response::{IntoResponse, Redirect},
};
use http::StatusCode;

use crate::auth::require_identity;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub async fn list_photos_route(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let identity = require_identity(&state)?;
    Ok(Json(state.gallery.listing().visible_to(&identity.uid)))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

pub async fn upload_photos_route(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Redirect> {
    require_identity(&state)?;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        files.push((name, bytes.to_vec()));
    }
    if files.is_empty() {
        return Err(AppError::BadRequest("no files uploaded".to_string()));
    }
    state.gallery.upload_objects(files).await?;
    Ok(Redirect::to("/"))
}

pub async fn delete_photo_route(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<Redirect> {
    require_identity(&state)?;
    state.gallery.delete_object(&name).await?;
    Ok(Redirect::to("/"))
}
