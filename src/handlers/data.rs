use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use http::{StatusCode, header};

use crate::auth::require_identity;
use crate::error::AppResult;
use crate::helpers::content_type_from_path;
use crate::state::AppState;
use crate::storage::Namespace;

/// Serve object bytes, but only from the signed-in user's namespace
pub async fn show_data_route(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> AppResult<impl IntoResponse> {
    let identity = require_identity(&state)?;
    if !Namespace::for_identity(&identity).contains(&path) {
        return Ok((StatusCode::NOT_FOUND, Vec::new()).into_response());
    }
    let content = state.store.read(&path).await?;
    let content_type = content_type_from_path(&path);
    // addresses carry a content version, so the bytes behind one never change
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "private, max-age=86400, immutable"),
        ],
        content,
    )
        .into_response())
}
