use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};

use crate::error::{AppError, AppResult};
use crate::models::Identity;
use crate::state::AppState;

/// Hold every request until the first identity notification arrived, so
/// nothing renders before the session state is known
pub async fn require_resolved(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> impl IntoResponse {
    if state.session.status().is_resolved() {
        next.run(request).await
    } else {
        AppError::ServiceUnavailable.into_response()
    }
}

/// The signed-in identity, or 401
pub fn require_identity(state: &AppState) -> AppResult<Identity> {
    state
        .session
        .current_identity()
        .ok_or(AppError::Unauthorized)
}
