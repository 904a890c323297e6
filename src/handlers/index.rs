use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use http::StatusCode;

use crate::error::AppError;
use crate::helpers::render_html;
use crate::models::{Identity, Listing, SessionStatus, StoredObjectRef};
use crate::state::AppState;

pub const VERSION: &str = env!("APP_VERSION");

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    identity: &'a Identity,
    loaded_at: String,
    photos: &'a [StoredObjectRef],
    version: &'static str,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    error: Option<&'a str>,
    version: &'static str,
}

/// Login page, optionally carrying the reason the last attempt failed
pub fn render_login(status: StatusCode, error: Option<&str>) -> Response {
    render_html(status, &LoginTemplate {
        error,
        version: VERSION,
    })
}

/// What the front page shows for a given session status
pub fn render_front_page(status: &SessionStatus, listing: &Listing) -> Response {
    match status {
        SessionStatus::Unresolved => AppError::ServiceUnavailable.into_response(),
        SessionStatus::Unauthenticated => render_login(StatusCode::OK, None),
        SessionStatus::Authenticated(identity) => {
            // a listing left over from the previous user is never shown
            let owned = listing.is_owned_by(&identity.uid);
            render_html(StatusCode::OK, &IndexTemplate {
                identity,
                loaded_at: listing
                    .loaded_at
                    .filter(|_| owned)
                    .map(|t| t.to_rfc2822())
                    .unwrap_or_default(),
                photos: if owned { listing.objects.as_slice() } else { &[] },
                version: VERSION,
            })
        }
    }
}

pub async fn index_route(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    render_front_page(&state.session.status(), &state.gallery.listing())
}
