use std::time::Duration;

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;
use tracing::{error, warn};

use crate::models::SessionStatus;
use crate::session::SessionManager;

/// How long a handler waits for the identity service to report a change
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Render a template, logging and answering 500 when it fails
pub fn render_html<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            error!(%err, "failed to render template");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(String::new())).into_response()
        }
    }
}

/// Wait until the session reflects an operation that just succeeded
pub async fn settle<F>(session: &SessionManager, f: F) -> SessionStatus
where
    F: FnMut(&SessionStatus) -> bool,
{
    match tokio::time::timeout(SETTLE_TIMEOUT, session.wait_until(f)).await {
        Ok(status) => status,
        Err(_) => {
            warn!("identity service did not report the change in time");
            session.status()
        }
    }
}

/// Infer Content-Type from file extension
pub fn content_type_from_path(path: &str) -> &'static str {
    match path
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}
