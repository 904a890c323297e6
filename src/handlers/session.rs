use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use http::StatusCode;
use tracing::error;

use super::index::render_login;
use crate::auth::Credentials;
use crate::error::AuthError;
use crate::helpers::settle;
use crate::state::AppState;

fn rejected(err: &AuthError) -> Response {
    let status = err.status();
    if status.is_server_error() {
        error!(%err, "identity service failed");
    }
    render_login(status, Some(&err.to_string()))
}

async fn signed_in(state: &AppState, email: &str) -> Response {
    let email = email.trim().to_ascii_lowercase();
    settle(&state.session, |s| {
        s.identity().is_some_and(|i| i.email == email)
    })
    .await;
    if let Err(err) = state.gallery.load_objects().await {
        error!(%err, "failed to load objects after sign-in");
    }
    Redirect::to("/").into_response()
}

pub async fn signup_route(
    State(state): State<Arc<AppState>>,
    Form(credentials): Form<Credentials>,
) -> impl IntoResponse {
    match state
        .session
        .signup(&credentials.email, &credentials.password)
        .await
    {
        Ok(()) => signed_in(&state, &credentials.email).await,
        Err(err) => rejected(&err),
    }
}

pub async fn login_route(
    State(state): State<Arc<AppState>>,
    Form(credentials): Form<Credentials>,
) -> impl IntoResponse {
    match state
        .session
        .login(&credentials.email, &credentials.password)
        .await
    {
        Ok(()) => signed_in(&state, &credentials.email).await,
        Err(err) => rejected(&err),
    }
}

pub async fn logout_route(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session.logout().await {
        Ok(()) => {
            settle(&state.session, |s| !s.is_authenticated()).await;
            Redirect::to("/").into_response()
        }
        Err(err) => {
            error!(%err, "failed to log out");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

