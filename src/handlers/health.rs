use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::models::Listing;
use crate::state::AppState;

#[derive(Deserialize, Serialize)]
pub struct Healthz {
    pub status: String,
    pub photos: usize,
    pub loaded_at: Option<i64>,
}

pub async fn healthz_route(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let listing = match state.session.current_identity() {
        Some(identity) => state.gallery.listing().visible_to(&identity.uid),
        None => Listing::default(),
    };
    Json(Healthz {
        status: state.session.status().label().to_string(),
        photos: listing.objects.len(),
        loaded_at: listing.loaded_at.map(|t| t.timestamp_millis()),
    })
}
