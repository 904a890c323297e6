use std::sync::Arc;

use crate::gallery::Gallery;
use crate::session::SessionManager;
use crate::storage::ObjectStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub gallery: Gallery,
    /// Upload body limit in bytes
    pub max_upload: usize,
    pub session: SessionManager,
    pub store: Arc<dyn ObjectStore>,
}
