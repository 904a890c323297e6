mod credentials;
mod middleware;

pub use credentials::Credentials;
pub use middleware::{require_identity, require_resolved};
