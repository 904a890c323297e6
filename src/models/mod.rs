mod identity;
mod ids;
mod photo;

pub use identity::{Identity, SessionStatus};
pub use ids::{UserId, hash_string};
pub use photo::{Dimension, Listing, ObjectHandle, StoredObjectRef};
