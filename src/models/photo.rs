use chrono::{DateTime, Utc};
use imsz::ImInfo;
use serde::{Deserialize, Serialize};

use super::UserId;

/// Image dimensions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub height: u64,
    pub width: u64,
}

impl From<&ImInfo> for Dimension {
    fn from(value: &ImInfo) -> Self {
        Self {
            height: value.height,
            width: value.width,
        }
    }
}

/// An object as enumerated by the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHandle {
    pub path: String,
    pub name: String,
}

/// One uploaded photo and the address it can be fetched from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObjectRef {
    pub name: String,
    pub url: String,
}

/// Snapshot of a namespace, replaced wholesale on every load
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Listing {
    pub objects: Vec<StoredObjectRef>,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Whose namespace was listed
    #[serde(default)]
    pub owner: Option<UserId>,
}

impl Listing {
    pub fn names(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.name.as_str()).collect()
    }

    pub fn is_owned_by(&self, uid: &UserId) -> bool {
        self.owner.as_ref() == Some(uid)
    }

    /// The listing as `uid` may see it, empty when it was loaded for someone else
    #[must_use]
    pub fn visible_to(self, uid: &UserId) -> Self {
        if self.is_owned_by(uid) { self } else { Self::default() }
    }
}
