use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// The authenticated principal as reported by the identity service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Where the session stands, as observed from identity notifications
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// No notification delivered yet
    #[default]
    Unresolved,
    Authenticated(Identity),
    Unauthenticated,
}

impl SessionStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionStatus::Unresolved)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionStatus::Authenticated(identity) => Some(identity),
            SessionStatus::Unresolved | SessionStatus::Unauthenticated => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Unresolved => "unresolved",
            SessionStatus::Authenticated(_) => "authenticated",
            SessionStatus::Unauthenticated => "unauthenticated",
        }
    }
}

impl From<Option<Identity>> for SessionStatus {
    fn from(value: Option<Identity>) -> Self {
        match value {
            Some(identity) => SessionStatus::Authenticated(identity),
            None => SessionStatus::Unauthenticated,
        }
    }
}
