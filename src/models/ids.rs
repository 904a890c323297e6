use std::fmt;

use rand::{Rng as _, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

const USER_ID_LEN: usize = 28;

/// Newtype wrapper for user IDs
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a random alphanumeric user ID
    pub fn generate() -> Self {
        let id = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(USER_ID_LEN)
            .map(char::from)
            .collect();
        UserId(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash a string with a seed
pub fn hash_string<S: AsRef<str>>(seed: u64, s: S) -> String {
    let mut hasher = Xxh3::with_seed(seed);
    hasher.update(s.as_ref().as_bytes());
    format!("{:x}", hasher.digest())
}
