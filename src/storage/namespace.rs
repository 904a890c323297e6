use crate::error::StorageError;
use crate::models::Identity;

/// Top-level folder holding every user's namespace
const ROOT: &str = "photos";

/// The `photos/<uid>` prefix scoping one identity's objects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            prefix: format!("{ROOT}/{}", identity.uid),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn object_path(&self, name: &str) -> Result<String, StorageError> {
        validate_name(name)?;
        Ok(format!("{}/{name}", self.prefix))
    }

    /// Whether `path` names an object directly inside this namespace
    pub fn contains(&self, path: &str) -> bool {
        path.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| validate_name(name).is_ok())
    }
}

/// Object names are single path segments
fn validate_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        Err(StorageError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::UserId;

    fn namespace() -> Namespace {
        Namespace::for_identity(&Identity {
            uid: UserId::from("u1"),
            email: "u1@example.com".to_string(),
            created_at: Utc::now(),
        })
    }

    #[test]
    fn builds_paths_under_prefix() {
        let ns = namespace();
        assert_eq!("photos/u1", ns.prefix());
        assert_eq!("photos/u1/a.jpg", ns.object_path("a.jpg").unwrap());
    }

    #[test]
    fn rejects_names_escaping_the_namespace() {
        let ns = namespace();
        for name in ["", ".", "..", "../u2/a.jpg", "x/y.jpg", "x\\y.jpg", "a\0.jpg"] {
            assert!(
                matches!(ns.object_path(name), Err(StorageError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn containment() {
        let ns = namespace();
        assert!(ns.contains("photos/u1/a.jpg"));
        assert!(!ns.contains("photos/u1"));
        assert!(!ns.contains("photos/u10/a.jpg"));
        assert!(!ns.contains("photos/u2/a.jpg"));
        assert!(!ns.contains("photos/u1/../u2/a.jpg"));
    }
}
