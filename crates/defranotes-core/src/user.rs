//! Local user identity, persisted to the data directory on first run

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::NotesResult;

const USER_FILE: &str = "user.json";

/// Identifier/display-name pair for the current user.
///
/// Generated once and persisted; every note created by this client carries
/// the identifier as its `authorId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
}

impl UserIdentity {
    /// Load the identity from `<data_dir>/user.json`, generating and
    /// persisting a fresh one on first run.
    pub fn load_or_create(data_dir: impl AsRef<Path>) -> NotesResult<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let path = data_dir.join(USER_FILE);
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let user: UserIdentity = serde_json::from_str(&raw)?;
            return Ok(user);
        }

        let id = format!("user-{}", Uuid::new_v4());
        let user = UserIdentity {
            name: Self::display_name(&id),
            id,
        };
        fs::write(&path, serde_json::to_string_pretty(&user)?)?;
        info!(id = %user.id, "Generated new user identity");
        Ok(user)
    }

    /// Display name derived from the tail of the identifier
    fn display_name(id: &str) -> String {
        let tail: String = id
            .chars()
            .rev()
            .take(8)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("User {}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_created_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserIdentity::load_or_create(dir.path()).unwrap();
        assert!(user.id.starts_with("user-"));
        assert!(user.name.starts_with("User "));
        assert!(dir.path().join(USER_FILE).exists());
    }

    #[test]
    fn test_identity_stable_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let first = UserIdentity::load_or_create(dir.path()).unwrap();
        let second = UserIdentity::load_or_create(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_display_name_uses_id_tail() {
        assert_eq!(UserIdentity::display_name("user-abcdef123456"), "User ef123456");
    }
}
