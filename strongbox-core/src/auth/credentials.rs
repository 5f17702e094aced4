use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{AuthError, AuthResult};

const MAX_USERNAME_LEN: usize = 64;

/// Stored form of one user: `<dir>/<username>.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// argon2id PHC string
    pub password_hash: String,
}

/// File-per-user credential store
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a user. Fails if the name is taken.
    pub fn register(&self, username: &str, password: &str) -> AuthResult<()> {
        validate_username(username)?;
        fs::create_dir_all(&self.dir)?;

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();

        let record = UserRecord {
            username: username.to_string(),
            password_hash,
        };
        let data = serde_json::to_vec_pretty(&record)?;

        // create_new so two concurrent registrations cannot both win
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.user_path(username))
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AuthError::UserExists(username.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&data)?;
        file.sync_all()?;

        info!(user = username, "User registered");
        Ok(())
    }

    /// True only for an existing user with the right password
    pub fn verify(&self, username: &str, password: &str) -> AuthResult<bool> {
        if validate_username(username).is_err() {
            return Ok(false);
        }

        let data = match fs::read(self.user_path(username)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(user = username, "Login for unknown user");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let record: UserRecord = serde_json::from_slice(&data)?;

        let parsed_hash =
            PasswordHash::new(&record.password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        let ok = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();

        debug!(user = username, ok, "Password checked");
        Ok(ok)
    }

    pub fn exists(&self, username: &str) -> bool {
        validate_username(username).is_ok() && self.user_path(username).exists()
    }

    /// Registered usernames, sorted
    pub fn users(&self) -> AuthResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut users: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    return None;
                }
                path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            })
            .collect();
        users.sort();
        Ok(users)
    }

    fn user_path(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}.json", username))
    }
}

fn validate_username(username: &str) -> AuthResult<()> {
    let valid = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        && username != "."
        && username != "..";

    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidUsername(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_register_and_verify() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("users"));

        store.register("alice", "correct horse").unwrap();
        assert!(store.exists("alice"));
        assert!(store.verify("alice", "correct horse").unwrap());
        assert!(!store.verify("alice", "wrong").unwrap());
        assert!(!store.verify("bob", "correct horse").unwrap());
    }

    #[test]
    fn test_duplicate_registration() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        store.register("alice", "pw").unwrap();
        assert!(matches!(
            store.register("alice", "other"),
            Err(AuthError::UserExists(_))
        ));
        // Original password still works
        assert!(store.verify("alice", "pw").unwrap());
    }

    #[test]
    fn test_hash_is_argon2id_phc() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.register("carol", "secret").unwrap();

        let data = fs::read(dir.path().join("carol.json")).unwrap();
        let record: UserRecord = serde_json::from_slice(&data).unwrap();
        assert!(record.password_hash.starts_with("$argon2id$"));
        assert!(!record.password_hash.contains("secret"));
    }

    #[test]
    fn test_invalid_usernames() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        let too_long = "x".repeat(65);
        for name in ["", "..", "a/b", "white space", too_long.as_str()] {
            assert!(
                matches!(store.register(name, "pw"), Err(AuthError::InvalidUsername(_))),
                "{:?} accepted",
                name
            );
            assert!(!store.verify(name, "pw").unwrap());
        }
        store.register("ok_name-1.2", "pw").unwrap();
    }

    #[test]
    fn test_users_listing() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("missing"));
        assert!(store.users().unwrap().is_empty());

        store.register("zed", "pw").unwrap();
        store.register("amy", "pw").unwrap();
        assert_eq!(store.users().unwrap(), vec!["amy", "zed"]);
    }
}
