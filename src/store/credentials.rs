use std::env;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rusqlite::types::ValueRef;
use super::GradeStore;
use crate::error::{Error, Result};
use crate::models::Credential;

// Where the portal login comes from. Exactly one login is expected.
pub trait CredentialSource {
    fn credential(&self) -> Result<Credential>;
}

// The `users` table holds one row written at signup, password base64-encoded.
impl CredentialSource for GradeStore {
    fn credential(&self) -> Result<Credential> {
        let mut stmt = self.connection().prepare("SELECT username, password FROM users")?;
        let mut users = stmt
            .query_map([], |row| {
                let username: String = row.get(0)?;
                // Older signups stored the encoded password as a blob.
                let encoded = match row.get_ref(1)? {
                    ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
                    _ => Vec::new(),
                };
                Ok((username, encoded))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if users.len() != 1 {
            return Err(Error::Credentials(format!(
                "expected exactly one user in the database, found {}",
                users.len()
            )));
        }

        let (username, encoded) = users.remove(0);
        if encoded.is_empty() {
            return Err(Error::Credentials(format!("user {} has no password", username)));
        }
        let decoded = STANDARD
            .decode(&encoded)
            .map_err(|e| Error::Credentials(format!("password of {} is not base64: {}", username, e)))?;
        let password = String::from_utf8(decoded)
            .map_err(|_| Error::Credentials(format!("password of {} is not UTF-8", username)))?;

        Ok(Credential::new(username, password))
    }
}

// Login taken from `MY2_USERNAME` / `MY2_PASSWORD`.
pub struct EnvCredentials;

impl EnvCredentials {
    pub const USERNAME: &'static str = "MY2_USERNAME";
    pub const PASSWORD: &'static str = "MY2_PASSWORD";

    pub fn is_configured() -> bool {
        env::var(Self::USERNAME).map(|v| !v.trim().is_empty()).unwrap_or(false)
    }
}

impl CredentialSource for EnvCredentials {
    fn credential(&self) -> Result<Credential> {
        let username = env::var(Self::USERNAME)
            .map_err(|_| Error::Credentials(format!("{} environment variable not found", Self::USERNAME)))?;
        let password = env::var(Self::PASSWORD)
            .map_err(|_| Error::Credentials(format!("{} environment variable not found", Self::PASSWORD)))?;
        Ok(Credential::new(username, password))
    }
}
