use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

use super::hash::{hash_password, verify_password, HashScheme};
use super::repository::{CredentialRecord, CredentialRepository, FlatFileRepository};

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field is empty or the username cannot be stored.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Username already exists")]
    UserExists,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// The credential file could not be read or written.
    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// Proof of a successful login, handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    username: String,
}

impl Session {
    pub(crate) fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Registration and login over a [`CredentialRepository`].
pub struct CredentialStore<R = FlatFileRepository> {
    repo: R,
    scheme: HashScheme,
}

impl CredentialStore<FlatFileRepository> {
    /// Store backed by the flat file at `path`.
    pub fn open(path: impl Into<PathBuf>, scheme: HashScheme) -> Self {
        Self::new(FlatFileRepository::new(path), scheme)
    }
}

impl<R: CredentialRepository> CredentialStore<R> {
    pub fn new(repo: R, scheme: HashScheme) -> Self {
        Self { repo, scheme }
    }

    /// Register a new user.
    ///
    /// Checks run in order: empty fields, unstorable username, confirmation
    /// mismatch, password length, existing user.
    pub fn register(
        &self,
        username: &str,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<(), AuthError> {
        let password = password.expose_secret();
        let confirm = confirm.expose_secret();

        if username.is_empty() || password.is_empty() || confirm.is_empty() {
            return Err(AuthError::InvalidInput("all fields are required"));
        }
        if username.contains([':', '\n', '\r']) {
            return Err(AuthError::InvalidInput(
                "username may not contain ':' or line breaks",
            ));
        }
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }
        if !self.repo.lookup(username)?.is_empty() {
            return Err(AuthError::UserExists);
        }

        self.repo.append(&CredentialRecord {
            username: username.to_string(),
            password_hash: hash_password(password, self.scheme),
        })?;

        tracing::info!(user = %username, scheme = ?self.scheme, "Registered user");
        Ok(())
    }

    /// Verify credentials and open a session.
    pub fn login(&self, username: &str, password: &SecretString) -> Result<Session, AuthError> {
        let password = password.expose_secret();

        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("username and password are required"));
        }

        let verified = self
            .repo
            .lookup(username)?
            .iter()
            .any(|record| verify_password(password, &record.password_hash));

        if !verified {
            tracing::debug!(user = %username, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user = %username, "Login succeeded");
        Ok(Session::new(username))
    }

    /// Whether any record is stored under `username`.
    ///
    /// Scans the whole store. A store that cannot be read reports `false`.
    pub fn exists(&self, username: &str) -> bool {
        match self.repo.lookup(username) {
            Ok(records) => !records.is_empty(),
            Err(e) => {
                tracing::warn!(user = %username, error = %e, "Failed to read credential store");
                false
            }
        }
    }
}
