//! Secure credential container with automatic memory zeroing.
//!
//! Adapters copy the username and password out of a [`Connection`] profile
//! into a [`Credentials`] value just long enough to configure the engine
//! driver; the copy is cleared from memory when it goes out of scope.

use crate::models::Connection;
use zeroize::{Zeroize, Zeroizing};

/// Secure credential container that automatically zeros memory on drop.
///
/// # Example
///
/// ```rust
/// use sqlharbor_core::security::Credentials;
///
/// let creds = Credentials::new("admin".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "admin");
/// assert!(creds.has_password());
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    pub username: Zeroizing<String>,
    pub password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Copies the credentials of a connection profile.
    ///
    /// An empty password is treated as no password.
    pub fn from_connection(connection: &Connection) -> Self {
        let password = (!connection.password.is_empty()).then(|| connection.password.clone());
        Self::new(connection.username.clone(), password)
    }

    /// Gets the username (still protected by Zeroizing).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Gets the password, or an empty string when none was given.
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
