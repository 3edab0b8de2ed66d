//! Security utilities for credential protection.
//!
//! # Security Guarantees
//! - Credentials are held in `Zeroizing` containers for automatic memory clearing
//! - Passwords are masked in `Debug` output
//! - Credential-bearing URLs are redacted before they reach errors or logs
//!   (see [`crate::error::redact_database_url`])

mod credentials;

pub use credentials::Credentials;
