//! Password hashing strategies.
//!
//! The strategy is chosen by configuration, never by the entity. `Md5` and
//! `Sha1` exist only to stay compatible with legacy stored hashes.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;
use md5::Md5;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Closed set of one-way transforms applied to a plaintext password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStrategy {
    None,
    Md5,
    Sha1,
    /// Salted adaptive hash produced by a [`SaltedHashProvider`].
    #[default]
    #[serde(rename = "salted", alias = "saltedpasswords")]
    SaltedAdaptive,
}

impl HashStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashStrategy::None => "none",
            HashStrategy::Md5 => "md5",
            HashStrategy::Sha1 => "sha1",
            HashStrategy::SaltedAdaptive => "salted",
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, HashStrategy::Md5 | HashStrategy::Sha1)
    }
}

impl core::fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    /// `SaltedAdaptive` was selected but no enabled provider is installed.
    #[error("salted hash provider is not available")]
    Unavailable,

    #[error("hashing failed: {0}")]
    Provider(String),
}

/// Produces self-describing salted hashes (algorithm tag + salt + digest).
pub trait SaltedHashProvider: Send + Sync {
    /// Whether salted hashing is enabled for frontend users.
    fn is_enabled(&self) -> bool {
        true
    }

    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    fn verify(&self, plaintext: &str, stored: &str) -> bool;
}

/// Argon2id provider emitting PHC strings.
#[derive(Debug, Clone, Default)]
pub struct Argon2Provider {
    disabled: bool,
}

impl Argon2Provider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that reports itself as disabled (salted hashing switched off).
    pub fn disabled() -> Self {
        Self { disabled: true }
    }
}

impl SaltedHashProvider for Argon2Provider {
    fn is_enabled(&self) -> bool {
        !self.disabled
    }

    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Provider(e.to_string()))
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Applies a [`HashStrategy`] to plaintext passwords.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    salted: Option<Arc<dyn SaltedHashProvider>>,
}

impl core::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("salted", &self.salted.is_some())
            .finish()
    }
}

impl PasswordHasher {
    /// Hasher without a salted provider; `SaltedAdaptive` fails closed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<dyn SaltedHashProvider>) -> Self {
        Self {
            salted: Some(provider),
        }
    }

    /// Hasher backed by [`Argon2Provider`].
    pub fn argon2() -> Self {
        Self::with_provider(Arc::new(Argon2Provider::new()))
    }

    pub fn hash(&self, plaintext: &str, strategy: HashStrategy) -> Result<String, HashError> {
        match strategy {
            HashStrategy::None => Ok(plaintext.to_string()),
            HashStrategy::Md5 => {
                tracing::warn!(strategy = %strategy, "hashing password with legacy digest");
                Ok(hex::encode(Md5::digest(plaintext.as_bytes())))
            }
            HashStrategy::Sha1 => {
                tracing::warn!(strategy = %strategy, "hashing password with legacy digest");
                Ok(hex::encode(Sha1::digest(plaintext.as_bytes())))
            }
            HashStrategy::SaltedAdaptive => self.enabled_provider()?.hash(plaintext),
        }
    }

    /// Check a plaintext password against a stored value produced by `strategy`.
    pub fn verify(
        &self,
        plaintext: &str,
        stored: &str,
        strategy: HashStrategy,
    ) -> Result<bool, HashError> {
        match strategy {
            HashStrategy::SaltedAdaptive => Ok(self.enabled_provider()?.verify(plaintext, stored)),
            _ => Ok(self.hash(plaintext, strategy)? == stored),
        }
    }

    fn enabled_provider(&self) -> Result<&dyn SaltedHashProvider, HashError> {
        match &self.salted {
            Some(provider) if provider.is_enabled() => Ok(provider.as_ref()),
            _ => Err(HashError::Unavailable),
        }
    }
}
