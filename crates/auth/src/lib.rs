//! `memberkit-auth` — credential generation, password hashing and the
//! session bridge.
//!
//! This crate is decoupled from storage: stores and hash providers are
//! injected through traits.

pub mod credentials;
pub mod hashing;
pub mod session;

pub use credentials::{generate, CredentialSpec};
pub use hashing::{Argon2Provider, HashError, HashStrategy, PasswordHasher, SaltedHashProvider};
pub use session::{
    Authenticatable, LoginConstraints, SessionBridge, SessionError, SessionHandle, SessionId,
    SessionStore,
};
