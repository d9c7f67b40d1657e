//! `memberkit-core` — shared building blocks for the membership crates.
//!
//! This crate contains identifiers and the domain error model only (no
//! storage, no hashing, no session handling).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{GroupId, StoragePartition, UserId};
