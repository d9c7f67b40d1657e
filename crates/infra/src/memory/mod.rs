//! In-memory collaborators for tests/dev.

pub mod groups;
pub mod sessions;
pub mod users;

pub use groups::InMemoryGroupStore;
pub use sessions::InMemorySessionStore;
pub use users::InMemoryUserStore;

use memberkit_core::DomainError;

fn poisoned(store: &str) -> DomainError {
    DomainError::persistence(format!("{store} lock poisoned"))
}
