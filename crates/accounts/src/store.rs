//! Persistence boundaries for users and groups.

use memberkit_core::{DomainError, GroupId, UserId};

use crate::snapshot::Snapshot;
use crate::user::{GroupRef, UserEntity};

/// User persistence.
///
/// A single `persist` call is one atomic write: a user reverted by staging
/// reaches the store together with its pending change request.
pub trait UserStore: Send + Sync {
    fn find_by_id(&self, id: UserId) -> Result<Option<UserEntity>, DomainError>;

    /// Insert or update `user`, assigning an id on first persist.
    ///
    /// Returns the persisted user and its new clean baseline.
    fn persist(&self, user: UserEntity) -> Result<(UserEntity, Snapshot), DomainError>;

    /// Baseline of the last persisted state of the user.
    fn snapshot_baseline(&self, id: UserId) -> Result<Snapshot, DomainError> {
        self.find_by_id(id)?
            .map(|user| Snapshot::capture(&user))
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))
    }
}

/// Group lookup.
pub trait GroupStore: Send + Sync {
    fn find_by_id(&self, id: GroupId) -> Result<Option<GroupRef>, DomainError>;
}

impl<S> UserStore for std::sync::Arc<S>
where
    S: UserStore + ?Sized,
{
    fn find_by_id(&self, id: UserId) -> Result<Option<UserEntity>, DomainError> {
        (**self).find_by_id(id)
    }

    fn persist(&self, user: UserEntity) -> Result<(UserEntity, Snapshot), DomainError> {
        (**self).persist(user)
    }

    fn snapshot_baseline(&self, id: UserId) -> Result<Snapshot, DomainError> {
        (**self).snapshot_baseline(id)
    }
}

impl<S> GroupStore for std::sync::Arc<S>
where
    S: GroupStore + ?Sized,
{
    fn find_by_id(&self, id: GroupId) -> Result<Option<GroupRef>, DomainError> {
        (**self).find_by_id(id)
    }
}
