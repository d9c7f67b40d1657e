//! Bridge from a persisted account to an authenticated session.
//!
//! Session storage is injected through [`SessionStore`]; this module only
//! decides whether a login is allowed and makes sure it starts fresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use memberkit_core::{DomainError, StoragePartition, UserId};

/// Identifier of an authenticated session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Constraints the session backend must honour when resolving the user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginConstraints {
    pub user_id: UserId,
    /// Restrict the record lookup to these partitions (all when `None`).
    pub allowed_partitions: Option<Vec<StoragePartition>>,
}

/// A created session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Session backend.
pub trait SessionStore: Send + Sync {
    fn create_session(
        &self,
        user_id: UserId,
        constraints: &LoginConstraints,
    ) -> Result<SessionHandle, DomainError>;

    fn find_session(&self, id: &SessionId) -> Result<Option<SessionHandle>, DomainError>;

    fn sessions_for_user(&self, user_id: UserId) -> Result<Vec<SessionHandle>, DomainError>;

    /// Remove every session bound to `user_id`; returns how many were removed.
    fn remove_sessions_for_user(&self, user_id: UserId) -> Result<usize, DomainError>;
}

impl<S> SessionStore for std::sync::Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn create_session(
        &self,
        user_id: UserId,
        constraints: &LoginConstraints,
    ) -> Result<SessionHandle, DomainError> {
        (**self).create_session(user_id, constraints)
    }

    fn find_session(&self, id: &SessionId) -> Result<Option<SessionHandle>, DomainError> {
        (**self).find_session(id)
    }

    fn sessions_for_user(&self, user_id: UserId) -> Result<Vec<SessionHandle>, DomainError> {
        (**self).sessions_for_user(user_id)
    }

    fn remove_sessions_for_user(&self, user_id: UserId) -> Result<usize, DomainError> {
        (**self).remove_sessions_for_user(user_id)
    }
}

/// What the bridge needs to know about an account.
pub trait Authenticatable {
    /// `None` until the account has been persisted.
    fn user_id(&self) -> Option<UserId>;

    fn storage_partition(&self) -> StoragePartition;

    fn is_disabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("user must be persisted before login")]
    NotPersisted,

    #[error("user {0} is disabled")]
    Disabled(UserId),

    #[error("user {user_id} lives in partition {partition}, which is not allowed for login")]
    PartitionNotAllowed {
        user_id: UserId,
        partition: StoragePartition,
    },

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Establishes authenticated sessions for persisted users.
#[derive(Debug, Clone)]
pub struct SessionBridge<S> {
    store: S,
}

impl<S> SessionBridge<S>
where
    S: SessionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Log `user` in, replacing any session it already had.
    pub fn login<U>(
        &self,
        user: &U,
        allowed_partitions: Option<&[StoragePartition]>,
    ) -> Result<SessionHandle, SessionError>
    where
        U: Authenticatable + ?Sized,
    {
        let user_id = user.user_id().ok_or(SessionError::NotPersisted)?;
        if user.is_disabled() {
            return Err(SessionError::Disabled(user_id));
        }

        let allowed_partitions = allowed_partitions
            .filter(|partitions| !partitions.is_empty())
            .map(<[StoragePartition]>::to_vec);
        if let Some(partitions) = &allowed_partitions {
            let partition = user.storage_partition();
            if !partitions.contains(&partition) {
                return Err(SessionError::PartitionNotAllowed { user_id, partition });
            }
        }

        let dropped = self.store.remove_sessions_for_user(user_id)?;
        let constraints = LoginConstraints {
            user_id,
            allowed_partitions,
        };
        let handle = self.store.create_session(user_id, &constraints)?;
        if handle.user_id != user_id {
            return Err(SessionError::Store(DomainError::contract(format!(
                "session store returned a session for user {} instead of {}",
                handle.user_id, user_id
            ))));
        }

        tracing::info!(user_id = %user_id, session_id = %handle.id, dropped, "user logged in");
        Ok(handle)
    }

    /// Remove every session for the user.
    pub fn logout_user(&self, user_id: UserId) -> Result<usize, SessionError> {
        let removed = self.store.remove_sessions_for_user(user_id)?;
        tracing::info!(user_id = %user_id, removed, "user sessions removed");
        Ok(removed)
    }

    pub fn has_session(&self, user_id: UserId) -> Result<bool, SessionError> {
        Ok(!self.store.sessions_for_user(user_id)?.is_empty())
    }

    /// User bound to the given session, if the session exists.
    pub fn current_user_id(&self, session_id: &SessionId) -> Result<Option<UserId>, SessionError> {
        Ok(self.store.find_session(session_id)?.map(|s| s.user_id))
    }
}
