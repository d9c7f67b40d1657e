use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use memberkit_accounts::{Snapshot, UserEntity, UserStore};
use memberkit_core::{DomainError, UserId};

use super::poisoned;

/// In-memory user store.
///
/// Each `persist` replaces the whole record under one write lock.
#[derive(Debug)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, UserEntity>>,
    next_id: AtomicU64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> Result<usize, DomainError> {
        let map = self.inner.read().map_err(|_| poisoned("user store"))?;
        Ok(map.len())
    }

    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_id(&self, id: UserId) -> Result<Option<UserEntity>, DomainError> {
        let map = self.inner.read().map_err(|_| poisoned("user store"))?;
        Ok(map.get(&id).cloned())
    }

    fn persist(&self, mut user: UserEntity) -> Result<(UserEntity, Snapshot), DomainError> {
        let mut map = self.inner.write().map_err(|_| poisoned("user store"))?;

        if let Some(id) = user.uid {
            if !map.contains_key(&id) {
                return Err(DomainError::not_found(format!("user {id}")));
            }
        }

        let taken = map
            .values()
            .any(|other| other.uid != user.uid && other.username == user.username);
        if taken {
            return Err(DomainError::validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }

        let id = match user.uid {
            Some(id) => id,
            None => {
                let id = UserId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                user.uid = Some(id);
                id
            }
        };

        let baseline = Snapshot::capture(&user);
        map.insert(id, user.clone());
        tracing::debug!(uid = %id, "persisted user");
        Ok((user, baseline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserEntity {
        let mut user = UserEntity::new();
        user.username = name.to_string();
        user
    }

    #[test]
    fn persist_assigns_ids_and_returns_baseline() {
        let store = InMemoryUserStore::new();
        let (alice, baseline) = store.persist(user("alice")).unwrap();
        let (bob, _) = store.persist(user("bob")).unwrap();

        assert_eq!(alice.uid, Some(UserId::new(1)));
        assert_eq!(bob.uid, Some(UserId::new(2)));
        assert_eq!(baseline.uid(), alice.uid);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn stored_copy_is_independent_of_caller() {
        let store = InMemoryUserStore::new();
        let (mut alice, _) = store.persist(user("alice")).unwrap();
        alice.username = "changed".into();

        let stored = store.find_by_id(UserId::new(1)).unwrap().unwrap();
        assert_eq!(stored.username, "alice");
        assert_eq!(
            store.snapshot_baseline(UserId::new(1)).unwrap(),
            Snapshot::capture(&stored)
        );
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let store = InMemoryUserStore::new();
        store.persist(user("alice")).unwrap();
        let err = store.persist(user("alice")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn poisoned_lock_surfaces_as_persistence_error() {
        let store = std::sync::Arc::new(InMemoryUserStore::new());
        let writer = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = writer.inner.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(DomainError::Persistence(_))));
        assert!(matches!(store.is_empty(), Err(DomainError::Persistence(_))));
    }

    #[test]
    fn updating_unknown_user_fails() {
        let store = InMemoryUserStore::new();
        let mut ghost = user("ghost");
        ghost.uid = Some(UserId::new(99));
        assert!(matches!(store.persist(ghost), Err(DomainError::NotFound(_))));
        assert!(store.snapshot_baseline(UserId::new(99)).is_err());
    }
}
