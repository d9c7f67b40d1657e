use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use memberkit_auth::{LoginConstraints, SessionHandle, SessionId, SessionStore};
use memberkit_core::{DomainError, UserId};

use super::poisoned;

/// In-memory session store. Every `create_session` issues a new id.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<SessionId, (SessionHandle, LoginConstraints)>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constraints a session was created with.
    pub fn constraints(&self, id: &SessionId) -> Result<Option<LoginConstraints>, DomainError> {
        let map = self.inner.read().map_err(|_| poisoned("session store"))?;
        Ok(map.get(id).map(|(_, c)| c.clone()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(
        &self,
        user_id: UserId,
        constraints: &LoginConstraints,
    ) -> Result<SessionHandle, DomainError> {
        let handle = SessionHandle {
            id: SessionId::new(),
            user_id,
            created_at: Utc::now(),
        };
        let mut map = self.inner.write().map_err(|_| poisoned("session store"))?;
        map.insert(handle.id, (handle.clone(), constraints.clone()));
        Ok(handle)
    }

    fn find_session(&self, id: &SessionId) -> Result<Option<SessionHandle>, DomainError> {
        let map = self.inner.read().map_err(|_| poisoned("session store"))?;
        Ok(map.get(id).map(|(h, _)| h.clone()))
    }

    fn sessions_for_user(&self, user_id: UserId) -> Result<Vec<SessionHandle>, DomainError> {
        let map = self.inner.read().map_err(|_| poisoned("session store"))?;
        Ok(map
            .values()
            .filter(|(h, _)| h.user_id == user_id)
            .map(|(h, _)| h.clone())
            .collect())
    }

    fn remove_sessions_for_user(&self, user_id: UserId) -> Result<usize, DomainError> {
        let mut map = self.inner.write().map_err(|_| poisoned("session store"))?;
        let before = map.len();
        map.retain(|_, (h, _)| h.user_id != user_id);
        Ok(before - map.len())
    }
}
