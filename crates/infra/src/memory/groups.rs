use std::collections::HashMap;
use std::sync::RwLock;

use memberkit_accounts::{GroupRef, GroupStore};
use memberkit_core::{DomainError, GroupId};

use super::poisoned;

/// In-memory group store.
#[derive(Debug, Default)]
pub struct InMemoryGroupStore {
    inner: RwLock<HashMap<GroupId, GroupRef>>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(groups: impl IntoIterator<Item = GroupRef>) -> Self {
        Self {
            inner: RwLock::new(groups.into_iter().map(|g| (g.id, g)).collect()),
        }
    }

    pub fn insert(&self, group: GroupRef) -> Result<(), DomainError> {
        let mut map = self.inner.write().map_err(|_| poisoned("group store"))?;
        map.insert(group.id, group);
        Ok(())
    }
}

impl GroupStore for InMemoryGroupStore {
    fn find_by_id(&self, id: GroupId) -> Result<Option<GroupRef>, DomainError> {
        let map = self.inner.read().map_err(|_| poisoned("group store"))?;
        Ok(map.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_inserted_groups() {
        let store = InMemoryGroupStore::with_groups([GroupRef::new(1, "Members")]);
        store.insert(GroupRef::new(2, "Editors")).unwrap();

        assert_eq!(
            store.find_by_id(GroupId::new(2)).unwrap(),
            Some(GroupRef::new(2, "Editors"))
        );
        assert_eq!(store.find_by_id(GroupId::new(3)).unwrap(), None);
    }
}
