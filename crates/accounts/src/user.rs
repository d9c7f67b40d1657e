//! Frontend user aggregate and group references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use memberkit_auth::Authenticatable;
use memberkit_core::{Entity, GroupId, StoragePartition, UserId};

/// Reference to a frontend user group owned by the group store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: GroupId,
    pub title: String,
}

impl GroupRef {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(id),
            title: title.into(),
        }
    }
}

/// Frontend user account.
///
/// # Invariants
/// - `usergroups` behaves as a set keyed by group id (insertion order carries
///   no meaning).
/// - `is_online` and `last_login` are maintained by the session layer and
///   are never diffed or staged.
/// - `password_auto_generated` is transient and never tracked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntity {
    pub uid: Option<UserId>,
    pub storage_partition: StoragePartition,

    pub username: String,
    pub password: String,
    pub email: String,
    usergroups: Vec<GroupRef>,

    pub name: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub address: String,
    pub telephone: String,
    pub fax: String,
    pub title: String,
    pub zip: String,
    pub city: String,
    pub country: String,
    pub www: String,
    pub company: String,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub gender: i64,
    pub terms: bool,
    pub disable: bool,

    pub change_request: Option<String>,
    pub ignore_dirty: bool,
    pub is_online: bool,
    pub last_login: Option<DateTime<Utc>>,

    #[serde(skip)]
    password_auto_generated: Option<String>,
}

impl UserEntity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usergroups(&self) -> &[GroupRef] {
        &self.usergroups
    }

    /// Add a group unless a group with the same id is already assigned.
    pub fn add_usergroup(&mut self, group: GroupRef) {
        if !self.usergroups.iter().any(|g| g.id == group.id) {
            self.usergroups.push(group);
        }
    }

    pub fn remove_usergroup(&mut self, id: GroupId) {
        self.usergroups.retain(|g| g.id != id);
    }

    pub fn remove_all_usergroups(&mut self) {
        self.usergroups.clear();
    }

    /// Replace the whole membership collection.
    pub fn set_usergroups(&mut self, groups: Vec<GroupRef>) {
        self.usergroups.clear();
        for group in groups {
            self.add_usergroup(group);
        }
    }

    pub fn usergroup_ids(&self) -> Vec<GroupId> {
        self.usergroups.iter().map(|g| g.id).collect()
    }

    /// Plaintext of a password generated during provisioning, kept after the
    /// live password has been hashed.
    pub fn password_auto_generated(&self) -> Option<&str> {
        self.password_auto_generated.as_deref()
    }

    pub fn set_password_auto_generated(&mut self, plaintext: impl Into<String>) {
        self.password_auto_generated = Some(plaintext.into());
    }

    pub fn has_pending_change_request(&self) -> bool {
        self.change_request.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl Entity for UserEntity {
    type Id = UserId;

    fn id(&self) -> Option<&Self::Id> {
        self.uid.as_ref()
    }
}

impl Authenticatable for UserEntity {
    fn user_id(&self) -> Option<UserId> {
        self.uid
    }

    fn storage_partition(&self) -> StoragePartition {
        self.storage_partition
    }

    fn is_disabled(&self) -> bool {
        self.disable
    }
}
