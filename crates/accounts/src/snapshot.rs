//! Clean baseline of a persisted user.

use memberkit_core::UserId;

use crate::property::{Property, PropertyValue};
use crate::user::{GroupRef, UserEntity};

/// Immutable copy of every tracked property, captured when a user is loaded
/// or persisted. Later edits to the live entity never reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    uid: Option<UserId>,
    values: Vec<(Property, PropertyValue)>,
}

impl Snapshot {
    pub fn capture(user: &UserEntity) -> Self {
        Self {
            uid: user.uid,
            values: Property::ALL
                .iter()
                .map(|p| (*p, p.read(user)))
                .collect(),
        }
    }

    pub fn uid(&self) -> Option<UserId> {
        self.uid
    }

    pub fn get(&self, property: Property) -> Option<&PropertyValue> {
        self.values
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, v)| v)
    }

    /// Group membership at capture time.
    pub fn usergroups(&self) -> &[GroupRef] {
        match self.get(Property::Usergroup) {
            Some(PropertyValue::Groups(groups)) => groups,
            _ => &[],
        }
    }

    /// Iterate captured properties in detection order.
    pub fn iter(&self) -> impl Iterator<Item = (Property, &PropertyValue)> {
        self.values.iter().map(|(p, v)| (*p, v))
    }
}
