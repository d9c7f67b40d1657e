//! Field-level change detection against a clean baseline.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::property::{Property, PropertyValue};
use crate::snapshot::Snapshot;
use crate::user::{GroupRef, UserEntity};

/// Properties the differ skips unless told otherwise.
pub const DEFAULT_IGNORED: &[Property] = &[
    Property::ChangeRequest,
    Property::IgnoreDirty,
    Property::IsOnline,
    Property::LastLogin,
];

/// One side of a detected change.
///
/// Timestamps are reduced to epoch seconds and collections to their joined
/// titles before they land here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiffValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl DiffValue {
    fn reduce(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Null => DiffValue::Null,
            PropertyValue::Bool(v) => DiffValue::Bool(*v),
            PropertyValue::Int(v) => DiffValue::Int(*v),
            PropertyValue::Text(v) => DiffValue::Text(v.clone()),
            PropertyValue::Timestamp(t) => DiffValue::Int(t.timestamp()),
            PropertyValue::Groups(groups) => DiffValue::Text(join_titles(groups)),
        }
    }
}

impl core::fmt::Display for DiffValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DiffValue::Null => Ok(()),
            DiffValue::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            DiffValue::Int(v) => write!(f, "{v}"),
            DiffValue::Text(v) => f.write_str(v),
        }
    }
}

/// Old and new value of a changed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub old: DiffValue,
    pub new: DiffValue,
}

/// Changed properties keyed by property name, in detection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyDiff(IndexMap<String, PropertyChange>);

impl PropertyDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, change: PropertyChange) {
        self.0.insert(name.into(), change);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyChange> {
        self.0.get(name)
    }

    pub fn contains(&self, property: Property) -> bool {
        self.0.contains_key(property.name())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyChange)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Structured rendering of the diff.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Compares a live user against its baseline.
#[derive(Debug, Clone)]
pub struct EntityDiffer {
    ignored: HashSet<String>,
}

impl Default for EntityDiffer {
    fn default() -> Self {
        Self::with_ignored(DEFAULT_IGNORED.iter().map(|p| p.name()))
    }
}

impl EntityDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignored<I, S>(ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: ignored.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.ignored.insert(name.into());
        self
    }

    pub fn is_ignored(&self, property: Property) -> bool {
        self.ignored.contains(property.name())
    }

    /// Detect changed properties, always reported as `{old: baseline, new: current}`.
    pub fn diff(&self, baseline: &Snapshot, current: &UserEntity) -> PropertyDiff {
        let mut diff = PropertyDiff::new();

        for (property, old) in baseline.iter() {
            if self.is_ignored(property) {
                continue;
            }
            let new = property.read(current);
            if let Some(change) = compare(old, &new) {
                diff.insert(property.name(), change);
            }
        }

        tracing::debug!(changed = diff.len(), uid = ?baseline.uid(), "computed user diff");
        diff
    }
}

fn compare(old: &PropertyValue, new: &PropertyValue) -> Option<PropertyChange> {
    let changed = match (old, new) {
        (PropertyValue::Timestamp(a), PropertyValue::Timestamp(b)) => {
            a.timestamp() != b.timestamp()
        }
        (PropertyValue::Groups(a), PropertyValue::Groups(b)) => join_titles(a) != join_titles(b),
        (a, b) if a.is_composite() && b.is_composite() => DiffValue::reduce(a) != DiffValue::reduce(b),
        (a, b) => a != b,
    };

    changed.then(|| PropertyChange {
        old: DiffValue::reduce(old),
        new: DiffValue::reduce(new),
    })
}

fn sorted(groups: &[GroupRef]) -> Vec<&GroupRef> {
    let mut groups: Vec<&GroupRef> = groups.iter().collect();
    groups.sort_by_key(|g| g.id);
    groups
}

/// Canonical rendering of a membership collection: titles ordered by group id.
pub fn join_titles(groups: &[GroupRef]) -> String {
    sorted(groups)
        .into_iter()
        .map(|g| g.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn alice() -> UserEntity {
        let mut user = UserEntity::new();
        user.username = "alice".into();
        user.email = "a@x.com".into();
        user.add_usergroup(GroupRef::new(1, "Members"));
        user.add_usergroup(GroupRef::new(2, "Editors"));
        user
    }

    #[test]
    fn unchanged_entity_has_empty_diff() {
        let user = alice();
        let baseline = Snapshot::capture(&user);
        assert!(EntityDiffer::new().diff(&baseline, &user).is_empty());
    }

    #[test]
    fn detects_scalar_and_group_changes_in_order() {
        let mut user = alice();
        let baseline = Snapshot::capture(&user);

        user.username = "alice2".into();
        user.remove_usergroup(memberkit_core::GroupId::new(2));
        user.add_usergroup(GroupRef::new(3, "Authors"));

        let diff = EntityDiffer::new().diff(&baseline, &user);
        assert_eq!(diff.names().collect::<Vec<_>>(), vec!["username", "usergroup"]);
        assert_eq!(
            diff.get("username"),
            Some(&PropertyChange {
                old: DiffValue::Text("alice".into()),
                new: DiffValue::Text("alice2".into()),
            })
        );
        assert_eq!(
            diff.get("usergroup"),
            Some(&PropertyChange {
                old: DiffValue::Text("Members, Editors".into()),
                new: DiffValue::Text("Members, Authors".into()),
            })
        );
        assert!(diff.get("email").is_none());
    }

    #[test]
    fn groups_compare_by_canonical_titles() {
        let mut user = UserEntity::new();
        user.add_usergroup(GroupRef::new(1, "Members"));
        let baseline = Snapshot::capture(&user);

        let mut same_title = user.clone();
        same_title.set_usergroups(vec![GroupRef::new(2, "Members")]);
        assert!(EntityDiffer::new().diff(&baseline, &same_title).is_empty());

        let mut renamed = user.clone();
        renamed.set_usergroups(vec![GroupRef::new(1, "Subscribers")]);
        let diff = EntityDiffer::new().diff(&baseline, &renamed);
        assert_eq!(
            diff.get("usergroup"),
            Some(&PropertyChange {
                old: DiffValue::Text("Members".into()),
                new: DiffValue::Text("Subscribers".into()),
            })
        );
    }

    #[test]
    fn group_order_is_irrelevant() {
        let user = alice();
        let baseline = Snapshot::capture(&user);

        let mut reordered = user.clone();
        reordered.set_usergroups(vec![GroupRef::new(2, "Editors"), GroupRef::new(1, "Members")]);

        assert!(EntityDiffer::new().diff(&baseline, &reordered).is_empty());
    }

    #[test]
    fn timestamps_compare_and_report_epoch_seconds() {
        let mut user = alice();
        user.date_of_birth = Some(Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
        let baseline = Snapshot::capture(&user);

        // Sub-second drift is not a change.
        user.date_of_birth = user
            .date_of_birth
            .map(|t| t + chrono::Duration::milliseconds(250));
        assert!(EntityDiffer::new().diff(&baseline, &user).is_empty());

        user.date_of_birth = Some(Utc.with_ymd_and_hms(1991, 1, 1, 0, 0, 0).unwrap());
        let diff = EntityDiffer::new().diff(&baseline, &user);
        assert_eq!(
            diff.get("dateOfBirth"),
            Some(&PropertyChange {
                old: DiffValue::Int(631_152_000),
                new: DiffValue::Int(662_688_000),
            })
        );
    }

    #[test]
    fn timestamp_set_from_null_is_a_change() {
        let mut user = alice();
        let baseline = Snapshot::capture(&user);
        user.date_of_birth = Some(Utc.timestamp_opt(100, 0).unwrap());

        let diff = EntityDiffer::new().diff(&baseline, &user);
        assert_eq!(
            diff.get("dateOfBirth"),
            Some(&PropertyChange {
                old: DiffValue::Null,
                new: DiffValue::Int(100),
            })
        );
    }

    #[test]
    fn system_properties_are_ignored_by_default() {
        let mut user = alice();
        let baseline = Snapshot::capture(&user);

        user.is_online = true;
        user.last_login = Some(Utc::now());
        user.ignore_dirty = true;
        user.change_request = Some("<changes />".into());

        assert!(EntityDiffer::new().diff(&baseline, &user).is_empty());
    }

    #[test]
    fn custom_ignore_list_is_honoured() {
        let mut user = alice();
        let baseline = Snapshot::capture(&user);
        user.password = "changed".into();
        user.is_online = true;

        let differ = EntityDiffer::with_ignored(["password"]);
        let diff = differ.diff(&baseline, &user);
        assert_eq!(diff.names().collect::<Vec<_>>(), vec!["isOnline"]);
    }

    #[test]
    fn json_rendering_keeps_detection_order() {
        let mut user = alice();
        let baseline = Snapshot::capture(&user);
        user.username = "bob".into();
        user.gender = 2;

        let diff = EntityDiffer::new().diff(&baseline, &user);
        let json = diff.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"username":{"old":"alice","new":"bob"},"gender":{"old":0,"new":2}}"#
        );
        assert_eq!(PropertyDiff::from_json(&json).unwrap(), diff);
    }
}
