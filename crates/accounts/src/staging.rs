//! Staging of pending change requests.

use thiserror::Error;

use memberkit_core::DomainError;

use crate::change_request::{self, PayloadError};
use crate::diff::PropertyDiff;
use crate::property::Property;
use crate::snapshot::Snapshot;
use crate::user::UserEntity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StagingError {
    #[error("diff names unknown property '{0}'")]
    UnknownProperty(String),

    #[error("baseline has no value for property '{0}'")]
    MissingBaseline(String),

    #[error(transparent)]
    Mutator(#[from] DomainError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Reverts a user to its baseline and records the diff as a pending change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeRequestStager;

impl ChangeRequestStager {
    pub fn new() -> Self {
        Self
    }

    /// Roll `user` back to `baseline` and store `diff` on it.
    ///
    /// Group membership is always restored from the baseline, whether or
    /// not it appears in the diff. Every other property named in the diff is
    /// reset through its mutator; a name without one is an error.
    pub fn stage(
        &self,
        mut user: UserEntity,
        diff: &PropertyDiff,
        baseline: &Snapshot,
    ) -> Result<UserEntity, StagingError> {
        user.set_usergroups(baseline.usergroups().to_vec());

        for name in diff.names() {
            let property = Property::from_name(name)
                .ok_or_else(|| StagingError::UnknownProperty(name.to_string()))?;
            if property == Property::Usergroup {
                continue;
            }
            let old = baseline
                .get(property)
                .cloned()
                .ok_or_else(|| StagingError::MissingBaseline(name.to_string()))?;
            property.write(&mut user, old)?;
        }

        let payload = change_request::encode(diff)?;
        if !payload.is_empty() {
            user.change_request = Some(payload);
        }

        tracing::info!(
            uid = ?user.uid,
            properties = diff.len(),
            "staged user changes for approval"
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use memberkit_core::{GroupId, UserId};

    use super::*;
    use crate::diff::{DiffValue, EntityDiffer, PropertyChange};
    use crate::user::GroupRef;

    fn persisted_alice() -> UserEntity {
        let mut user = UserEntity::new();
        user.uid = Some(UserId::new(1));
        user.username = "alice".into();
        user.email = "a@x.com".into();
        user.add_usergroup(GroupRef::new(1, "Members"));
        user.add_usergroup(GroupRef::new(2, "Editors"));
        user
    }

    #[test]
    fn stage_reverts_and_records_changes_in_order() {
        let mut user = persisted_alice();
        let baseline = Snapshot::capture(&user);

        user.username = "alice2".into();
        user.remove_usergroup(GroupId::new(2));
        user.add_usergroup(GroupRef::new(3, "Authors"));

        let diff = EntityDiffer::new().diff(&baseline, &user);
        let staged = ChangeRequestStager::new().stage(user, &diff, &baseline).unwrap();

        assert_eq!(staged.username, "alice");
        assert_eq!(staged.usergroup_ids(), vec![GroupId::new(1), GroupId::new(2)]);

        let payload = staged.change_request.as_deref().unwrap();
        let username_at = payload.find("<username").unwrap();
        let groups_at = payload.find("<usergroup").unwrap();
        assert!(username_at < groups_at);
        assert_eq!(payload.matches("<username").count(), 1);
        assert_eq!(payload.matches("<usergroup").count(), 1);

        assert_eq!(change_request::decode(payload).unwrap(), diff);
    }

    #[test]
    fn groups_are_restored_even_when_not_in_diff() {
        let mut user = persisted_alice();
        let baseline = Snapshot::capture(&user);
        user.remove_all_usergroups();

        let staged = ChangeRequestStager::new()
            .stage(user, &PropertyDiff::new(), &baseline)
            .unwrap();
        assert_eq!(staged.usergroups(), baseline.usergroups());
    }

    #[test]
    fn empty_diff_is_a_no_op() {
        let user = persisted_alice();
        let baseline = Snapshot::capture(&user);

        let staged = ChangeRequestStager::new()
            .stage(user.clone(), &PropertyDiff::new(), &baseline)
            .unwrap();
        assert_eq!(staged, user);
        assert_eq!(staged.change_request, None);
    }

    #[test]
    fn unknown_property_fails_loudly() {
        let user = persisted_alice();
        let baseline = Snapshot::capture(&user);
        let mut diff = PropertyDiff::new();
        diff.insert(
            "shoeSize",
            PropertyChange {
                old: DiffValue::Int(40),
                new: DiffValue::Int(41),
            },
        );

        let err = ChangeRequestStager::new().stage(user, &diff, &baseline).unwrap_err();
        assert_eq!(err, StagingError::UnknownProperty("shoeSize".into()));
    }

    #[test]
    fn read_only_property_fails_loudly() {
        let mut user = persisted_alice();
        let baseline = Snapshot::capture(&user);
        user.is_online = true;

        let diff = EntityDiffer::with_ignored(Vec::<String>::new()).diff(&baseline, &user);
        let err = ChangeRequestStager::new().stage(user, &diff, &baseline).unwrap_err();
        assert!(matches!(err, StagingError::Mutator(DomainError::Contract(_))));
    }

    #[test]
    fn timestamps_and_flags_are_reverted() {
        let mut user = persisted_alice();
        let born = Utc.with_ymd_and_hms(1990, 5, 17, 0, 0, 0).unwrap();
        user.date_of_birth = Some(born);
        let baseline = Snapshot::capture(&user);

        user.date_of_birth = None;
        user.terms = true;
        user.gender = 1;

        let diff = EntityDiffer::new().diff(&baseline, &user);
        let staged = ChangeRequestStager::new().stage(user, &diff, &baseline).unwrap();

        assert_eq!(staged.date_of_birth, Some(born));
        assert!(!staged.terms);
        assert_eq!(staged.gender, 0);
    }

    fn arb_edit() -> impl Strategy<Value = (Option<String>, Option<String>, Option<i64>, Option<bool>, Vec<u64>)> {
        (
            proptest::option::of("[a-z]{0,8}"),
            proptest::option::of("[a-z]{1,8}@x\\.com"),
            proptest::option::of(0i64..3),
            proptest::option::of(any::<bool>()),
            proptest::collection::vec(1u64..6, 0..4),
        )
    }

    proptest! {
        /// Staging the diff of any edit rolls the user back completely.
        #[test]
        fn staging_rolls_back_completely((username, email, gender, terms, groups) in arb_edit()) {
            let mut user = persisted_alice();
            let baseline = Snapshot::capture(&user);

            if let Some(v) = username { user.username = v; }
            if let Some(v) = email { user.email = v; }
            if let Some(v) = gender { user.gender = v; }
            if let Some(v) = terms { user.terms = v; }
            if !groups.is_empty() {
                user.set_usergroups(groups.iter().map(|id| GroupRef::new(*id, format!("G{id}"))).collect());
            }

            let differ = EntityDiffer::new();
            let diff = differ.diff(&baseline, &user);
            let staged = ChangeRequestStager::new().stage(user, &diff, &baseline).unwrap();

            prop_assert!(differ.diff(&baseline, &staged).is_empty());
            prop_assert_eq!(staged.change_request.is_some(), !diff.is_empty());
        }
    }
}
