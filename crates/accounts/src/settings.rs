//! Registration settings consumed by provisioning and the account service.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use memberkit_auth::{CredentialSpec, HashStrategy};
use memberkit_core::{GroupId, StoragePartition};

/// Workflow a user is being provisioned or updated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    New,
    Edit,
    Invitation,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::New => "new",
            Workflow::Edit => "edit",
            Workflow::Invitation => "invitation",
        }
    }
}

impl core::fmt::Display for Workflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential specs used when a username or password is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutogenerateSettings {
    pub username: CredentialSpec,
    pub password: CredentialSpec,
}

impl Default for AutogenerateSettings {
    fn default() -> Self {
        Self {
            username: CredentialSpec::new(10),
            password: CredentialSpec::new(16)
                .with_upper_case()
                .with_special_characters(),
        }
    }
}

/// Group ids that replace a user's memberships, per workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupOverrides {
    #[serde(deserialize_with = "group_ids")]
    pub new: Vec<GroupId>,
    #[serde(deserialize_with = "group_ids")]
    pub edit: Vec<GroupId>,
    #[serde(deserialize_with = "group_ids")]
    pub invitation: Vec<GroupId>,
}

impl GroupOverrides {
    pub fn for_workflow(&self, workflow: Workflow) -> &[GroupId] {
        match workflow {
            Workflow::New => &self.new,
            Workflow::Edit => &self.edit,
            Workflow::Invitation => &self.invitation,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationSettings {
    pub autogenerate: AutogenerateSettings,
    #[serde(alias = "hashStrategy")]
    pub hash_strategy: HashStrategy,
    /// Mirror the (possibly generated) username into the email field.
    #[serde(alias = "fillEmailWithUsername")]
    pub fill_email_with_username: bool,
    #[serde(alias = "overrideUserGroup")]
    pub override_user_group: GroupOverrides,
    /// Partitions a user record may live in to be logged in automatically.
    #[serde(alias = "storagePids")]
    pub login_storage_partitions: Vec<StoragePartition>,
}

impl RegistrationSettings {
    pub fn group_override(&self, workflow: Workflow) -> &[GroupId] {
        self.override_user_group.for_workflow(workflow)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GroupList {
    List(Vec<u64>),
    Single(u64),
    Csv(String),
}

/// Accepts `[1, 2]`, `1` or the legacy `"1, 2"` form.
fn group_ids<'de, D>(deserializer: D) -> Result<Vec<GroupId>, D::Error>
where
    D: Deserializer<'de>,
{
    match GroupList::deserialize(deserializer)? {
        GroupList::List(ids) => Ok(ids.into_iter().map(GroupId::new).collect()),
        GroupList::Single(id) => Ok(vec![GroupId::new(id)]),
        GroupList::Csv(csv) => csv
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(GroupId::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_registration_form() {
        let settings = RegistrationSettings::default();
        assert_eq!(settings.autogenerate.username.length, 10);
        assert!(settings.autogenerate.password.add_special_characters);
        assert_eq!(settings.hash_strategy, HashStrategy::SaltedAdaptive);
        assert!(settings.group_override(Workflow::New).is_empty());
    }

    #[test]
    fn group_overrides_accept_legacy_csv() {
        let settings: RegistrationSettings = serde_json::from_str(
            r#"{"overrideUserGroup":{"new":"1, 3,","edit":[4],"invitation":7},"hashStrategy":"md5"}"#,
        )
        .unwrap();

        assert_eq!(
            settings.group_override(Workflow::New),
            &[GroupId::new(1), GroupId::new(3)]
        );
        assert_eq!(settings.group_override(Workflow::Edit), &[GroupId::new(4)]);
        assert_eq!(settings.group_override(Workflow::Invitation), &[GroupId::new(7)]);
        assert_eq!(settings.hash_strategy, HashStrategy::Md5);
    }

    #[test]
    fn invalid_group_id_is_rejected() {
        let result: Result<RegistrationSettings, _> =
            serde_json::from_str(r#"{"overrideUserGroup":{"new":"1,abc"}}"#);
        assert!(result.is_err());
    }
}
