//! Initial account provisioning: credentials and group overrides.

use thiserror::Error;

use memberkit_auth::credentials;
use memberkit_core::DomainError;

use crate::settings::{RegistrationSettings, Workflow};
use crate::store::GroupStore;
use crate::user::UserEntity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Fills missing credentials and applies group-override policy.
///
/// Each step is skipped when its precondition is already satisfied, so
/// provisioning twice changes nothing the second time (apart from group
/// overrides being re-resolved).
#[derive(Debug, Clone)]
pub struct IdentityProvisioner<G> {
    groups: G,
}

impl<G> IdentityProvisioner<G>
where
    G: GroupStore,
{
    pub fn new(groups: G) -> Self {
        Self { groups }
    }

    pub fn provision(
        &self,
        mut user: UserEntity,
        settings: &RegistrationSettings,
        workflow: Workflow,
    ) -> Result<UserEntity, ProvisionError> {
        fill_missing_credentials(&mut user, settings)?;
        mirror_username_into_email(&mut user, settings);
        self.override_user_groups(&mut user, settings, workflow)?;

        tracing::info!(
            workflow = %workflow,
            username = %user.username,
            generated_password = user.password_auto_generated().is_some(),
            groups = user.usergroups().len(),
            "provisioned user"
        );
        Ok(user)
    }

    /// Replace all memberships with the override list of `workflow`, if any.
    pub fn override_user_groups(
        &self,
        user: &mut UserEntity,
        settings: &RegistrationSettings,
        workflow: Workflow,
    ) -> Result<(), ProvisionError> {
        let overrides = settings.group_override(workflow);
        if overrides.is_empty() {
            return Ok(());
        }

        let mut resolved = Vec::with_capacity(overrides.len());
        for id in overrides {
            let group = self.groups.find_by_id(*id)?.ok_or_else(|| {
                DomainError::configuration(format!(
                    "overrideUserGroup.{workflow} references unknown group {id}"
                ))
            })?;
            resolved.push(group);
        }

        user.remove_all_usergroups();
        for group in resolved {
            user.add_usergroup(group);
        }
        Ok(())
    }
}

/// Generate a username and/or password when they are empty.
///
/// A generated username is replaced by the email when one is present; an
/// explicitly supplied username is never touched.
pub fn fill_missing_credentials(
    user: &mut UserEntity,
    settings: &RegistrationSettings,
) -> Result<(), ProvisionError> {
    let autogenerate = &settings.autogenerate;

    if user.username.is_empty() {
        if user.email.is_empty() {
            autogenerate.username.validate("username")?;
            user.username = credentials::generate(&autogenerate.username);
        } else {
            user.username = user.email.clone();
        }
    }

    if user.password.is_empty() {
        autogenerate.password.validate("password")?;
        let password = credentials::generate(&autogenerate.password);
        user.password = password.clone();
        user.set_password_auto_generated(password);
    }
    Ok(())
}

pub fn mirror_username_into_email(user: &mut UserEntity, settings: &RegistrationSettings) {
    if settings.fill_email_with_username {
        user.email = user.username.clone();
    }
}
