//! Account flows: registration, profile updates and login.

use thiserror::Error;

use memberkit_auth::{HashError, PasswordHasher, SessionBridge, SessionError, SessionHandle, SessionId, SessionStore};
use memberkit_core::{DomainError, GroupId, UserId};

use crate::diff::{EntityDiffer, PropertyDiff};
use crate::property::Property;
use crate::provision::{IdentityProvisioner, ProvisionError};
use crate::settings::{RegistrationSettings, Workflow};
use crate::snapshot::Snapshot;
use crate::staging::{ChangeRequestStager, StagingError};
use crate::store::{GroupStore, UserStore};
use crate::user::UserEntity;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type AccountResult<T> = Result<T, AccountError>;

/// How an update reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Persist the changes right away.
    Direct,
    /// Revert the user and store the changes as a pending change request.
    RequiresApproval,
}

/// Result of a registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: UserEntity,
    pub baseline: Snapshot,
    /// Plaintext of a password generated during provisioning.
    pub generated_password: Option<String>,
}

/// Result of an update.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub user: UserEntity,
    pub baseline: Snapshot,
    pub diff: PropertyDiff,
    pub staged: bool,
}

/// Orchestrates provisioning, hashing, diffing, staging and login.
pub struct AccountService<U, G, S> {
    users: U,
    provisioner: IdentityProvisioner<G>,
    hasher: PasswordHasher,
    sessions: SessionBridge<S>,
    settings: RegistrationSettings,
    differ: EntityDiffer,
    stager: ChangeRequestStager,
}

impl<U, G, S> AccountService<U, G, S>
where
    U: UserStore,
    G: GroupStore,
    S: SessionStore,
{
    pub fn new(
        users: U,
        groups: G,
        sessions: S,
        hasher: PasswordHasher,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            users,
            provisioner: IdentityProvisioner::new(groups),
            hasher,
            sessions: SessionBridge::new(sessions),
            settings,
            differ: EntityDiffer::new(),
            stager: ChangeRequestStager::new(),
        }
    }

    pub fn with_differ(mut self, differ: EntityDiffer) -> Self {
        self.differ = differ;
        self
    }

    pub fn settings(&self) -> &RegistrationSettings {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionBridge<S> {
        &self.sessions
    }

    /// Provision, hash and persist a new user.
    pub fn register(&self, user: UserEntity, workflow: Workflow) -> AccountResult<Registration> {
        let mut user = self.provisioner.provision(user, &self.settings, workflow)?;
        let generated_password = user.password_auto_generated().map(str::to_string);

        user.password = self.hasher.hash(&user.password, self.settings.hash_strategy)?;
        let (user, baseline) = self.users.persist(user)?;

        tracing::info!(uid = ?user.uid, workflow = %workflow, "registered user");
        Ok(Registration {
            user,
            baseline,
            generated_password,
        })
    }

    /// Load a user together with its clean baseline.
    pub fn load(&self, id: UserId) -> AccountResult<(UserEntity, Snapshot)> {
        let user = self
            .users
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))?;
        let baseline = Snapshot::capture(&user);
        Ok((user, baseline))
    }

    /// Apply an in-memory edit of a persisted user.
    ///
    /// A changed password is hashed before diffing so a staged change request
    /// never carries plaintext.
    pub fn update(
        &self,
        mut user: UserEntity,
        baseline: &Snapshot,
        mode: UpdateMode,
    ) -> AccountResult<UpdateOutcome> {
        if user.uid.is_none() || user.uid != baseline.uid() {
            return Err(DomainError::contract("update requires the baseline of the same persisted user").into());
        }

        self.provisioner
            .override_user_groups(&mut user, &self.settings, Workflow::Edit)?;
        self.convert_password(&mut user, baseline)?;

        let diff = self.differ.diff(baseline, &user);
        if diff.is_empty() {
            tracing::debug!(uid = ?user.uid, "update without changes");
            return Ok(UpdateOutcome {
                user,
                baseline: baseline.clone(),
                diff,
                staged: false,
            });
        }

        let staged = mode == UpdateMode::RequiresApproval;
        let user = if staged {
            self.stager.stage(user, &diff, baseline)?
        } else {
            user
        };
        let (user, baseline) = self.users.persist(user)?;

        tracing::info!(uid = ?user.uid, changed = diff.len(), staged, "updated user");
        Ok(UpdateOutcome {
            user,
            baseline,
            diff,
            staged,
        })
    }

    /// Hash the live password if it differs from the baseline.
    pub fn convert_password(&self, user: &mut UserEntity, baseline: &Snapshot) -> AccountResult<()> {
        let current = Property::Password.read(user);
        if baseline.get(Property::Password) != Some(&current) {
            user.password = self.hasher.hash(&user.password, self.settings.hash_strategy)?;
        }
        Ok(())
    }

    /// Log a persisted user in, constrained to the configured partitions.
    pub fn login(&self, user: &UserEntity) -> AccountResult<SessionHandle> {
        let partitions = &self.settings.login_storage_partitions;
        Ok(self.sessions.login(user, Some(partitions.as_slice()))?)
    }

    /// User bound to `session_id`, if the session and the user exist.
    pub fn current_user(&self, session_id: &SessionId) -> AccountResult<Option<UserEntity>> {
        match self.sessions.current_user_id(session_id)? {
            Some(id) => Ok(self.users.find_by_id(id)?),
            None => Ok(None),
        }
    }

    pub fn current_usergroup_ids(&self, session_id: &SessionId) -> AccountResult<Vec<GroupId>> {
        Ok(self
            .current_user(session_id)?
            .map(|user| user.usergroup_ids())
            .unwrap_or_default())
    }
}
