//! `memberkit-accounts` — frontend user accounts.
//!
//! Change detection against a clean baseline, staging of pending change
//! requests, and provisioning of new accounts. Storage is reached through the
//! traits in [`store`].

pub mod change_request;
pub mod diff;
pub mod property;
pub mod provision;
pub mod service;
pub mod settings;
pub mod snapshot;
pub mod staging;
pub mod store;
pub mod user;

pub use change_request::PayloadError;
pub use diff::{DiffValue, EntityDiffer, PropertyChange, PropertyDiff, DEFAULT_IGNORED};
pub use property::{Property, PropertyValue};
pub use provision::{IdentityProvisioner, ProvisionError};
pub use service::{AccountError, AccountResult, AccountService, Registration, UpdateMode, UpdateOutcome};
pub use settings::{AutogenerateSettings, GroupOverrides, RegistrationSettings, Workflow};
pub use snapshot::Snapshot;
pub use staging::{ChangeRequestStager, StagingError};
pub use store::{GroupStore, UserStore};
pub use user::{GroupRef, UserEntity};
