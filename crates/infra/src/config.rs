//! Configuration loading and representation.
//!
//! Settings come from an optional TOML file, overridden by `MEMBERKIT__*`
//! environment variables (`__` separates nested keys, e.g.
//! `MEMBERKIT__HASH_STRATEGY=sha1`).

use std::path::Path;

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};

use memberkit_accounts::RegistrationSettings;

pub const ENV_PREFIX: &str = "MEMBERKIT";

/// Load settings from `path` (if given and present) and the environment.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<RegistrationSettings> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
    }
    let settings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .context("failed to read registration settings")?
        .try_deserialize::<RegistrationSettings>()
        .context("invalid registration settings")?;

    validate(&settings)?;
    tracing::info!(
        hash_strategy = %settings.hash_strategy,
        fill_email_with_username = settings.fill_email_with_username,
        "loaded registration settings"
    );
    Ok(settings)
}

/// Parse settings from a TOML document (no environment overrides).
pub fn settings_from_toml(toml: &str) -> anyhow::Result<RegistrationSettings> {
    let settings = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .context("failed to parse registration settings")?
        .try_deserialize::<RegistrationSettings>()
        .context("invalid registration settings")?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &RegistrationSettings) -> anyhow::Result<()> {
    settings.autogenerate.username.validate("username")?;
    settings.autogenerate.password.validate("password")?;
    if settings.hash_strategy.is_legacy() {
        tracing::warn!(
            hash_strategy = %settings.hash_strategy,
            "legacy password hash strategy configured"
        );
    }
    Ok(())
}
