//! `env-cleaner-install`: the npm postinstall step for env-cleaner.
//!
//! Resolves the host platform, builds an [`InstallConfig`] from the command
//! line and `package.json`, and hands it to the provisioning [`Installer`].

#![warn(missing_docs)]

pub mod cli;
pub mod tracing;

use crate::cli::{Cli, CliError};
use env_cleaner_provision::{InstallReport, Installer, PlatformId};

/// Run one installation as described by `cli`.
///
/// Platform resolution happens first; an unsupported host fails before any
/// file or network access.
///
/// # Errors
///
/// Returns [`CliError::Config`] for unsupported platforms and bad
/// configuration, and [`CliError::Install`] when neither the download nor the
/// source build produced a binary.
pub async fn run(cli: &Cli) -> Result<InstallReport, CliError> {
    let host = cli.host_facts();
    let platform = PlatformId::resolve(&host)?;
    let config = cli.install_config()?;

    ::tracing::info!(
        %host,
        %platform,
        version = %config.version,
        install_dir = %config.install_dir.display(),
        "Installing {}",
        config.binary_name
    );

    let installer = Installer::new(config)?;
    Ok(installer.run(platform).await?)
}
