//! The install pipeline: acquire a prebuilt binary, else build it.

use crate::acquire::{AcquisitionEngine, AcquisitionOutcome, DownloadFailure};
use crate::config::InstallConfig;
use crate::error::Result;
use crate::fallback::{BuildOutcome, CargoBuilder, FallbackBuilder};
use crate::platform::PlatformId;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// How the binary ended up at the install path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    /// It was already installed.
    AlreadyPresent,
    /// It was downloaded directly.
    Downloaded,
    /// It was downloaded after one redirect.
    RedirectedThenDownloaded,
    /// The download failed but a bundled binary was found.
    PreStaged,
    /// The download failed and it was built from source.
    BuiltFromSource,
}

impl InstallOutcome {
    /// Short human-readable description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::AlreadyPresent => "already installed",
            Self::Downloaded | Self::RedirectedThenDownloaded => "downloaded",
            Self::PreStaged => "bundled",
            Self::BuiltFromSource => "built from source",
        }
    }
}

impl From<BuildOutcome> for InstallOutcome {
    fn from(outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::PreStaged => Self::PreStaged,
            BuildOutcome::Built => Self::BuiltFromSource,
        }
    }
}

/// Summary of a successful installation.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    /// Platform the binary was selected for.
    pub platform: PlatformId,
    /// Executable name.
    pub binary_name: String,
    /// Release version.
    pub version: String,
    /// Where the binary now lives.
    pub install_path: PathBuf,
    /// Release asset URL that was (or would have been) downloaded.
    pub url: String,
    /// How the binary was obtained.
    pub outcome: InstallOutcome,
    /// Why the download was abandoned, when the fallback ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<DownloadFailure>,
}

impl fmt::Display for InstallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) {}: {}",
            self.binary_name,
            self.version,
            self.platform,
            self.outcome.describe(),
            self.install_path.display()
        )
    }
}

/// Drives one installation.
pub struct Installer<B = CargoBuilder> {
    config: InstallConfig,
    engine: AcquisitionEngine,
    builder: B,
}

impl Installer<CargoBuilder> {
    /// Create an installer that falls back to `cargo build --release`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: InstallConfig) -> Result<Self> {
        let builder = CargoBuilder::new(config.build.clone());
        Self::with_builder(config, builder)
    }
}

impl<B: FallbackBuilder> Installer<B> {
    /// Create an installer with a custom fallback builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_builder(config: InstallConfig, builder: B) -> Result<Self> {
        let engine = AcquisitionEngine::new(&config.http, config.release.clone())?;
        Ok(Self {
            config,
            engine,
            builder,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// The fallback builder.
    #[must_use]
    pub const fn builder(&self) -> &B {
        &self.builder
    }

    /// Install the binary for `platform`.
    ///
    /// The fallback builder runs exactly once if, and only if, acquisition
    /// reports a failed download.
    ///
    /// # Errors
    ///
    /// Returns local filesystem errors from acquisition and any error from
    /// the fallback builder.
    pub async fn run(&self, platform: PlatformId) -> Result<InstallReport> {
        let target = self.config.target();
        let url = self.engine.artifact(&target, platform).url;

        let (outcome, fallback_reason) = match self.engine.acquire(&target, platform).await? {
            AcquisitionOutcome::AlreadyPresent => (InstallOutcome::AlreadyPresent, None),
            AcquisitionOutcome::Downloaded => (InstallOutcome::Downloaded, None),
            AcquisitionOutcome::RedirectedThenDownloaded => {
                (InstallOutcome::RedirectedThenDownloaded, None)
            }
            AcquisitionOutcome::Failed(failure) => {
                warn!(
                    %failure,
                    "Prebuilt binary unavailable, falling back to a source build"
                );
                let built = self.builder.build_from_source(&target).await?;
                (built.into(), Some(failure))
            }
        };

        let report = InstallReport {
            platform,
            binary_name: target.binary_name,
            version: target.version,
            install_path: target.install_path,
            url,
            outcome,
            fallback_reason,
        };
        info!(outcome = ?report.outcome, path = %report.install_path.display(), "Install complete");
        Ok(report)
    }
}
