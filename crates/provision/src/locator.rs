//! Install path and download URL construction.

use crate::config::ReleaseSource;
use crate::platform::PlatformId;
use std::path::{Path, PathBuf};

/// Where the binary is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// Name of the executable.
    pub binary_name: String,
    /// Release version.
    pub version: String,
    /// Directory holding the executable.
    pub install_dir: PathBuf,
    /// `install_dir/binary_name`.
    pub install_path: PathBuf,
}

impl InstallTarget {
    /// Create a target for `binary_name` inside `install_dir`.
    #[must_use]
    pub fn new(
        binary_name: impl Into<String>,
        version: impl Into<String>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        let binary_name = binary_name.into();
        let install_dir = install_dir.into();
        Self {
            install_path: install_dir.join(&binary_name),
            binary_name,
            version: version.into(),
            install_dir,
        }
    }

    /// Whether anything other than a directory sits at the install path.
    ///
    /// The entry itself is inspected, so a symlink counts as present even
    /// when its target is missing.
    #[must_use]
    pub fn is_present(&self) -> bool {
        std::fs::symlink_metadata(&self.install_path).is_ok_and(|meta| !meta.is_dir())
    }

    /// The install path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.install_path
    }
}

/// A release asset URL for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifactRef {
    /// Fully qualified download URL.
    pub url: String,
}

impl RemoteArtifactRef {
    /// Build the download URL for `target` on `platform`.
    ///
    /// `<base>/<owner>/<repo>/releases/download/v<version>/<binary>-<platform>`
    #[must_use]
    pub fn locate(source: &ReleaseSource, target: &InstallTarget, platform: PlatformId) -> Self {
        let url = format!(
            "{}/{}/releases/download/v{}/{}",
            source.base_url.trim_end_matches('/'),
            source.repository.trim_matches('/'),
            target.version,
            asset_name(&target.binary_name, platform)
        );
        Self { url }
    }
}

/// Release asset name for a binary on a platform, e.g. `env-cleaner-linux-x64`.
#[must_use]
pub fn asset_name(binary_name: &str, platform: PlatformId) -> String {
    format!("{binary_name}-{platform}")
}
