//! Installation configuration.
//!
//! Everything the pipeline needs is gathered into an immutable
//! [`InstallConfig`] at process start and passed down explicitly.

use crate::locator::InstallTarget;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the installed executable.
pub const DEFAULT_BINARY_NAME: &str = "env-cleaner";

/// Host serving release downloads.
pub const DEFAULT_BASE_URL: &str = "https://github.com";

/// `owner/repo` publishing the releases.
pub const DEFAULT_REPOSITORY: &str = "jpwesselink/env-cleaner";

/// Build tool used for the source fallback.
pub const DEFAULT_BUILD_PROGRAM: &str = "cargo";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Where release assets are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    /// Scheme and host, e.g. `https://github.com`.
    pub base_url: String,
    /// `owner/repo` path segment.
    pub repository: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
        }
    }
}

/// HTTP client settings for the download.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed for a whole request, body included.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("env-cleaner-install/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Settings for building from source.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Build tool program (`cargo`).
    pub program: String,
    /// Directory the build runs in.
    pub source_dir: PathBuf,
    /// Cargo target directory; the binary is expected under `release/`.
    pub target_dir: PathBuf,
}

impl BuildSettings {
    /// Default build settings for a package rooted at `source_dir`.
    #[must_use]
    pub fn for_source_dir(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        Self {
            program: DEFAULT_BUILD_PROGRAM.to_string(),
            target_dir: source_dir.join("target"),
            source_dir,
        }
    }

    /// Path where a release build leaves `binary_name`.
    #[must_use]
    pub fn release_artifact(&self, binary_name: &str) -> PathBuf {
        self.target_dir
            .join("release")
            .join(format!("{binary_name}{}", std::env::consts::EXE_SUFFIX))
    }
}

/// Immutable configuration for one installation run.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Name of the installed executable.
    pub binary_name: String,
    /// Release version, without a leading `v`.
    pub version: String,
    /// Directory the binary is installed into.
    pub install_dir: PathBuf,
    /// Where release assets are downloaded from.
    pub release: ReleaseSource,
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Source build settings.
    pub build: BuildSettings,
}

impl InstallConfig {
    /// Create a configuration for a package rooted at `package_root`.
    ///
    /// The binary is installed into `<package_root>/bin` and the source
    /// fallback builds in `package_root`.
    #[must_use]
    pub fn new(version: impl Into<String>, package_root: &Path) -> Self {
        let version = version.into();
        let version = version.strip_prefix('v').unwrap_or(&version).to_string();
        Self {
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            version,
            install_dir: package_root.join("bin"),
            release: ReleaseSource::default(),
            http: HttpSettings::default(),
            build: BuildSettings::for_source_dir(package_root),
        }
    }

    /// Set the binary name.
    #[must_use]
    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    /// Set the install directory.
    #[must_use]
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    /// Set the release source.
    #[must_use]
    pub fn with_release(mut self, release: ReleaseSource) -> Self {
        self.release = release;
        self
    }

    /// Set the HTTP settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    /// Set the build settings.
    #[must_use]
    pub fn with_build(mut self, build: BuildSettings) -> Self {
        self.build = build;
        self
    }

    /// The install target described by this configuration.
    #[must_use]
    pub fn target(&self) -> InstallTarget {
        InstallTarget::new(&self.binary_name, &self.version, &self.install_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_package_root() {
        let config = InstallConfig::new("1.2.0", Path::new("/pkg"));
        assert_eq!(config.binary_name, "env-cleaner");
        assert_eq!(config.version, "1.2.0");
        assert_eq!(config.install_dir, PathBuf::from("/pkg/bin"));
        assert_eq!(config.build.program, "cargo");
        assert_eq!(config.build.source_dir, PathBuf::from("/pkg"));
        assert_eq!(config.build.target_dir, PathBuf::from("/pkg/target"));
        assert_eq!(config.release, ReleaseSource::default());
        assert_eq!(config.http.connect_timeout, Duration::from_secs(30));
        assert!(config.http.user_agent.starts_with("env-cleaner-install/"));
    }

    #[test]
    fn test_version_prefix_is_stripped() {
        let config = InstallConfig::new("v0.3.1", Path::new("/pkg"));
        assert_eq!(config.version, "0.3.1");
    }

    #[test]
    fn test_only_one_version_prefix_is_stripped() {
        let config = InstallConfig::new("vv1", Path::new("/pkg"));
        assert_eq!(config.version, "v1");

        let config = InstallConfig::new("1.0.0-dev", Path::new("/pkg"));
        assert_eq!(config.version, "1.0.0-dev");
    }

    #[test]
    fn test_target_path() {
        let config = InstallConfig::new("1.0.0", Path::new("/pkg"))
            .with_binary_name("tool")
            .with_install_dir("/opt/tool/bin");
        let target = config.target();
        assert_eq!(target.install_path, PathBuf::from("/opt/tool/bin/tool"));
        assert_eq!(target.version, "1.0.0");
    }

    #[test]
    fn test_release_artifact_path() {
        let build = BuildSettings::for_source_dir("/src");
        let expected = format!("env-cleaner{}", std::env::consts::EXE_SUFFIX);
        assert_eq!(
            build.release_artifact("env-cleaner"),
            PathBuf::from("/src/target/release").join(expected)
        );
    }
}
