//! Package metadata lookup.
//!
//! The release version to install is the version the package declares in its
//! `package.json`.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// The fields of `package.json` the installer reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    /// Package name.
    #[serde(default)]
    pub name: Option<String>,
    /// Package version.
    #[serde(default)]
    pub version: Option<String>,
}

impl PackageManifest {
    /// Path of the manifest inside `package_root`.
    #[must_use]
    pub fn path_in(package_root: &Path) -> PathBuf {
        package_root.join(MANIFEST_FILE)
    }

    /// Read and parse the manifest in `package_root`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing or is not valid JSON.
    pub fn load(package_root: &Path) -> Result<Self> {
        let path = Self::path_in(package_root);
        debug!(path = %path.display(), "Reading package manifest");

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::config(
                format!("Failed to read {}: {e}", path.display()),
                "Run the installer from the package root or pass --release-version",
            )
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::config(
                format!("Invalid {}: {e}", path.display()),
                "Fix the package manifest or pass --release-version",
            )
        })
    }

    /// The declared version.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the manifest declares no version.
    pub fn version(&self) -> Result<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::config(
                    format!(
                        "{MANIFEST_FILE} for '{}' has no version",
                        self.name.as_deref().unwrap_or("<unnamed>")
                    ),
                    "Add a \"version\" field or pass --release-version",
                )
            })
    }
}

/// Read the release version declared by the package in `package_root`.
///
/// # Errors
///
/// Returns a configuration error if the manifest is missing, malformed or has
/// no version.
pub fn read_package_version(package_root: &Path) -> Result<String> {
    let manifest = PackageManifest::load(package_root)?;
    manifest.version().map(str::to_string)
}
