//! Post-install provisioning for the `env-cleaner` binary.
//!
//! When the npm package is installed, this crate puts a native executable at
//! `<package>/bin/env-cleaner`: it reuses a binary that is already there,
//! downloads the prebuilt release asset for the host platform, or, when no
//! asset can be fetched, builds the binary from source with cargo.
//!
//! # Architecture
//!
//! - [`platform`] - Host OS/architecture to [`PlatformId`] resolution
//! - [`locator`] - Install path and release URL construction
//! - [`acquire`] - Reuse-or-download with a single redirect hop
//! - [`fallback`] - `cargo build --release` fallback
//! - [`installer`] - The pipeline tying the above together
//! - [`manifest`] - Version lookup from `package.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use env_cleaner_provision::{HostFacts, InstallConfig, Installer, PlatformId};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let version = env_cleaner_provision::read_package_version(root)?;
//! let platform = PlatformId::resolve(&HostFacts::detect())?;
//! let report = Installer::new(InstallConfig::new(version, root))?
//!     .run(platform)
//!     .await?;
//! println!("{report}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod acquire;
pub mod config;
pub mod error;
pub mod fallback;
mod files;
pub mod installer;
pub mod locator;
pub mod manifest;
pub mod platform;

pub use acquire::{AcquisitionEngine, AcquisitionOutcome, DownloadFailure};
pub use config::{BuildSettings, HttpSettings, InstallConfig, ReleaseSource};
pub use error::{Error, Result};
pub use fallback::{BuildOutcome, CargoBuilder, FallbackBuilder};
pub use installer::{InstallOutcome, InstallReport, Installer};
pub use locator::{InstallTarget, RemoteArtifactRef};
pub use manifest::{PackageManifest, read_package_version};
pub use platform::{HostFacts, PlatformId};
