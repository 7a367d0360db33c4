//! Platform detection and resolution.
//!
//! Maps the host OS family and CPU architecture onto the identifiers used in
//! published release asset names (e.g. `linux-arm64`, `windows-x64`).

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Host facts read once from the execution environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    /// OS family (darwin, linux, win32, ...).
    pub os: String,
    /// CPU architecture (arm64, x64, ...).
    pub arch: String,
}

impl HostFacts {
    /// Create host facts from explicit values.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the facts of the running host.
    ///
    /// Rust's target names are normalized to the package ecosystem's
    /// vocabulary, so `macos` becomes `darwin` and `aarch64` becomes `arm64`.
    #[must_use]
    pub fn detect() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "aarch64" => "arm64",
            "x86_64" => "x64",
            "x86" => "ia32",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Replace the OS and/or architecture, keeping detected values otherwise.
    #[must_use]
    pub fn with_overrides(mut self, os: Option<&str>, arch: Option<&str>) -> Self {
        if let Some(os) = os {
            self.os = os.to_string();
        }
        if let Some(arch) = arch {
            self.arch = arch.to_string();
        }
        self
    }
}

impl fmt::Display for HostFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.os, self.arch)
    }
}

/// Platforms with published prebuilt binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformId {
    /// macOS ARM64 (Apple Silicon)
    DarwinArm64,
    /// macOS `x86_64`
    DarwinX64,
    /// Windows `x86_64`
    WindowsX64,
    /// Linux ARM64/aarch64
    LinuxArm64,
    /// Linux `x86_64`
    LinuxX64,
}

impl PlatformId {
    /// Resolve the platform for the given host.
    ///
    /// Windows always resolves to `windows-x64`; darwin and linux branch on
    /// `arm64` and treat every other architecture as x64.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for any other OS family.
    pub fn resolve(host: &HostFacts) -> Result<Self> {
        let os = host.os.to_ascii_lowercase();
        let is_arm64 = matches!(host.arch.to_ascii_lowercase().as_str(), "arm64" | "aarch64");

        match os.as_str() {
            "darwin" | "macos" => Ok(if is_arm64 {
                Self::DarwinArm64
            } else {
                Self::DarwinX64
            }),
            "win32" | "windows" => Ok(Self::WindowsX64),
            "linux" => Ok(if is_arm64 {
                Self::LinuxArm64
            } else {
                Self::LinuxX64
            }),
            _ => Err(Error::unsupported_platform(&host.os, &host.arch)),
        }
    }

    /// Returns the identifier used in release asset names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DarwinArm64 => "darwin-arm64",
            Self::DarwinX64 => "darwin-x64",
            Self::WindowsX64 => "windows-x64",
            Self::LinuxArm64 => "linux-arm64",
            Self::LinuxX64 => "linux-x64",
        }
    }

    /// Returns all supported platforms.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DarwinArm64,
            Self::DarwinX64,
            Self::WindowsX64,
            Self::LinuxArm64,
            Self::LinuxX64,
        ]
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                Error::config(
                    format!("Unknown platform: {s}"),
                    "Valid platforms: darwin-arm64, darwin-x64, windows-x64, linux-arm64, linux-x64",
                )
            })
    }
}

impl Serialize for PlatformId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
