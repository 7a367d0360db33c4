//! Error types for provisioning operations.

use miette::Diagnostic;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can terminate an installation.
///
/// Download failures are not represented here: they are absorbed into
/// [`crate::DownloadFailure`] and routed to the fallback builder.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The host OS family has no published artifact.
    #[error("Unsupported platform: {os} {arch}")]
    #[diagnostic(
        code(env_cleaner::platform::unsupported),
        help("Prebuilt binaries exist for darwin, linux and windows only")
    )]
    UnsupportedPlatform {
        /// OS family reported by the host.
        os: String,
        /// CPU architecture reported by the host.
        arch: String,
    },

    /// The build toolchain could not be probed.
    #[error("Build toolchain '{program}' is not available")]
    #[diagnostic(
        code(env_cleaner::build::toolchain_unavailable),
        help("Install Rust from https://rustup.rs/ and re-run the install, or wait for the GitHub release to be available")
    )]
    ToolchainUnavailable {
        /// Program that was probed.
        program: String,
        /// Underlying spawn error, if the program could not be started at all.
        #[source]
        source: Option<std::io::Error>,
    },

    /// The release build exited unsuccessfully.
    #[error("Source build failed ({status})")]
    #[diagnostic(
        code(env_cleaner::build::failed),
        help("Install Rust from https://rustup.rs/ and re-run the install, or wait for the GitHub release to be available")
    )]
    BuildFailed {
        /// Exit status of the build process.
        status: ExitStatus,
    },

    /// The build succeeded but left no binary where one was expected.
    #[error("Build output not found at {}", path.display())]
    #[diagnostic(
        code(env_cleaner::build::artifact_missing),
        help("Install Rust from https://rustup.rs/ and re-run the install, or wait for the GitHub release to be available")
    )]
    ArtifactMissingAfterBuild {
        /// Expected location of the built binary.
        path: PathBuf,
    },

    /// Invalid configuration or package metadata.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(env_cleaner::config), help("{help}"))]
    Config {
        /// The error message.
        message: String,
        /// Help text for the user.
        help: String,
    },

    /// Filesystem failure outside a download attempt.
    #[error("I/O error during {operation} on {}: {source}", path.display())]
    #[diagnostic(
        code(env_cleaner::io),
        help("Check permissions on the install directory")
    )]
    Io {
        /// What was being done.
        operation: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an unsupported platform error.
    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create an I/O error tied to a path.
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
