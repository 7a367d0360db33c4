use crate::tracing::{LogLevel, TracingConfig, TracingFormat};
use clap::Parser;
use env_cleaner_provision::config::{
    DEFAULT_BASE_URL, DEFAULT_BINARY_NAME, DEFAULT_BUILD_PROGRAM, DEFAULT_REPOSITORY,
};
use env_cleaner_provision::{
    BuildSettings, HostFacts, HttpSettings, InstallConfig, ReleaseSource, read_package_version,
};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Download and source build both failed
pub const EXIT_INSTALL: i32 = 1;
/// CLI, configuration or platform error exit code
pub const EXIT_CLI: i32 = 2;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI, configuration or platform error (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(env_cleaner::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The binary could not be installed (exit code 1)
    #[error("{message}")]
    #[diagnostic(code(env_cleaner::cli::install))]
    Install {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Stable code used in the JSON error envelope.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Install { .. } => "install",
        }
    }
}

/// Convert a provisioning error to the matching `CliError` category.
///
/// Platform and configuration problems are caller mistakes (exit code 2);
/// everything else means the binary could not be put in place (exit code 1).
impl From<env_cleaner_provision::Error> for CliError {
    fn from(err: env_cleaner_provision::Error) -> Self {
        let message = err.to_string();
        let help = err.help().map(|h| h.to_string());
        match err {
            env_cleaner_provision::Error::UnsupportedPlatform { .. }
            | env_cleaner_provision::Error::Config { .. } => Self::Config { message, help },
            _ => Self::Install { message, help },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Install { .. } => EXIT_INSTALL,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.code(),
            "message": err.to_string(),
            "help": match err {
                CliError::Config { help, .. } | CliError::Install { help, .. } => help,
            },
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Installs the native env-cleaner binary for this machine.
///
/// Meant to run as the npm package's postinstall step: reuses a binary that is
/// already in place, downloads the prebuilt release asset, or builds from
/// source with cargo.
#[derive(Parser, Debug)]
#[command(name = "env-cleaner-install")]
#[command(about = "Install the native env-cleaner binary for this machine")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Package root containing package.json.
    #[arg(long, env = "ENV_CLEANER_PACKAGE_ROOT", value_name = "DIR")]
    pub package_root: Option<PathBuf>,

    /// Directory to install the binary into.
    #[arg(long, env = "ENV_CLEANER_INSTALL_DIR", value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Release version to install instead of the package.json version.
    #[arg(long, env = "ENV_CLEANER_VERSION", value_name = "VERSION")]
    pub release_version: Option<String>,

    /// Name of the executable.
    #[arg(long, default_value = DEFAULT_BINARY_NAME, value_name = "NAME")]
    pub binary_name: String,

    /// Host serving release downloads.
    #[arg(long, env = "ENV_CLEANER_DOWNLOAD_BASE", default_value = DEFAULT_BASE_URL, value_name = "URL")]
    pub base_url: String,

    /// Repository publishing the releases.
    #[arg(long, env = "ENV_CLEANER_REPOSITORY", default_value = DEFAULT_REPOSITORY, value_name = "OWNER/REPO")]
    pub repository: String,

    /// Build tool used when no prebuilt binary is available.
    #[arg(long, env = "CARGO", default_value = DEFAULT_BUILD_PROGRAM, value_name = "PROGRAM")]
    pub cargo: String,

    /// Cargo target directory for the source build.
    #[arg(long, env = "CARGO_TARGET_DIR", value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Seconds allowed to connect to the download host.
    #[arg(long, default_value_t = 30, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Seconds allowed for the whole download.
    #[arg(long, default_value_t = 300, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Override the detected OS family (darwin, linux, win32).
    #[arg(long, value_name = "OS")]
    pub os: Option<String>,

    /// Override the detected CPU architecture (arm64, x64).
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,

    /// Print the install report as JSON on stdout.
    #[arg(long, help = "Emit JSON envelope on stdout")]
    pub json: bool,
}

impl Cli {
    /// Tracing settings selected by the flags.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.level.into(),
            filter: None,
        }
    }

    /// Host facts with any `--os`/`--arch` overrides applied.
    #[must_use]
    pub fn host_facts(&self) -> HostFacts {
        HostFacts::detect().with_overrides(self.os.as_deref(), self.arch.as_deref())
    }

    /// The package root, defaulting to the working directory.
    ///
    /// # Errors
    ///
    /// Returns a config error if the working directory cannot be read.
    pub fn package_root(&self) -> Result<PathBuf, CliError> {
        match &self.package_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().map_err(|e| {
                CliError::config_with_help(
                    format!("Cannot determine the working directory: {e}"),
                    "Pass --package-root",
                )
            }),
        }
    }

    /// Release version from `--release-version`, else from `package.json`.
    ///
    /// # Errors
    ///
    /// Returns a config error if the version is blank or the manifest cannot
    /// supply one.
    pub fn release_version(&self, package_root: &std::path::Path) -> Result<String, CliError> {
        match self.release_version.as_deref().map(str::trim) {
            Some("") => Err(CliError::config_with_help(
                "Release version is empty",
                "Pass a version such as --release-version 1.2.0",
            )),
            Some(version) => Ok(version.to_string()),
            None => Ok(read_package_version(package_root)?),
        }
    }

    /// Build the immutable install configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error if the package root or version cannot be
    /// determined.
    pub fn install_config(&self) -> Result<InstallConfig, CliError> {
        let root = self.package_root()?;
        let version = self.release_version(&root)?;

        let mut build = BuildSettings::for_source_dir(&root);
        build.program.clone_from(&self.cargo);
        if let Some(dir) = &self.target_dir {
            // cargo runs in the package root, so relative paths resolve there
            build.target_dir = root.join(dir);
        }

        let http = HttpSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            timeout: Duration::from_secs(self.timeout),
            ..HttpSettings::default()
        };

        let mut config = InstallConfig::new(version, &root)
            .with_binary_name(&self.binary_name)
            .with_release(ReleaseSource {
                base_url: self.base_url.clone(),
                repository: self.repository.clone(),
            })
            .with_http(http)
            .with_build(build);
        if let Some(dir) = &self.install_dir {
            config = config.with_install_dir(dir);
        }
        Ok(config)
    }
}

/// Parse command line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse_args(args: &[&str]) -> Cli {
        let mut argv = vec!["env-cleaner-install"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse_args(&["--cargo", "cargo"]);
        assert_eq!(cli.binary_name, "env-cleaner");
        assert_eq!(cli.connect_timeout, 30);
        assert_eq!(cli.timeout, 300);
        assert_eq!(cli.level, LogLevel::Info);
        assert_eq!(cli.log_format, TracingFormat::Compact);
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = parse_args(&["--level", "debug"]);
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = parse_args(&["-L", "error"]);
        assert_eq!(cli.level, LogLevel::Error);

        let result = Cli::try_parse_from(["env-cleaner-install", "--level", "invalid"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Cli::try_parse_from(["env-cleaner-install", "--timeout", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_install_config_from_flags() {
        let root = TempDir::new().unwrap();
        let root_arg = root.path().display().to_string();
        let cli = parse_args(&[
            "--package-root",
            &root_arg,
            "--release-version",
            "v2.0.1",
            "--base-url",
            "http://127.0.0.1:1",
            "--repository",
            "acme/tool",
            "--cargo",
            "/opt/cargo",
            "--target-dir",
            "out",
            "--timeout",
            "5",
        ]);

        let config = cli.install_config().unwrap();

        assert_eq!(config.version, "2.0.1");
        assert_eq!(config.install_dir, root.path().join("bin"));
        assert_eq!(config.release.base_url, "http://127.0.0.1:1");
        assert_eq!(config.release.repository, "acme/tool");
        assert_eq!(config.build.program, "/opt/cargo");
        assert_eq!(config.build.source_dir, root.path());
        assert_eq!(config.build.target_dir, root.path().join("out"));
        assert_eq!(config.http.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_version_from_package_json() {
        let root = TempDir::new().unwrap();
        std::fs::write(
            root.path().join("package.json"),
            r#"{"name": "env-cleaner", "version": "1.4.2"}"#,
        )
        .unwrap();
        let cli = Cli {
            release_version: None,
            ..parse_args(&[])
        };

        assert_eq!(cli.release_version(root.path()).unwrap(), "1.4.2");
    }

    #[test]
    fn test_blank_version_is_config_error() {
        let root = TempDir::new().unwrap();
        let cli = Cli {
            release_version: Some("  ".to_string()),
            ..parse_args(&[])
        };
        let err = cli.release_version(root.path()).unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_CLI);
    }

    #[test]
    fn test_error_categories() {
        let platform: CliError =
            env_cleaner_provision::Error::unsupported_platform("freebsd", "x64").into();
        assert_eq!(exit_code_for(&platform), EXIT_CLI);
        assert_eq!(platform.code(), "config");

        let build: CliError = env_cleaner_provision::Error::ToolchainUnavailable {
            program: "cargo".to_string(),
            source: None,
        }
        .into();
        assert_eq!(exit_code_for(&build), EXIT_INSTALL);
        match build {
            CliError::Install { help, .. } => {
                assert!(help.unwrap().contains("https://rustup.rs/"));
            }
            CliError::Config { .. } => panic!("expected an install error"),
        }
    }

    #[test]
    fn test_envelopes() {
        let ok = serde_json::to_value(OkEnvelope::new("done")).unwrap();
        assert_eq!(ok["status"], "ok");
        let err = serde_json::to_value(ErrorEnvelope::new("boom")).unwrap();
        assert_eq!(err["status"], "error");
    }
}
