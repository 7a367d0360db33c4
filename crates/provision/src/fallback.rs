//! Source build fallback.
//!
//! Used when no prebuilt binary could be downloaded: builds the package with
//! the local Rust toolchain and installs the release binary.

use crate::config::BuildSettings;
use crate::error::{Error, Result};
use crate::files::{PartialFile, make_executable};
use crate::locator::InstallTarget;
use async_trait::async_trait;
use serde::Serialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// How the fallback produced a binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    /// A binary was already at the install path; nothing was built.
    PreStaged,
    /// The binary was built from source and copied into place.
    Built,
}

/// Produces the binary locally when acquisition failed.
#[async_trait]
pub trait FallbackBuilder: Send + Sync {
    /// Put an executable at `target.install_path` without downloading it.
    ///
    /// # Errors
    ///
    /// Any error is terminal for the installation.
    async fn build_from_source(&self, target: &InstallTarget) -> Result<BuildOutcome>;
}

/// Builds with `cargo build --release`.
#[derive(Debug, Clone)]
pub struct CargoBuilder {
    settings: BuildSettings,
}

impl CargoBuilder {
    /// Create a builder with the given settings.
    #[must_use]
    pub const fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    /// Check that the toolchain can be run at all.
    ///
    /// Runs `<program> --version` with all output discarded; only the exit
    /// status is looked at.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolchainUnavailable`] if the program cannot be
    /// started or exits unsuccessfully.
    pub async fn check_toolchain(&self) -> Result<()> {
        let program = &self.settings.program;
        let status = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| Error::ToolchainUnavailable {
                program: program.clone(),
                source: Some(e),
            })?;

        if !status.success() {
            debug!(%program, %status, "Toolchain probe failed");
            return Err(Error::ToolchainUnavailable {
                program: program.clone(),
                source: None,
            });
        }

        debug!(%program, "Toolchain is available");
        Ok(())
    }

    /// Run the release build, streaming its output to the console.
    async fn run_release_build(&self) -> Result<()> {
        let BuildSettings {
            program,
            source_dir,
            target_dir,
        } = &self.settings;

        info!(
            %program,
            source_dir = %source_dir.display(),
            "Building from source"
        );

        let status = Command::new(program)
            .args(["build", "--release"])
            .current_dir(source_dir)
            .env("CARGO_TARGET_DIR", target_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| Error::ToolchainUnavailable {
                program: program.clone(),
                source: Some(e),
            })?;

        if !status.success() {
            return Err(Error::BuildFailed { status });
        }
        Ok(())
    }

    /// Copy the release binary into the install directory.
    fn install_artifact(&self, target: &InstallTarget) -> Result<()> {
        let built = self.settings.release_artifact(&target.binary_name);
        if !built.is_file() {
            return Err(Error::ArtifactMissingAfterBuild { path: built });
        }

        std::fs::create_dir_all(&target.install_dir)
            .map_err(|e| Error::io("create install directory", &target.install_dir, e))?;

        let install_path = target.path();
        let partial = PartialFile::new(install_path);
        std::fs::copy(&built, install_path)
            .map_err(|e| Error::io("copy build output", install_path, e))?;
        make_executable(install_path)
            .map_err(|e| Error::io("set permissions", install_path, e))?;
        partial.commit();

        debug!(
            from = %built.display(),
            to = %install_path.display(),
            "Installed build output"
        );
        Ok(())
    }
}

#[async_trait]
impl FallbackBuilder for CargoBuilder {
    async fn build_from_source(&self, target: &InstallTarget) -> Result<BuildOutcome> {
        // A packaging step may have placed the binary after acquisition looked
        if target.is_present() {
            info!(path = %target.path().display(), "Using bundled binary");
            make_executable(target.path())
                .map_err(|e| Error::io("set permissions", target.path(), e))?;
            return Ok(BuildOutcome::PreStaged);
        }

        self.check_toolchain().await?;
        self.run_release_build().await?;
        self.install_artifact(target)?;

        info!(path = %target.path().display(), "Built from source");
        Ok(BuildOutcome::Built)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        log: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let log = dir.path().join("toolchain.log");
            std::fs::create_dir_all(dir.path().join("src")).unwrap();
            Self { dir, log }
        }

        fn source_dir(&self) -> PathBuf {
            self.dir.path().join("src")
        }

        fn target(&self) -> InstallTarget {
            InstallTarget::new("env-cleaner", "1.2.0", self.dir.path().join("bin"))
        }

        /// Write a fake toolchain script; `build_step` runs for `build`.
        fn toolchain(&self, probe_exit: i32, build_step: &str) -> CargoBuilder {
            let program = self.dir.path().join("fake-cargo");
            let script = format!(
                "#!/bin/sh\n\
                 echo \"$* @ $(pwd)\" >> '{log}'\n\
                 case \"$1\" in\n\
                   --version) exit {probe_exit} ;;\n\
                   build) {build_step} ;;\n\
                 esac\n\
                 exit 64\n",
                log = self.log.display(),
            );
            std::fs::write(&program, script).unwrap();
            std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

            let mut settings = BuildSettings::for_source_dir(self.source_dir());
            settings.program = program.display().to_string();
            CargoBuilder::new(settings)
        }

        fn invocations(&self) -> Vec<String> {
            std::fs::read_to_string(&self.log)
                .map(|log| log.lines().map(str::to_string).collect())
                .unwrap_or_default()
        }
    }

    const BUILD_OK: &str = "mkdir -p \"$CARGO_TARGET_DIR/release\" && \
                            printf built > \"$CARGO_TARGET_DIR/release/env-cleaner\"; exit 0";

    fn mode(path: &Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[tokio::test]
    async fn test_builds_and_installs() {
        let fixture = Fixture::new();
        let builder = fixture.toolchain(0, BUILD_OK);
        let target = fixture.target();

        let outcome = builder.build_from_source(&target).await.unwrap();

        assert_eq!(outcome, BuildOutcome::Built);
        assert_eq!(std::fs::read(&target.install_path).unwrap(), b"built");
        assert_eq!(mode(&target.install_path), 0o755);

        let calls = fixture.invocations();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("--version"));
        assert!(calls[1].starts_with("build --release"));
        assert!(calls[1].ends_with("/src"));
    }

    #[tokio::test]
    async fn test_prestaged_binary_skips_toolchain() {
        let fixture = Fixture::new();
        let builder = fixture.toolchain(0, BUILD_OK);
        let target = fixture.target();
        std::fs::create_dir_all(&target.install_dir).unwrap();
        std::fs::write(&target.install_path, b"bundled").unwrap();
        std::fs::set_permissions(&target.install_path, std::fs::Permissions::from_mode(0o600))
            .unwrap();

        let outcome = builder.build_from_source(&target).await.unwrap();

        assert_eq!(outcome, BuildOutcome::PreStaged);
        assert!(fixture.invocations().is_empty());
        assert_eq!(std::fs::read(&target.install_path).unwrap(), b"bundled");
        assert_eq!(mode(&target.install_path), 0o755);
    }

    #[tokio::test]
    async fn test_failed_probe_never_builds() {
        let fixture = Fixture::new();
        let builder = fixture.toolchain(1, BUILD_OK);
        let target = fixture.target();

        let err = builder.build_from_source(&target).await.unwrap_err();

        assert!(matches!(err, Error::ToolchainUnavailable { source: None, .. }));
        let calls = fixture.invocations();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("--version"));
        assert!(!target.install_path.exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_toolchain_unavailable() {
        let fixture = Fixture::new();
        let mut settings = BuildSettings::for_source_dir(fixture.source_dir());
        settings.program = fixture.dir.path().join("no-such-cargo").display().to_string();
        let builder = CargoBuilder::new(settings);

        let err = builder.build_from_source(&fixture.target()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::ToolchainUnavailable {
                source: Some(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_build() {
        let fixture = Fixture::new();
        let builder = fixture.toolchain(0, "exit 101");

        let err = builder
            .build_from_source(&fixture.target())
            .await
            .unwrap_err();

        match err {
            Error::BuildFailed { status } => assert_eq!(status.code(), Some(101)),
            other => panic!("expected BuildFailed, got {other:?}"),
        }
        assert!(!fixture.target().install_path.exists());
    }

    #[tokio::test]
    async fn test_build_without_output() {
        let fixture = Fixture::new();
        let builder = fixture.toolchain(0, "exit 0");

        let err = builder
            .build_from_source(&fixture.target())
            .await
            .unwrap_err();

        match err {
            Error::ArtifactMissingAfterBuild { path } => {
                assert!(path.ends_with("target/release/env-cleaner"));
            }
            other => panic!("expected ArtifactMissingAfterBuild, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_custom_target_dir() {
        let fixture = Fixture::new();
        let mut builder = fixture.toolchain(0, BUILD_OK);
        builder.settings.target_dir = fixture.dir.path().join("shared-target");
        let target = fixture.target();

        builder.build_from_source(&target).await.unwrap();

        assert!(
            fixture
                .dir
                .path()
                .join("shared-target/release/env-cleaner")
                .is_file()
        );
        assert!(target.install_path.is_file());
    }
}
