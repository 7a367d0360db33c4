//! Acquisition of the prebuilt binary.
//!
//! Reuses a binary already at the install path, otherwise downloads the
//! platform's release asset straight into place. Download failures are
//! returned as [`AcquisitionOutcome::Failed`] so the caller can fall back to
//! a source build; they are never surfaced as errors.

use crate::config::{HttpSettings, ReleaseSource};
use crate::error::{Error, Result};
use crate::files::{PartialFile, make_executable};
use crate::locator::{InstallTarget, RemoteArtifactRef};
use crate::platform::PlatformId;
use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Why a download attempt did not produce a binary.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadFailure {
    /// The server answered with a status other than 200 or a single redirect.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// URL that was requested.
        url: String,
    },
    /// The request or the body stream failed.
    #[error("{message} ({url})")]
    Transport {
        /// URL that was requested.
        url: String,
        /// What went wrong.
        message: String,
    },
}

impl DownloadFailure {
    fn http(status: StatusCode, url: &Url) -> Self {
        Self::Http {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }

    fn transport(url: &Url, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Result of an acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// A binary was already at the install path.
    AlreadyPresent,
    /// The asset was downloaded directly.
    Downloaded,
    /// The asset was downloaded after following one redirect.
    RedirectedThenDownloaded,
    /// No binary could be downloaded.
    Failed(DownloadFailure),
}

impl AcquisitionOutcome {
    /// Whether the binary is now in place.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Fetches release assets into the install path.
pub struct AcquisitionEngine {
    client: Client,
    source: ReleaseSource,
}

impl AcquisitionEngine {
    /// Create an engine downloading from `source`.
    ///
    /// Automatic redirect following is disabled; redirects are handled one
    /// hop at a time by [`AcquisitionEngine::acquire`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(http: &HttpSettings, source: ReleaseSource) -> Result<Self> {
        let client = Client::builder()
            .user_agent(http.user_agent.as_str())
            .connect_timeout(http.connect_timeout)
            .timeout(http.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                Error::config(
                    format!("Failed to create HTTP client: {e}"),
                    "The TLS backend could not be initialized",
                )
            })?;
        Ok(Self { client, source })
    }

    /// The download URL for `target` on `platform`.
    #[must_use]
    pub fn artifact(&self, target: &InstallTarget, platform: PlatformId) -> RemoteArtifactRef {
        RemoteArtifactRef::locate(&self.source, target, platform)
    }

    /// Put an executable at `target.install_path`.
    ///
    /// # Errors
    ///
    /// Only local filesystem failures outside the download itself are errors:
    /// making an existing binary executable, or creating the install
    /// directory. Every network or HTTP failure becomes
    /// [`AcquisitionOutcome::Failed`] with the partial file removed.
    pub async fn acquire(
        &self,
        target: &InstallTarget,
        platform: PlatformId,
    ) -> Result<AcquisitionOutcome> {
        let install_path = target.path();

        if target.is_present() {
            info!(path = %install_path.display(), "Binary already exists");
            make_executable(install_path)
                .map_err(|e| Error::io("set permissions", install_path, e))?;
            return Ok(AcquisitionOutcome::AlreadyPresent);
        }

        tokio::fs::create_dir_all(&target.install_dir)
            .await
            .map_err(|e| Error::io("create install directory", &target.install_dir, e))?;

        let artifact = self.artifact(target, platform);
        info!(
            binary = %target.binary_name,
            %platform,
            url = %artifact.url,
            "Downloading prebuilt binary"
        );

        let partial = PartialFile::new(install_path);
        let redirected = match self.fetch(&artifact.url, install_path).await {
            Ok(redirected) => redirected,
            Err(failure) => {
                drop(partial);
                warn!(%failure, "Download failed");
                return Ok(AcquisitionOutcome::Failed(failure));
            }
        };

        make_executable(install_path)
            .map_err(|e| Error::io("set permissions", install_path, e))?;
        partial.commit();

        info!(path = %install_path.display(), redirected, "Binary downloaded");
        Ok(if redirected {
            AcquisitionOutcome::RedirectedThenDownloaded
        } else {
            AcquisitionOutcome::Downloaded
        })
    }

    /// Download `url` into `dest`, following at most one redirect.
    ///
    /// Returns whether a redirect was followed.
    async fn fetch(&self, url: &str, dest: &Path) -> std::result::Result<bool, DownloadFailure> {
        let mut url = Url::parse(url).map_err(|e| DownloadFailure::Transport {
            url: url.to_string(),
            message: format!("Invalid download URL: {e}"),
        })?;
        let mut redirected = false;

        loop {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| DownloadFailure::transport(&url, error_chain(&e)))?;
            let status = response.status();
            debug!(%url, %status, "Received response");

            if is_redirect(status) {
                if redirected {
                    return Err(DownloadFailure::transport(
                        &url,
                        format!("Redirected more than once (HTTP {status})"),
                    ));
                }
                url = redirect_target(&response)?;
                redirected = true;
                debug!(%url, "Following redirect");
                continue;
            }

            if status != StatusCode::OK {
                return Err(DownloadFailure::http(status, &url));
            }

            let written = stream_to_file(response, dest)
                .await
                .map_err(|message| DownloadFailure::transport(&url, message))?;
            debug!(bytes = written, path = %dest.display(), "Finished writing download");
            return Ok(redirected);
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND
}

/// Resolve the `Location` header of a redirect against the request URL.
fn redirect_target(response: &Response) -> std::result::Result<Url, DownloadFailure> {
    let from = response.url();
    let location = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| DownloadFailure::transport(from, "Redirect without a Location header"))?
        .to_str()
        .map_err(|_| DownloadFailure::transport(from, "Redirect Location is not valid text"))?;

    from.join(location).map_err(|e| {
        DownloadFailure::transport(from, format!("Invalid redirect Location '{location}': {e}"))
    })
}

/// Stream a response body into a freshly created file at `dest`.
async fn stream_to_file(response: Response, dest: &Path) -> std::result::Result<u64, String> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| format!("Failed to create {}: {e}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("Download interrupted: {}", error_chain(&e)))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", dest.display()))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| format!("Failed to flush {}: {e}", dest.display()))?;
    Ok(written)
}

/// Render an error with its source chain, e.g. `error sending request: connection refused`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
