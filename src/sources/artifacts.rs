//! Artifact retrieval from the CI artifact API.
//!
//! The crawling job uploads its `RSS_FEEDS_*.json` output as zipped build
//! artifacts. This module pages through the artifact listing, downloads each
//! archive and unpacks it into the working directory.
//!
//! # Failure Policy
//!
//! - A listing request that fails or returns a non-success status aborts the run.
//! - A download or extraction that fails is logged and that artifact is skipped.
//! - Nothing is retried.

use crate::config::{ApiCredentials, Settings};
use crate::models::{Artifact, ArtifactPage};
use crate::utils::{ensure_writable_dir, truncate_for_log};
use reqwest::{Client, StatusCode};
use std::error::Error;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to get artifacts list: {status} {body}")]
    Listing { status: StatusCode, body: String },
    #[error("failed to download artifact {name}: {status}")]
    Download { name: String, status: StatusCode },
}

/// Counts reported after a fetch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub listed: usize,
    pub extracted: usize,
    pub failed: usize,
    pub files_written: usize,
}

/// Authenticated client for one repository's artifact listing.
#[derive(Debug)]
pub struct ArtifactClient {
    http: Client,
    listing_url: Url,
    credentials: ApiCredentials,
    per_page: u32,
}

impl ArtifactClient {
    pub fn new(settings: &Settings, credentials: ApiCredentials) -> Result<Self, Box<dyn Error>> {
        let base = settings.api_base_url.trim_end_matches('/');
        let listing_url = Url::parse(&format!(
            "{base}/repos/{}/actions/artifacts",
            credentials.repository
        ))?;

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            listing_url,
            credentials,
            per_page: settings.per_page,
        })
    }

    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    /// Fetch one listing page (1-based).
    #[instrument(level = "info", skip(self))]
    async fn list_page(&self, page: u32) -> Result<Vec<Artifact>, Box<dyn Error>> {
        let response = self
            .http
            .get(self.listing_url.clone())
            .bearer_auth(&self.credentials.token)
            .header("Accept", "application/vnd.github+json")
            .query(&[("page", page), ("per_page", self.per_page)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Box::new(FetchError::Listing {
                status,
                body: truncate_for_log(&body, 300),
            }));
        }

        let page: ArtifactPage = response.json().await?;
        debug!(count = page.artifacts.len(), total = ?page.total_count, "Listed artifact page");
        Ok(page.artifacts)
    }

    /// Enumerate every artifact, stopping at the first short page.
    #[instrument(level = "info", skip_all, fields(url = %self.listing_url))]
    pub async fn list_artifacts(&self) -> Result<Vec<Artifact>, Box<dyn Error>> {
        let mut artifacts = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self.list_page(page).await?;
            let short = batch.len() < self.per_page as usize;
            artifacts.extend(batch);
            if short {
                break;
            }
            page += 1;
        }

        info!(count = artifacts.len(), pages = page, "Listed artifacts");
        Ok(artifacts)
    }

    /// Download one artifact's ZIP payload.
    #[instrument(level = "info", skip_all, fields(name = %artifact.name, id = artifact.id))]
    pub async fn download(&self, artifact: &Artifact) -> Result<Vec<u8>, Box<dyn Error>> {
        let response = self
            .http
            .get(&artifact.archive_download_url)
            .bearer_auth(&self.credentials.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Box::new(FetchError::Download {
                name: artifact.name.clone(),
                status,
            }));
        }

        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "Downloaded artifact");
        Ok(bytes.to_vec())
    }
}

/// Unpack a ZIP archive into `dest`, overwriting files with the same name.
///
/// Entries whose path would escape `dest` are skipped.
///
/// # Returns
///
/// The number of files written.
pub fn extract_archive(bytes: &[u8], dest: &Path) -> Result<usize, Box<dyn Error>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut written = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = std::fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}

/// List every artifact and unpack each into `dest`.
///
/// # Errors
///
/// Only listing failures and an unusable `dest` are returned as errors;
/// per-artifact failures are counted in [`FetchSummary::failed`].
#[instrument(level = "info", skip_all, fields(dest = %dest.display()))]
pub async fn fetch_all(client: &ArtifactClient, dest: &Path) -> Result<FetchSummary, Box<dyn Error>> {
    info!(url = %client.listing_url(), "🔍 Fetching artifact list");
    let artifacts = client.list_artifacts().await?;

    let mut summary = FetchSummary {
        listed: artifacts.len(),
        ..FetchSummary::default()
    };
    if artifacts.is_empty() {
        info!("ℹ️ No artifacts found");
        return Ok(summary);
    }

    ensure_writable_dir(dest).await?;

    for artifact in &artifacts {
        info!(name = %artifact.name, "⬇️ Downloading artifact");
        let bytes = match client.download(artifact).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(name = %artifact.name, error = %e, "❌ Artifact download failed; skipping");
                summary.failed += 1;
                continue;
            }
        };

        match extract_archive(&bytes, dest) {
            Ok(files) => {
                info!(name = %artifact.name, files, "✅ Extracted artifact");
                summary.extracted += 1;
                summary.files_written += files;
            }
            Err(e) => {
                error!(name = %artifact.name, error = %e, "❌ Artifact extraction failed; skipping");
                summary.failed += 1;
            }
        }
    }

    info!(
        listed = summary.listed,
        extracted = summary.extracted,
        failed = summary.failed,
        files = summary.files_written,
        "Artifact fetch complete"
    );
    Ok(summary)
}
