//! Snapshot discovery and merging.
//!
//! Each crawl run leaves an `RSS_FEEDS_*.json` file behind. This module finds
//! those files in the working directory and folds them into one
//! [`MergedFeeds`], keeping the first occurrence of every link.
//!
//! # Deduplication Scope
//!
//! The seen-set spans the whole merge call, not a single source: once a link
//! has been kept under one source, a later copy under any other source is
//! dropped. Files are processed in sorted filename order so the winning
//! source is deterministic.

use crate::models::{MergedFeeds, Snapshot};
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Filename prefix written by the crawling job.
pub const SNAPSHOT_PREFIX: &str = "RSS_FEEDS_";
/// Filename suffix written by the crawling job.
pub const SNAPSHOT_SUFFIX: &str = ".json";

/// Does `name` match `RSS_FEEDS_*.json`?
pub fn is_snapshot_name(name: &str) -> bool {
    name.len() >= SNAPSHOT_PREFIX.len() + SNAPSHOT_SUFFIX.len()
        && name.starts_with(SNAPSHOT_PREFIX)
        && name.ends_with(SNAPSHOT_SUFFIX)
}

/// List snapshot files directly inside `dir`, sorted by filename.
///
/// A missing directory yields an empty list rather than an error.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn discover_snapshots(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if !fs::try_exists(dir).await? {
        warn!("Snapshot directory does not exist");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_snapshot_name(name) && entry.file_type().await?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    info!(count = paths.len(), "Discovered snapshot files");
    debug!(files = ?paths, "Snapshot files");
    Ok(paths)
}

/// Read and parse one snapshot file.
pub async fn load_snapshot(path: &Path) -> Result<Snapshot, Box<dyn Error>> {
    let bytes = fs::read(path).await?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    Ok(snapshot)
}

/// Fold snapshots into a merged collection, keeping the first copy of each link.
///
/// Snapshots are consumed in iteration order; within a snapshot, sources and
/// articles are taken in stored order. A source only appears in the output
/// once it contributes at least one article.
pub fn merge_snapshots<I>(snapshots: I) -> MergedFeeds
where
    I: IntoIterator<Item = Snapshot>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = MergedFeeds::new();

    for snapshot in snapshots {
        for (source, articles) in snapshot {
            for article in articles {
                if !seen.insert(article.link.clone()) {
                    debug!(%source, link = %article.link, "Skipping duplicate article");
                    continue;
                }
                merged.entry(source.clone()).or_default().push(article);
            }
        }
    }

    merged
}

/// Load every snapshot in `dir` and merge them.
///
/// Files that cannot be read or parsed are logged and skipped. An empty
/// result means there is nothing to send; it is not an error.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn load_and_merge(dir: &Path) -> Result<MergedFeeds, Box<dyn Error>> {
    let paths = discover_snapshots(dir).await?;
    let total = paths.len();

    let mut snapshots: Vec<Snapshot> = Vec::with_capacity(total);
    for path in &paths {
        match load_snapshot(path).await {
            Ok(snapshot) => {
                debug!(path = %path.display(), sources = snapshot.len(), "Loaded snapshot");
                snapshots.push(snapshot);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "⚠️ Failed to load snapshot; skipping");
            }
        }
    }

    let loaded = snapshots.len();
    let merged = merge_snapshots(snapshots);

    info!(
        files = total,
        loaded,
        skipped = total - loaded,
        sources = merged.len(),
        articles = crate::models::article_count(&merged),
        "Merged snapshots"
    );
    Ok(merged)
}
