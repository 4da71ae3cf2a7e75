//! The merge → render → send half of the pipeline.
//!
//! [`build_digest`] turns a working directory into a ready-to-send
//! [`Digest`], or `None` when the selected layout would list nothing.
//! [`send_digest`] adds delivery through any [`Dispatch`] implementation, so
//! an empty digest never reaches the mail dispatcher.

use crate::config::Settings;
use crate::mailer::Dispatch;
use crate::models::{GroupBy, article_count};
use crate::outputs::html::{DigestFrame, categorize, render_digest};
use crate::sources::snapshots::load_and_merge;
use chrono::NaiveDateTime;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// A rendered digest ready for delivery.
#[derive(Debug, Clone)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    pub sources: usize,
    pub articles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    /// The layout had no rows to list; nothing was dispatched.
    NothingToSend,
    Sent { articles: usize },
}

/// Subject line: configured prefix plus the local date.
pub fn subject_line(settings: &Settings, now: NaiveDateTime) -> String {
    format!("{} {}", settings.subject, now.format("%d/%m/%Y"))
}

/// Merge every snapshot in `dir` and render it.
///
/// # Returns
///
/// `Ok(None)` when there are no articles to report. In keyword mode that
/// includes a merge where no article carries a keyword.
#[instrument(level = "info", skip(dir, settings, now), fields(dir = %dir.display()))]
pub async fn build_digest(
    dir: &Path,
    group_by: GroupBy,
    settings: &Settings,
    now: NaiveDateTime,
) -> Result<Option<Digest>, Box<dyn Error>> {
    let merged = load_and_merge(dir).await?;
    let articles = article_count(&merged);
    let rows = match group_by {
        GroupBy::Source => articles,
        GroupBy::Keyword => categorize(&merged).values().map(Vec::len).sum(),
    };
    if rows == 0 {
        info!(articles, ?group_by, "Nothing to list in the selected layout");
        return Ok(None);
    }

    let frame = DigestFrame {
        title: settings.title.clone(),
        period: settings.period_description.clone(),
        generated_at: now,
    };
    let html = render_digest(&merged, group_by, &frame);
    info!(sources = merged.len(), articles, bytes = html.len(), "Rendered digest");

    Ok(Some(Digest {
        subject: subject_line(settings, now),
        html,
        sources: merged.len(),
        articles,
    }))
}

/// Build the digest from `dir` and deliver it, at most once.
pub async fn send_digest<D: Dispatch>(
    dir: &Path,
    group_by: GroupBy,
    settings: &Settings,
    now: NaiveDateTime,
    dispatcher: &D,
) -> Result<DigestOutcome, Box<dyn Error>> {
    let Some(digest) = build_digest(dir, group_by, settings, now).await? else {
        info!("ℹ️ No new news items to send");
        return Ok(DigestOutcome::NothingToSend);
    };

    dispatcher.dispatch(&digest.subject, &digest.html).await?;
    Ok(DigestOutcome::Sent {
        articles: digest.articles,
    })
}
